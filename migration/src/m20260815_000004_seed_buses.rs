use crate::m20260815_000003_create_buses::Buses;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

const FLEET: [(&str, &str, i32, bool); 11] = [
    ("finkbeiner-2", "Finkbeiner-2", 49, false),
    ("finkbeiner-3", "Finkbeiner-3", 50, true),
    ("finkbeiner-4", "Finkbeiner-4", 54, true),
    ("finkbeiner-5", "Finkbeiner-5", 57, false),
    ("heess-1", "Heeß-1", 57, true),
    ("heess-2", "Heeß-2", 54, false),
    ("picco-4", "Picco-4", 49, false),
    ("piccolonia", "Piccolonia", 54, false),
    ("boonk", "Boonk", 50, false),
    ("marti", "Marti", 57, true),
    ("hager", "Hager", 61, true),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert()
            .into_table(Buses::Table)
            .columns([Buses::Id, Buses::Name, Buses::SeatCount, Buses::IsContractual])
            .to_owned();
        for (id, name, seat_count, is_contractual) in FLEET {
            insert.values_panic([
                id.into(),
                name.into(),
                seat_count.into(),
                is_contractual.into(),
            ]);
        }
        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(Query::delete().from_table(Buses::Table).to_owned())
            .await
    }
}
