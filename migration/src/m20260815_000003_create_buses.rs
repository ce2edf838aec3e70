use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Buses::Table)
                    .if_not_exists()
                    .col(string(Buses::Id).primary_key())
                    .col(string(Buses::Name))
                    .col(integer(Buses::SeatCount))
                    .col(boolean(Buses::IsContractual))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Buses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Buses {
    Table,
    Id,
    Name,
    SeatCount,
    IsContractual,
}
