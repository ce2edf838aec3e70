use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trips::Table)
                    .if_not_exists()
                    .col(string(Trips::Id).primary_key())
                    .col(string(Trips::Direction))
                    .col(string(Trips::ReservationCode))
                    .col(string(Trips::ProductCode))
                    .col(string(Trips::RouteName))
                    .col(string(Trips::Date))
                    .col(string(Trips::DepartureTime))
                    .col(integer(Trips::Contingent))
                    .col(integer(Trips::PassengerCount))
                    .col(string(Trips::Status))
                    .col(string_null(Trips::GroupId))
                    .col(text(Trips::StopsJson))
                    .col(timestamp(Trips::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trips_group_id")
                    .table(Trips::Table)
                    .col(Trips::GroupId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trips::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Trips {
    Table,
    Id,
    Direction,
    ReservationCode,
    ProductCode,
    RouteName,
    Date,
    DepartureTime,
    Contingent,
    PassengerCount,
    Status,
    GroupId,
    StopsJson,
    CreatedAt,
}
