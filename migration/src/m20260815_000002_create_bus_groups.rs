use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BusGroups::Table)
                    .if_not_exists()
                    .col(string(BusGroups::Id).primary_key())
                    .col(string(BusGroups::TripNumber))
                    .col(string(BusGroups::Status))
                    .col(string_null(BusGroups::BusId))
                    .col(string_null(BusGroups::KmOutbound))
                    .col(string_null(BusGroups::KmReturn))
                    .col(string_null(BusGroups::Luggage))
                    .col(string_null(BusGroups::Accommodation))
                    .col(string_null(BusGroups::Notes))
                    .col(string_null(BusGroups::SplitGroupId))
                    .col(integer_null(BusGroups::PartNumber))
                    .col(integer_null(BusGroups::TotalParts))
                    .col(string_null(BusGroups::HubId))
                    .col(string(BusGroups::HubRole).default("none"))
                    .col(string_null(BusGroups::HubLocation))
                    .col(text(BusGroups::AssignedStopKeys).default("[]"))
                    .col(timestamp(BusGroups::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BusGroups::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BusGroups {
    Table,
    Id,
    TripNumber,
    Status,
    BusId,
    KmOutbound,
    KmReturn,
    Luggage,
    Accommodation,
    Notes,
    SplitGroupId,
    PartNumber,
    TotalParts,
    HubId,
    HubRole,
    HubLocation,
    AssignedStopKeys,
    CreatedAt,
}
