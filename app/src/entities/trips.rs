use sea_orm::entity::prelude::*;

/// One directional leg of a reservation. The stop list is embedded as a
/// JSON column and rewritten wholesale by split and hub commits.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "trips")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub direction: String,
    pub reservation_code: String,
    pub product_code: String,
    pub route_name: String,
    pub date: String,
    pub departure_time: String,
    pub contingent: i32,
    pub passenger_count: i32,
    pub status: String,
    pub group_id: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub stops_json: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
