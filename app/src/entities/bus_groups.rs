use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "bus_groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub trip_number: String,
    pub status: String,
    pub bus_id: Option<String>,
    pub km_outbound: Option<String>,
    pub km_return: Option<String>,
    pub luggage: Option<String>,
    pub accommodation: Option<String>,
    pub notes: Option<String>,
    pub split_group_id: Option<String>,
    pub part_number: Option<i32>,
    pub total_parts: Option<i32>,
    pub hub_id: Option<String>,
    pub hub_role: String,
    pub hub_location: Option<String>,
    /// JSON array of manifest stop keys owned after a stop-level split.
    #[sea_orm(column_type = "Text")]
    pub assigned_stop_keys: String,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
