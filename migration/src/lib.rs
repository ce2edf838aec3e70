pub use sea_orm_migration::prelude::*;

mod m20260815_000001_create_trips;
mod m20260815_000002_create_bus_groups;
mod m20260815_000003_create_buses;
mod m20260815_000004_seed_buses;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_trips::Migration),
            Box::new(m20260815_000002_create_bus_groups::Migration),
            Box::new(m20260815_000003_create_buses::Migration),
            Box::new(m20260815_000004_seed_buses::Migration),
        ]
    }
}
