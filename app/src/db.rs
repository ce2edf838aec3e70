use crate::error::{PlanningError, Result};
use sea_orm::{Database, DatabaseConnection};

pub async fn init_database(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url)
        .await
        .map_err(|e| PlanningError::Config(format!("Failed to connect to database: {e}")))
}
