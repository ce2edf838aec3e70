use app::booking_api::BookingClient;
use app::config::Config;
use app::db;
use app::service::PlanningService;
use migration::{Migrator, MigratorTrait};
use server_lib::sync;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    info!("Connecting to database: {}", config.database_url);
    let db = db::init_database(&config.database_url).await?;

    info!("Running migrations...");
    Migrator::up(&db, None).await?;

    let client = BookingClient::new(config.booking_api_url.clone())?;
    let service = Arc::new(PlanningService::new(db));

    let sync_handle = tokio::spawn(sync::run_sync(Arc::clone(&service), client, config));

    signal::ctrl_c().await?;
    info!("Shutting down");
    sync_handle.abort();
    Ok(())
}
