//! Periodic booking sync: pulls the reservation window, refreshes the
//! unplanned trip pool and rewrites the dispatcher CSV when configured.

use app::booking_api::BookingClient;
use app::config::Config;
use app::error::{PlanningError, Result};
use app::service::PlanningService;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub async fn run_sync(service: Arc<PlanningService>, client: BookingClient, config: Config) {
    info!(
        "Starting booking sync every {}s for {} - {}",
        config.sync_interval_secs, config.date_from, config.date_to
    );

    let mut interval = tokio::time::interval(Duration::from_secs(config.sync_interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if let Err(e) = sync_once(&service, &client, &config).await {
            error!("Booking sync failed: {e}");
        }
    }
}

pub async fn sync_once(
    service: &PlanningService,
    client: &BookingClient,
    config: &Config,
) -> Result<()> {
    let report = service
        .sync_bookings(client, &config.date_from, &config.date_to)
        .await?;
    info!(
        "Synced bookings: {} fetched, {} inserted, {} planned kept",
        report.fetched, report.inserted, report.kept_planned
    );

    if let Some(path) = &config.export_path {
        match service.export_completed().await {
            Ok(csv) => {
                std::fs::write(path, csv).map_err(|e| {
                    PlanningError::Config(format!("Cannot write export file {path}: {e}"))
                })?;
                info!("Wrote dispatcher export to {path}");
            }
            // Nothing finished yet is not a failure of the sync pass.
            Err(PlanningError::Validation(_)) => debug!("No finished groups to export yet"),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}
