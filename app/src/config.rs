use crate::dates::format_german_date;
use crate::error::{PlanningError, Result};
use chrono::{Duration, Local};

/// Default sync window length when DATE_TO is not set: roughly one season.
const DEFAULT_RANGE_DAYS: i64 = 180;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub booking_api_url: String,
    /// "DD.MM.YYYY" bounds of the booking sync window.
    pub date_from: String,
    pub date_to: String,
    pub sync_interval_secs: u64,
    /// CSV target; export after each sync is skipped when unset.
    pub export_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = dotenvy::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://busplanung.db?mode=rwc".to_string());

        let booking_api_url = dotenvy::var("BOOKING_API_URL")
            .map_err(|_| PlanningError::Config("BOOKING_API_URL is required".to_string()))?;

        let today = Local::now().date_naive();
        let date_from = dotenvy::var("DATE_FROM").unwrap_or_else(|_| format_german_date(today));
        let date_to = dotenvy::var("DATE_TO").unwrap_or_else(|_| {
            today
                .checked_add_signed(Duration::days(DEFAULT_RANGE_DAYS))
                .map_or_else(|| format_german_date(today), format_german_date)
        });

        let sync_interval_secs = dotenvy::var("SYNC_INTERVAL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse::<u64>()
            .map_err(|_| PlanningError::Config("Invalid SYNC_INTERVAL_SECS".to_string()))?;

        let export_path = dotenvy::var("EXPORT_PATH").ok().filter(|s| !s.is_empty());

        Ok(Config {
            database_url,
            booking_api_url,
            date_from,
            date_to,
            sync_interval_secs,
            export_path,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_from_env_with_all_vars() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("sqlite::memory:")),
                ("BOOKING_API_URL", Some("https://example.com/webhook")),
                ("DATE_FROM", Some("01.11.2025")),
                ("DATE_TO", Some("30.04.2026")),
                ("SYNC_INTERVAL_SECS", Some("60")),
                ("EXPORT_PATH", Some("/tmp/fahrplan.csv")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.database_url, "sqlite::memory:");
                assert_eq!(config.booking_api_url, "https://example.com/webhook");
                assert_eq!(config.date_from, "01.11.2025");
                assert_eq!(config.date_to, "30.04.2026");
                assert_eq!(config.sync_interval_secs, 60);
                assert_eq!(config.export_path.as_deref(), Some("/tmp/fahrplan.csv"));
            },
        );
    }

    #[test]
    #[serial]
    fn test_booking_api_url_is_required() {
        temp_env::with_vars(
            [
                ("BOOKING_API_URL", None::<&str>),
                ("DATABASE_URL", Some("sqlite::memory:")),
            ],
            || {
                assert!(matches!(
                    Config::from_env(),
                    Err(PlanningError::Config(_))
                ));
            },
        );
    }

    #[test]
    #[serial]
    fn test_defaults_when_optional_vars_missing() {
        temp_env::with_vars(
            [
                ("BOOKING_API_URL", Some("https://example.com/webhook")),
                ("DATABASE_URL", None),
                ("DATE_FROM", None),
                ("DATE_TO", None),
                ("SYNC_INTERVAL_SECS", None),
                ("EXPORT_PATH", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert!(config.database_url.starts_with("sqlite://"));
                assert_eq!(config.sync_interval_secs, 300);
                assert!(config.export_path.is_none());
                // Window bounds are well-formed German dates.
                assert_eq!(config.date_from.len(), 10);
                assert_eq!(config.date_to.len(), 10);
            },
        );
    }

    #[test]
    #[serial]
    fn test_invalid_interval_rejected() {
        temp_env::with_vars(
            [
                ("BOOKING_API_URL", Some("https://example.com/webhook")),
                ("SYNC_INTERVAL_SECS", Some("bald")),
            ],
            || {
                assert!(matches!(
                    Config::from_env(),
                    Err(PlanningError::Config(_))
                ));
            },
        );
    }
}
