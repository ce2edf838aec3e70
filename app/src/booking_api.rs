//! Client for the external booking webhook.
//!
//! One POST returns every booking plus a flat stop list; each booking is
//! expanded into at most two trips, one per leg with a date. The wire
//! format uses German column names straight from the reservation system.

use crate::error::{PlanningError, Result};
use crate::types::{Direction, PlanningStatus, Stop, Trip, UNKNOWN_PLACE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    data: Option<ApiData>,
}

#[derive(Debug, Deserialize)]
struct ApiData {
    trips: Vec<ApiBooking>,
    stops: Vec<ApiStop>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBooking {
    #[serde(rename = "Reisecode")]
    pub reservation_code: String,
    #[serde(rename = "Produktcode", default)]
    pub product_code: Option<String>,
    #[serde(rename = "Reise", default)]
    pub route_name: Option<String>,
    #[serde(rename = "Hinfahrt von", default)]
    pub outbound_date: Option<String>,
    #[serde(rename = "Hinfahrt Kontingent", default)]
    pub outbound_quota: Option<i32>,
    #[serde(rename = "Hinfahrt Buchungen", default)]
    pub outbound_bookings: Option<i32>,
    #[serde(rename = "Rückfahrt von", default)]
    pub return_date: Option<String>,
    #[serde(rename = "Rückfahrt bis", default)]
    pub return_date_until: Option<String>,
    #[serde(rename = "Rückfahrt Kontingent", default)]
    pub return_quota: Option<i32>,
    #[serde(rename = "Rückfahrt Buchungen", default)]
    pub return_bookings: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiStop {
    #[serde(rename = "Reisecode")]
    pub reservation_code: String,
    #[serde(rename = "Beförderung", default)]
    pub direction_tag: String,
    #[serde(rename = "Zeit", default)]
    pub time: String,
    #[serde(rename = "Zustieg/Ausstieg", default)]
    pub location: Option<String>,
    #[serde(rename = "Anzahl", default)]
    pub passengers: Option<i32>,
}

/// Trips and raw stop rows from one webhook call.
#[derive(Debug, Clone)]
pub struct BookingData {
    pub trips: Vec<Trip>,
    pub stops: Vec<Stop>,
}

pub struct BookingClient {
    client: Client,
    base_url: String,
}

impl BookingClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(PlanningError::Http)?;

        Ok(Self { client, base_url })
    }

    /// Fetches all bookings and stops in a "DD.MM.YYYY" date range.
    pub async fn fetch_complete_data(&self, date_from: &str, date_to: &str) -> Result<BookingData> {
        let body = serde_json::json!({
            "action": "getCompleteData",
            "dateFrom": date_from,
            "dateTo": date_to,
        });

        let response = self.fetch_with_retry(&body).await?;
        if !response.success {
            return Err(PlanningError::InvalidResponse(
                "Booking API reported success=false".to_string(),
            ));
        }
        let Some(data) = response.data else {
            return Err(PlanningError::InvalidResponse(
                "Booking API response carries no data".to_string(),
            ));
        };
        debug!(
            "Fetched {} bookings with {} stop rows",
            data.trips.len(),
            data.stops.len()
        );

        let stops: Vec<Stop> = data.stops.into_iter().map(convert_stop).collect();
        let trips = derive_trips(&data.trips, &stops);
        Ok(BookingData { trips, stops })
    }

    async fn fetch_with_retry(&self, body: &serde_json::Value) -> Result<ApiResponse> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.fetch_data(body).await {
                Ok(response) => return Ok(response),
                Err(PlanningError::ServiceUnavailable) if attempts < MAX_RETRIES => {
                    warn!(
                        "Booking API unavailable (attempt {}/{}), retrying in {}ms",
                        attempts,
                        MAX_RETRIES,
                        RETRY_DELAY_MS * u64::from(attempts)
                    );
                    tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempts)))
                        .await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_data(&self, body: &serde_json::Value) -> Result<ApiResponse> {
        let response = self.client.post(&self.base_url).json(body).send().await?;

        if response.status() == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(PlanningError::ServiceUnavailable);
        }
        if !response.status().is_success() {
            return Err(PlanningError::InvalidResponse(format!(
                "HTTP {} for url={}",
                response.status(),
                self.base_url
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| PlanningError::Parse(format!("Booking API JSON error: {e}")))
    }
}

fn convert_stop(stop: ApiStop) -> Stop {
    Stop {
        reservation_code: stop.reservation_code,
        direction_tag: stop.direction_tag,
        time: stop.time,
        location: stop
            .location
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_PLACE.to_string()),
        passengers: stop.passengers.unwrap_or(0),
    }
}

/// Expands bookings into per-direction trips. A leg exists when its date
/// field is filled; the return leg falls back to the "bis" date.
pub fn derive_trips(bookings: &[ApiBooking], stops: &[Stop]) -> Vec<Trip> {
    let mut trips = Vec::new();
    for booking in bookings {
        if let Some(date) = non_empty(booking.outbound_date.as_deref()) {
            trips.push(build_trip(
                booking,
                Direction::Outbound,
                date,
                booking.outbound_quota.unwrap_or(0),
                booking.outbound_bookings.unwrap_or(0),
                stops,
            ));
        }
        let return_date = non_empty(booking.return_date.as_deref())
            .or_else(|| non_empty(booking.return_date_until.as_deref()));
        if let Some(date) = return_date {
            trips.push(build_trip(
                booking,
                Direction::Return,
                date,
                booking.return_quota.unwrap_or(0),
                booking.return_bookings.unwrap_or(0),
                stops,
            ));
        }
    }
    trips
}

fn build_trip(
    booking: &ApiBooking,
    direction: Direction,
    date: &str,
    contingent: i32,
    passenger_count: i32,
    stops: &[Stop],
) -> Trip {
    let own_stops: Vec<Stop> = stops
        .iter()
        .filter(|s| {
            s.reservation_code == booking.reservation_code && direction.matches_tag(&s.direction_tag)
        })
        .cloned()
        .collect();
    let departure_time = own_stops
        .first()
        .map_or_else(String::new, |s| s.time.clone());

    Trip {
        id: format!("{}-{}", booking.reservation_code, direction.id_suffix()),
        direction,
        reservation_code: booking.reservation_code.clone(),
        product_code: booking.product_code.clone().unwrap_or_default(),
        route_name: booking.route_name.clone().unwrap_or_default(),
        date: date.to_string(),
        departure_time,
        contingent,
        passenger_count,
        status: PlanningStatus::Unplanned,
        group_id: None,
        stops: own_stops,
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn booking(code: &str) -> ApiBooking {
        ApiBooking {
            reservation_code: code.to_string(),
            product_code: Some("SKI".to_string()),
            route_name: Some("Sölden - Hotel Alpenhof".to_string()),
            outbound_date: Some("10.01.2026".to_string()),
            outbound_quota: Some(50),
            outbound_bookings: Some(30),
            return_date: Some("12.01.2026".to_string()),
            return_date_until: None,
            return_quota: Some(50),
            return_bookings: Some(28),
        }
    }

    // === Wire format TESTS ===

    #[test]
    fn test_response_decodes_german_field_names() {
        let json = r#"{
            "success": true,
            "data": {
                "trips": [{
                    "Reisecode": "R100",
                    "Produktcode": "SKI",
                    "Reise": "Sölden - Hotel Alpenhof",
                    "Hinfahrt von": "10.01.2026",
                    "Hinfahrt Kontingent": 50,
                    "Hinfahrt Buchungen": 30,
                    "Rückfahrt von": "12.01.2026",
                    "Rückfahrt Kontingent": 50,
                    "Rückfahrt Buchungen": 28
                }],
                "stops": [{
                    "Reisecode": "R100",
                    "Beförderung": "Hinfahrt Zustieg",
                    "Zeit": "07:00",
                    "Zustieg/Ausstieg": "Essen Hbf",
                    "Anzahl": 30
                }]
            }
        }"#;

        let response: ApiResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        let data = response.data.unwrap();
        assert_eq!(data.trips[0].reservation_code, "R100");
        assert_eq!(data.trips[0].outbound_date.as_deref(), Some("10.01.2026"));
        assert_eq!(data.stops[0].location.as_deref(), Some("Essen Hbf"));
        assert_eq!(data.stops[0].passengers, Some(30));
    }

    #[test]
    fn test_stop_placeholder_for_missing_location() {
        let stop = ApiStop {
            reservation_code: "R100".to_string(),
            direction_tag: "Hinfahrt Zustieg".to_string(),
            time: "07:00".to_string(),
            location: Some("  ".to_string()),
            passengers: None,
        };
        let converted = convert_stop(stop);
        assert_eq!(converted.location, UNKNOWN_PLACE);
        assert_eq!(converted.passengers, 0);
    }

    // === derive_trips TESTS ===

    #[test]
    fn test_booking_expands_to_both_legs() {
        let stops = vec![
            Stop {
                reservation_code: "R100".to_string(),
                direction_tag: "Hinfahrt Zustieg".to_string(),
                time: "07:00".to_string(),
                location: "Essen".to_string(),
                passengers: 30,
            },
            Stop {
                reservation_code: "R100".to_string(),
                direction_tag: "Rückfahrt Zustieg".to_string(),
                time: "16:00".to_string(),
                location: "Sölden".to_string(),
                passengers: 28,
            },
        ];

        let trips = derive_trips(&[booking("R100")], &stops);
        assert_eq!(trips.len(), 2);

        assert_eq!(trips[0].id, "R100-HIN");
        assert_eq!(trips[0].direction, Direction::Outbound);
        assert_eq!(trips[0].date, "10.01.2026");
        assert_eq!(trips[0].departure_time, "07:00");
        assert_eq!(trips[0].passenger_count, 30);
        assert_eq!(trips[0].status, PlanningStatus::Unplanned);
        assert_eq!(trips[0].stops.len(), 1);

        assert_eq!(trips[1].id, "R100-RUECK");
        assert_eq!(trips[1].departure_time, "16:00");
        assert_eq!(trips[1].passenger_count, 28);
    }

    #[test]
    fn test_outbound_only_booking_yields_one_trip() {
        let mut one_way = booking("R200");
        one_way.return_date = None;
        one_way.return_quota = None;
        one_way.return_bookings = None;

        let trips = derive_trips(&[one_way], &[]);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "R200-HIN");
        assert!(trips[0].departure_time.is_empty());
    }

    #[test]
    fn test_return_leg_falls_back_to_until_date() {
        let mut stay = booking("R300");
        stay.outbound_date = None;
        stay.return_date = Some(String::new());
        stay.return_date_until = Some("15.01.2026".to_string());

        let trips = derive_trips(&[stay], &[]);
        assert_eq!(trips.len(), 1);
        assert_eq!(trips[0].id, "R300-RUECK");
        assert_eq!(trips[0].date, "15.01.2026");
    }

    #[test]
    fn test_client_construction() {
        assert!(BookingClient::new("https://example.com/webhook".to_string()).is_ok());
    }
}
