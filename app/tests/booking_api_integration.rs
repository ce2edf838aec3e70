//! Booking webhook client against a mock server: decoding, retry on 503
//! and error mapping.
#![allow(clippy::unwrap_used)]

use app::booking_api::BookingClient;
use app::error::PlanningError;
use app::types::Direction;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn complete_data_payload() -> serde_json::Value {
    serde_json::json!({
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
            "stops": [
                {
                    "Reisecode": "R100",
                    "Beförderung": "Hinfahrt Zustieg",
                    "Zeit": "07:00",
                    "Zustieg/Ausstieg": "Essen Hbf",
                    "Anzahl": 30
                },
                {
                    "Reisecode": "R100",
                    "Beförderung": "Rückfahrt Zustieg",
                    "Zeit": "16:00",
                    "Zustieg/Ausstieg": "Sölden",
                    "Anzahl": 28
                }
            ]
        }
    })
}

#[tokio::test]
async fn test_fetch_complete_data_derives_trips() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_string_contains("getCompleteData"))
        .and(body_string_contains("10.01.2026"))
        .respond_with(ResponseTemplate::new(200).set_body_json(complete_data_payload()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = BookingClient::new(mock_server.uri()).unwrap();
    let data = client
        .fetch_complete_data("10.01.2026", "30.04.2026")
        .await
        .unwrap();

    assert_eq!(data.trips.len(), 2);
    assert_eq!(data.stops.len(), 2);
    assert_eq!(data.trips[0].id, "R100-HIN");
    assert_eq!(data.trips[0].direction, Direction::Outbound);
    assert_eq!(data.trips[0].departure_time, "07:00");
    assert_eq!(data.trips[1].id, "R100-RUECK");
    assert_eq!(data.trips[1].passenger_count, 28);
}

#[tokio::test]
async fn test_retries_on_503_then_succeeds() {
    let mock_server = MockServer::start().await;
    let call_count = Arc::new(AtomicU32::new(0));
    let counter = call_count.clone();

    Mock::given(method("POST"))
        .respond_with(move |_req: &Request| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            if attempt < 2 {
                ResponseTemplate::new(503)
            } else {
                ResponseTemplate::new(200).set_body_json(complete_data_payload())
            }
        })
        .mount(&mock_server)
        .await;

    let client = BookingClient::new(mock_server.uri()).unwrap();
    let data = client
        .fetch_complete_data("10.01.2026", "30.04.2026")
        .await
        .unwrap();

    assert_eq!(call_count.load(Ordering::SeqCst), 3);
    assert_eq!(data.trips.len(), 2);
}

#[tokio::test]
async fn test_persistent_503_gives_up_after_retries() {
    let mock_server = MockServer::start().await;
    let call_count = Arc::new(AtomicU32::new(0));
    let counter = call_count.clone();

    Mock::given(method("POST"))
        .respond_with(move |_req: &Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503)
        })
        .mount(&mock_server)
        .await;

    let client = BookingClient::new(mock_server.uri()).unwrap();
    let err = client.fetch_complete_data("10.01.2026", "30.04.2026").await;

    assert!(matches!(err, Err(PlanningError::ServiceUnavailable)));
    assert_eq!(call_count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_server_error_does_not_retry() {
    let mock_server = MockServer::start().await;
    let call_count = Arc::new(AtomicU32::new(0));
    let counter = call_count.clone();

    Mock::given(method("POST"))
        .respond_with(move |_req: &Request| {
            counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(500)
        })
        .mount(&mock_server)
        .await;

    let client = BookingClient::new(mock_server.uri()).unwrap();
    let err = client.fetch_complete_data("10.01.2026", "30.04.2026").await;

    assert!(matches!(err, Err(PlanningError::InvalidResponse(_))));
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unsuccessful_payload_is_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "success": false })),
        )
        .mount(&mock_server)
        .await;

    let client = BookingClient::new(mock_server.uri()).unwrap();
    let err = client.fetch_complete_data("10.01.2026", "30.04.2026").await;
    assert!(matches!(err, Err(PlanningError::InvalidResponse(_))));
}
