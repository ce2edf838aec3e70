//! Trip/stop aggregation: the chronological boarding manifest.
//!
//! Capacity math sums over this manifest, never over raw trip passenger
//! counts, because trip rows can carry stale cached totals.

use crate::dates::{add_days, effective_minutes, is_overnight_hour, parse_german_date};
use crate::types::{Direction, Stop, Trip};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fixed south-to-north city ordering used to group return-leg manifests
/// for display. Locations not on the list keep their chronological slot.
static RETURN_CITY_ORDER: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "München",
        "Stuttgart",
        "Nürnberg",
        "Mannheim",
        "Frankfurt",
        "Köln",
        "Essen",
        "Dortmund",
        "Hannover",
        "Bremen",
        "Hamburg",
        "Berlin",
    ]
});

/// One merged boarding event: identical (date, time, location, direction)
/// rows across reservation codes are folded with summed passengers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Effective date, already advanced for overnight times.
    pub date: String,
    pub time: String,
    pub location: String,
    pub direction: Direction,
    pub passengers: i32,
}

impl ManifestEntry {
    pub fn key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.date,
            self.time,
            self.location,
            self.direction.id_suffix()
        )
    }

    fn sort_key(&self) -> (NaiveDate, i32) {
        // Empty times (allowed on return legs) sort last within their day.
        (parse_german_date(&self.date), effective_minutes(&self.time))
    }
}

/// Effective calendar date of a stop: the trip date, advanced by one day
/// when the stop time falls into the overnight window.
pub fn effective_stop_date(trip_date: &str, time: &str) -> String {
    if is_overnight_hour(time) {
        add_days(trip_date, 1)
    } else {
        trip_date.to_string()
    }
}

/// Manifest key of a raw stop row, matching the key of the manifest entry
/// it folds into.
pub fn stop_key(trip: &Trip, stop: &Stop) -> String {
    format!(
        "{}|{}|{}|{}",
        effective_stop_date(&trip.date, &stop.time),
        stop.time,
        stop.location,
        trip.direction.id_suffix()
    )
}

/// Builds the ordered boarding manifest for one direction of a group.
///
/// Stops are matched to the group's trips by reservation code and leg tag.
/// Outbound stops without a time are dropped; return stops without a time
/// are kept and placed last.
pub fn aggregate_stops(trips: &[Trip], stops: &[Stop], direction: Direction) -> Vec<ManifestEntry> {
    let mut merged: HashMap<String, ManifestEntry> = HashMap::new();

    for stop in stops {
        if !direction.matches_tag(&stop.direction_tag) {
            continue;
        }
        let Some(trip) = trips
            .iter()
            .find(|t| t.direction == direction && t.reservation_code == stop.reservation_code)
        else {
            continue;
        };
        let has_time = !stop.time.trim().is_empty();
        if !has_time && direction == Direction::Outbound {
            continue;
        }

        let entry = ManifestEntry {
            date: effective_stop_date(&trip.date, &stop.time),
            time: stop.time.clone(),
            location: stop.location.clone(),
            direction,
            passengers: 0,
        };
        merged
            .entry(entry.key())
            .or_insert(entry)
            .passengers += stop.passengers;
    }

    let mut manifest: Vec<ManifestEntry> = merged.into_values().collect();
    manifest.sort_by_key(ManifestEntry::sort_key);
    manifest
}

pub fn manifest_total(manifest: &[ManifestEntry]) -> i32 {
    manifest.iter().map(|e| e.passengers).sum()
}

/// Per-direction passenger sum straight from trips and stops.
pub fn direction_total(trips: &[Trip], stops: &[Stop], direction: Direction) -> i32 {
    manifest_total(&aggregate_stops(trips, stops, direction))
}

/// Reorders a return-leg manifest by the static geography list; entries
/// whose location names no known city keep chronological order.
pub fn return_display_order(manifest: &[ManifestEntry]) -> Vec<ManifestEntry> {
    let mut ordered = manifest.to_vec();
    ordered.sort_by_key(|entry| city_rank(&entry.location));
    ordered
}

fn city_rank(location: &str) -> usize {
    RETURN_CITY_ORDER
        .iter()
        .position(|city| location.contains(city))
        .unwrap_or(usize::MAX)
}

/// Sum of a trip's own stop rows for its leg; the fine-grained truth the
/// split engine conserves.
pub fn trip_stop_total(trip: &Trip) -> i32 {
    trip.stops
        .iter()
        .filter(|s| trip.direction.matches_tag(&s.direction_tag))
        .map(|s| s.passengers)
        .sum()
}

/// Flags trips whose cached passenger count disagrees with their stop rows.
/// Not fatal: callers log these and proceed with the stop manifest.
pub fn passenger_anomalies(trips: &[Trip]) -> Vec<String> {
    trips
        .iter()
        .filter(|t| !t.stops.is_empty())
        .filter(|t| trip_stop_total(t) != t.passenger_count)
        .map(|t| {
            format!(
                "Trip {}: cached count {} but stop manifest sums to {}",
                t.id,
                t.passenger_count,
                trip_stop_total(t)
            )
        })
        .collect()
}
