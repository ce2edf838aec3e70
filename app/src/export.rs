//! Dispatcher export: one semicolon-separated line per completed or
//! locked group, with the chronological boarding manifest inlined.

use crate::error::{PlanningError, Result};
use crate::manifest::{aggregate_stops, manifest_total, return_display_order, ManifestEntry};
use crate::types::{Bus, BusGroup, Direction, PlanningStatus, Trip};

const CSV_HEADER: &str = "Fahrt-Nr;Bus;Richtung;Reisecodes;Datum;Passagiere;KM-Hinweg;KM-Rückweg;Gepäck;Fahrerzimmer;Anmerkungen;Zustiege";

/// Flattened view of one exportable group.
#[derive(Debug, Clone)]
pub struct GroupSummary {
    pub trip_number: String,
    pub bus_label: String,
    pub direction_label: String,
    pub reservation_codes: String,
    pub date: String,
    /// Seats the group actually needs: the larger of the two leg totals.
    pub total_passengers: i32,
    pub km_outbound: String,
    pub km_return: String,
    pub luggage: String,
    pub accommodation: String,
    pub notes: String,
    pub stops: Vec<ManifestEntry>,
}

pub fn build_summary(group: &BusGroup, trips: &[Trip], bus: Option<&Bus>) -> GroupSummary {
    let stops: Vec<_> = trips.iter().flat_map(|t| t.stops.clone()).collect();
    let outbound = aggregate_stops(trips, &stops, Direction::Outbound);
    let ret = aggregate_stops(trips, &stops, Direction::Return);

    let mut codes: Vec<&str> = trips.iter().map(|t| t.reservation_code.as_str()).collect();
    codes.sort_unstable();
    codes.dedup();

    let mut dates: Vec<&str> = trips.iter().map(|t| t.date.as_str()).collect();
    dates.sort_by_key(|d| crate::dates::parse_german_date(d));

    // Outbound stays chronological; the return leg is listed in the
    // fixed south-to-north geography order dispatchers expect.
    let mut manifest = outbound.clone();
    manifest.extend(return_display_order(&ret));

    GroupSummary {
        trip_number: group.trip_number.clone(),
        bus_label: bus.map_or_else(String::new, |b| format!("{} ({} Plätze)", b.name, b.seat_count)),
        direction_label: direction_label(trips),
        reservation_codes: codes.join(", "),
        date: dates.first().map_or_else(String::new, ToString::to_string),
        total_passengers: manifest_total(&outbound).max(manifest_total(&ret)),
        km_outbound: group.km_outbound.clone().unwrap_or_default(),
        km_return: group.km_return.clone().unwrap_or_default(),
        luggage: group.luggage.clone().unwrap_or_default(),
        accommodation: group.accommodation.clone().unwrap_or_default(),
        notes: group.notes.clone().unwrap_or_default(),
        stops: manifest,
    }
}

/// Serializes every completed or locked group. Groups still in draft are
/// skipped; an export with nothing to say is an error, not an empty file.
pub fn export_groups(groups: &[(BusGroup, Vec<Trip>, Option<Bus>)]) -> Result<String> {
    let summaries: Vec<GroupSummary> = groups
        .iter()
        .filter(|(g, _, _)| {
            matches!(g.status, PlanningStatus::Completed | PlanningStatus::Locked)
        })
        .map(|(g, trips, bus)| build_summary(g, trips, bus.as_ref()))
        .collect();
    if summaries.is_empty() {
        return Err(PlanningError::Validation(
            "No completed or locked groups to export".to_string(),
        ));
    }

    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for summary in summaries {
        out.push_str(&to_csv_line(&summary));
        out.push('\n');
    }
    Ok(out)
}

fn direction_label(trips: &[Trip]) -> String {
    let outbound = trips.iter().any(|t| t.direction == Direction::Outbound);
    let ret = trips.iter().any(|t| t.direction == Direction::Return);
    match (outbound, ret) {
        (true, true) => "Hin+Rückfahrt".to_string(),
        (true, false) => Direction::Outbound.label().to_string(),
        (false, true) => Direction::Return.label().to_string(),
        (false, false) => String::new(),
    }
}

fn to_csv_line(summary: &GroupSummary) -> String {
    let manifest = summary
        .stops
        .iter()
        .map(|e| {
            format!(
                "{} {} {} ({})",
                e.date, e.time, e.location, e.passengers
            )
        })
        .collect::<Vec<_>>()
        .join(" | ");

    [
        summary.trip_number.clone(),
        summary.bus_label.clone(),
        summary.direction_label.clone(),
        summary.reservation_codes.clone(),
        summary.date.clone(),
        summary.total_passengers.to_string(),
        summary.km_outbound.clone(),
        summary.km_return.clone(),
        summary.luggage.clone(),
        summary.accommodation.clone(),
        summary.notes.clone(),
        manifest,
    ]
    .into_iter()
    .map(|field| csv_field(&field))
    .collect::<Vec<_>>()
    .join(";")
}

/// Quotes a field when it contains the delimiter, quotes or newlines.
fn csv_field(value: &str) -> String {
    if value.contains([';', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
