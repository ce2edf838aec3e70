//! Hub transfer engine: several planned groups funnel their early boardings
//! through one shared stop. A single collector bus visits every pre-hub
//! stop; the other buses start at the hub and take their own riders back.
//!
//! Planning is pure; the service layer persists a [`HubPlan`] in one
//! transaction and re-reads the rows afterwards to verify the write.

use crate::dates::{effective_minutes, parse_german_date};
use crate::error::{PlanningError, Result};
use crate::manifest::{aggregate_stops, effective_stop_date, ManifestEntry};
use crate::types::{Direction, HubRole, Stop, Trip};
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// One planned group entering the hub wizard, with its member trips and
/// their embedded stop lists.
#[derive(Debug, Clone)]
pub struct HubGroup {
    pub group_id: String,
    pub trips: Vec<Trip>,
}

impl HubGroup {
    fn stops(&self) -> Vec<Stop> {
        self.trips.iter().flat_map(|t| t.stops.clone()).collect()
    }

    fn outbound_manifest(&self) -> Vec<ManifestEntry> {
        aggregate_stops(&self.trips, &self.stops(), Direction::Outbound)
    }
}

/// The planned rewrite of one trip's stop list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripStopRewrite {
    pub trip_id: String,
    pub stops: Vec<Stop>,
    /// Expected values for the post-commit read-back check.
    pub first_stop_passengers: i32,
    pub total_passengers: i32,
}

#[derive(Debug, Clone)]
pub struct GroupRewrite {
    pub group_id: String,
    pub role: HubRole,
    pub trips: Vec<TripStopRewrite>,
}

#[derive(Debug, Clone)]
pub struct HubPlan {
    pub hub_id: String,
    pub hub_location: String,
    pub collector_group_id: String,
    pub rewrites: Vec<GroupRewrite>,
}

/// Stop locations usable as a hub: present in every group's outbound
/// manifest, never the first stop of any group, and not the final stop of
/// all of them. Fewer than two groups yield no candidates.
pub fn candidate_hub_stops(groups: &[HubGroup]) -> Vec<String> {
    if groups.len() < 2 {
        return Vec::new();
    }
    let manifests: Vec<Vec<ManifestEntry>> = groups.iter().map(HubGroup::outbound_manifest).collect();
    if manifests.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let first_stops: HashSet<&str> = manifests
        .iter()
        .filter_map(|m| m.first().map(|e| e.location.as_str()))
        .collect();

    let mut candidates = Vec::new();
    for entry in &manifests[0] {
        let location = entry.location.as_str();
        if candidates.iter().any(|c| c == location) {
            continue;
        }
        let everywhere = manifests
            .iter()
            .all(|m| m.iter().any(|e| e.location == location));
        let last_everywhere = manifests
            .iter()
            .all(|m| m.last().is_some_and(|e| e.location == location));
        if everywhere && !first_stops.contains(location) && !last_everywhere {
            candidates.push(location.to_string());
        }
    }
    candidates
}

/// Computes the full stop rewrite for a hub transfer without touching any
/// state. The service layer commits the result atomically.
pub fn plan_hub_transfer(
    groups: &[HubGroup],
    hub_location: &str,
    collector_group_id: &str,
) -> Result<HubPlan> {
    if groups.len() < 2 {
        return Err(PlanningError::Validation(
            "A hub transfer needs at least two planned groups".to_string(),
        ));
    }
    if !groups.iter().any(|g| g.group_id == collector_group_id) {
        return Err(PlanningError::Validation(format!(
            "Collector group {collector_group_id} is not part of the transfer"
        )));
    }

    // Pre-hub prefixes, per group, plus the group's hub cut-off instant.
    let mut prefixes: HashMap<&str, Vec<ManifestEntry>> = HashMap::new();
    let mut hub_entries: HashMap<&str, ManifestEntry> = HashMap::new();
    for group in groups {
        let manifest = group.outbound_manifest();
        let Some(index) = manifest.iter().position(|e| e.location == hub_location) else {
            return Err(PlanningError::Validation(format!(
                "Stop {hub_location} is missing from group {}",
                group.group_id
            )));
        };
        hub_entries.insert(&group.group_id, manifest[index].clone());
        prefixes.insert(&group.group_id, manifest[..index].to_vec());
    }

    // Combined pre-hub boardings per stop name, across all groups. The
    // earliest entry per name keeps its time for synthetic collector stops.
    let mut combined: HashMap<String, (i32, ManifestEntry)> = HashMap::new();
    for entry in prefixes.values().flatten() {
        combined
            .entry(entry.location.clone())
            .and_modify(|(total, first)| {
                *total += entry.passengers;
                if sort_instant(entry) < sort_instant(first) {
                    *first = entry.clone();
                }
            })
            .or_insert_with(|| (entry.passengers, entry.clone()));
    }

    let mut rewrites = Vec::with_capacity(groups.len());
    for group in groups {
        let hub_entry = &hub_entries[group.group_id.as_str()];
        let rewrite = if group.group_id == collector_group_id {
            rewrite_collector(group, hub_entry, &combined)
        } else {
            rewrite_outgoing(group, hub_entry)
        };
        rewrites.push(rewrite);
    }

    Ok(HubPlan {
        hub_id: Uuid::new_v4().to_string(),
        hub_location: hub_location.to_string(),
        collector_group_id: collector_group_id.to_string(),
        rewrites,
    })
}

/// Post-commit read-back check: the persisted stop list must match the
/// planned one in length and first-stop passenger count.
pub fn verify_rewrite(expected: &TripStopRewrite, persisted: &[Stop]) -> Result<()> {
    let first = persisted.first().map_or(0, |s| s.passengers);
    if persisted.len() != expected.stops.len() || first != expected.first_stop_passengers {
        return Err(PlanningError::Database(sea_orm::DbErr::Custom(format!(
            "Hub rewrite verification failed for trip {}: found {} stops starting at {}, expected {} starting at {}",
            expected.trip_id,
            persisted.len(),
            first,
            expected.stops.len(),
            expected.first_stop_passengers
        ))));
    }
    Ok(())
}

fn sort_instant(entry: &ManifestEntry) -> (NaiveDate, i32) {
    (
        parse_german_date(&entry.date),
        effective_minutes(&entry.time),
    )
}

fn stop_instant(trip: &Trip, stop: &Stop) -> (NaiveDate, i32) {
    (
        parse_german_date(&effective_stop_date(&trip.date, &stop.time)),
        effective_minutes(&stop.time),
    )
}

/// The collector keeps its route and absorbs everyone else's pre-hub
/// boardings: each of its pre-hub stops is raised to the combined total
/// for that stop name, and names it never visited are added as new stops.
fn rewrite_collector(
    group: &HubGroup,
    hub_entry: &ManifestEntry,
    combined: &HashMap<String, (i32, ManifestEntry)>,
) -> GroupRewrite {
    let hub_instant = sort_instant(hub_entry);

    // Collector's own pre-hub totals per stop name, across its trips.
    let mut own: HashMap<String, i32> = HashMap::new();
    for trip in outbound_trips(&group.trips) {
        for stop in matching_stops(trip) {
            if stop_instant(trip, stop) < hub_instant {
                *own.entry(stop.location.clone()).or_default() += stop.passengers;
            }
        }
    }

    let mut raised: HashSet<String> = HashSet::new();
    let mut trips = Vec::new();
    let mut first_outbound = true;
    for trip in &group.trips {
        if trip.direction != Direction::Outbound {
            continue;
        }
        let mut stops: Vec<Stop> = Vec::new();
        for stop in matching_stops(trip) {
            let mut stop = stop.clone();
            if stop_instant(trip, &stop) < hub_instant && raised.insert(stop.location.clone()) {
                if let Some((total, _)) = combined.get(&stop.location) {
                    // First occurrence of the name carries the whole delta.
                    stop.passengers += total - own.get(&stop.location).copied().unwrap_or(0);
                }
            }
            stops.push(stop);
        }
        if first_outbound {
            for (location, (total, entry)) in combined {
                if !own.contains_key(location) {
                    stops.push(Stop {
                        reservation_code: trip.reservation_code.clone(),
                        direction_tag: format!("{} Zustieg", trip.direction.label()),
                        time: entry.time.clone(),
                        location: location.clone(),
                        passengers: *total,
                    });
                }
            }
            first_outbound = false;
        }
        stops.sort_by_key(|s| stop_instant(trip, s));
        trips.push(finish_rewrite(trip, stops));
    }

    GroupRewrite {
        group_id: group.group_id.clone(),
        role: HubRole::Collector,
        trips,
    }
}

/// An outgoing bus skips every stop before the hub. Its riders who boarded
/// earlier ride the collector to the hub and rejoin here, so the hub stop
/// carries the trip's own pre-hub sum on top of its own hub boardings.
fn rewrite_outgoing(group: &HubGroup, hub_entry: &ManifestEntry) -> GroupRewrite {
    let hub_instant = sort_instant(hub_entry);

    let mut trips = Vec::new();
    for trip in outbound_trips(&group.trips) {
        let mut transferred = 0;
        let mut stops: Vec<Stop> = Vec::new();
        for stop in matching_stops(trip) {
            if stop_instant(trip, stop) < hub_instant {
                transferred += stop.passengers;
            } else {
                stops.push(stop.clone());
            }
        }
        match stops
            .iter_mut()
            .find(|s| s.location == hub_entry.location)
        {
            Some(hub_stop) => hub_stop.passengers += transferred,
            None => stops.insert(
                0,
                Stop {
                    reservation_code: trip.reservation_code.clone(),
                    direction_tag: format!("{} Zustieg", trip.direction.label()),
                    time: hub_entry.time.clone(),
                    location: hub_entry.location.clone(),
                    passengers: transferred,
                },
            ),
        }
        stops.sort_by_key(|s| stop_instant(trip, s));
        trips.push(finish_rewrite(trip, stops));
    }

    GroupRewrite {
        group_id: group.group_id.clone(),
        role: HubRole::Outgoing,
        trips,
    }
}

fn outbound_trips(trips: &[Trip]) -> impl Iterator<Item = &Trip> {
    trips.iter().filter(|t| t.direction == Direction::Outbound)
}

fn matching_stops(trip: &Trip) -> impl Iterator<Item = &Stop> {
    trip.stops
        .iter()
        .filter(|s| trip.direction.matches_tag(&s.direction_tag))
}

fn finish_rewrite(trip: &Trip, stops: Vec<Stop>) -> TripStopRewrite {
    let total = stops.iter().map(|s| s.passengers).sum();
    let first = stops.first().map_or(0, |s| s.passengers);
    TripStopRewrite {
        trip_id: trip.id.clone(),
        stops,
        first_stop_passengers: first,
        total_passengers: total,
    }
}
