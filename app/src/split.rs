//! Split engine: partitions an oversized group between exactly two target
//! buses, by stop-level reallocation, by whole trips, or by an explicit
//! operator assignment.
//!
//! The balancing is a greedy smaller-total-first heuristic, not an optimal
//! bin-packing.

use crate::error::{PlanningError, Result};
use crate::manifest::{aggregate_stops, stop_key};
use crate::types::{Bus, Direction, Stop, Trip};
use std::collections::HashMap;

/// Trip-number suffixes of the two split parts ("007a"/"007b").
pub const PART_SUFFIXES: [char; 2] = ['a', 'b'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitTarget {
    First,
    Second,
}

impl SplitTarget {
    const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub enum SplitStrategy {
    /// Greedy stop-level balance over the chronological manifest.
    StopBalance,
    /// Greedy balance moving each trip as a unit; the fallback when a trip
    /// has no stop detail.
    TripBalance,
    /// Operator-picked assignment of every manifest stop key.
    Manual(HashMap<String, SplitTarget>),
}

/// One trip's contribution to one part. After a stop-level split a trip
/// can appear in both parts with adjusted counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripShare {
    pub trip_id: String,
    pub passengers: i32,
    /// Manifest keys of this trip's stops owned by the part.
    pub stop_keys: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SplitPart {
    pub passengers: i32,
    pub shares: Vec<TripShare>,
    /// Ordered manifest keys assigned to this part, for later re-display.
    pub assigned_stop_keys: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SplitPlan {
    pub parts: [SplitPart; 2],
}

impl SplitPlan {
    pub fn total_passengers(&self) -> i32 {
        self.parts.iter().map(|p| p.passengers).sum()
    }

    /// Combined share of one original trip across both parts.
    pub fn trip_total(&self, trip_id: &str) -> i32 {
        self.parts
            .iter()
            .flat_map(|p| &p.shares)
            .filter(|s| s.trip_id == trip_id)
            .map(|s| s.passengers)
            .sum()
    }
}

/// Plans a two-way split of a single-direction trip set.
pub fn plan_split(trips: &[Trip], stops: &[Stop], strategy: &SplitStrategy) -> Result<SplitPlan> {
    let direction = single_direction(trips)?;
    match strategy {
        SplitStrategy::StopBalance => {
            let assignment = balance_stops(trips, stops, direction)?;
            build_stop_plan(trips, stops, direction, &assignment)
        }
        SplitStrategy::Manual(assignment) => {
            validate_manual(trips, stops, direction, assignment)?;
            build_stop_plan(trips, stops, direction, assignment)
        }
        SplitStrategy::TripBalance => Ok(balance_trips(trips)),
    }
}

/// Blocks completion when either part exceeds its target bus; this is the
/// engine-side gate behind the UI's disabled button.
pub fn validate_split(plan: &SplitPlan, first: &Bus, second: &Bus) -> Result<()> {
    for (part, bus) in plan.parts.iter().zip([first, second]) {
        if part.passengers > bus.seat_count {
            return Err(PlanningError::Validation(format!(
                "Bus {} has {} seats but the assigned part carries {} passengers",
                bus.name, bus.seat_count, part.passengers
            )));
        }
    }
    Ok(())
}

fn single_direction(trips: &[Trip]) -> Result<Direction> {
    let mut directions = trips.iter().map(|t| t.direction);
    let Some(first) = directions.next() else {
        return Err(PlanningError::Validation(
            "Cannot split an empty group".to_string(),
        ));
    };
    if directions.any(|d| d != first) {
        return Err(PlanningError::Validation(
            "Split requires trips of a single direction".to_string(),
        ));
    }
    Ok(first)
}

/// Greedy pass over the chronological manifest: each stop goes to the part
/// with the smaller running total; ties favour the first bus.
fn balance_stops(
    trips: &[Trip],
    stops: &[Stop],
    direction: Direction,
) -> Result<HashMap<String, SplitTarget>> {
    let manifest = aggregate_stops(trips, stops, direction);
    if manifest.is_empty() {
        return Err(PlanningError::Validation(
            "No stop detail available; split by trips instead".to_string(),
        ));
    }

    let mut totals = [0i32; 2];
    let mut assignment = HashMap::new();
    for entry in &manifest {
        let target = if totals[0] <= totals[1] {
            SplitTarget::First
        } else {
            SplitTarget::Second
        };
        totals[target.index()] += entry.passengers;
        assignment.insert(entry.key(), target);
    }
    Ok(assignment)
}

fn validate_manual(
    trips: &[Trip],
    stops: &[Stop],
    direction: Direction,
    assignment: &HashMap<String, SplitTarget>,
) -> Result<()> {
    for entry in aggregate_stops(trips, stops, direction) {
        if entry.passengers > 0 && !assignment.contains_key(&entry.key()) {
            return Err(PlanningError::Validation(format!(
                "Stop {} at {} ({} passengers) has no bus assignment",
                entry.location, entry.time, entry.passengers
            )));
        }
    }
    Ok(())
}

/// Expands a stop-key assignment into per-trip shares. Every raw stop row
/// folds into exactly one assigned key, so per-trip totals are conserved.
fn build_stop_plan(
    trips: &[Trip],
    stops: &[Stop],
    direction: Direction,
    assignment: &HashMap<String, SplitTarget>,
) -> Result<SplitPlan> {
    let mut parts: [SplitPart; 2] = [SplitPart::default(), SplitPart::default()];
    let mut shares: HashMap<(String, usize), TripShare> = HashMap::new();

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
        if stop.time.trim().is_empty() && direction == Direction::Outbound {
            continue;
        }
        let key = stop_key(trip, stop);
        let Some(&target) = assignment.get(&key) else {
            continue;
        };

        let share = shares
            .entry((trip.id.clone(), target.index()))
            .or_insert_with(|| TripShare {
                trip_id: trip.id.clone(),
                passengers: 0,
                stop_keys: Vec::new(),
            });
        share.passengers += stop.passengers;
        if !share.stop_keys.contains(&key) {
            share.stop_keys.push(key.clone());
        }
    }

    for ((_, index), share) in shares {
        parts[index].passengers += share.passengers;
        parts[index].shares.push(share);
    }
    // Ordered key lists follow the chronological manifest.
    for entry in aggregate_stops(trips, stops, direction) {
        if let Some(&target) = assignment.get(&entry.key()) {
            parts[target.index()].assigned_stop_keys.push(entry.key());
        }
    }
    for part in &mut parts {
        part.shares.sort_by(|a, b| a.trip_id.cmp(&b.trip_id));
    }

    Ok(SplitPlan { parts })
}

/// Whole-trip greedy balance on descending passenger count; the second
/// part is forced non-empty when there are at least two trips.
fn balance_trips(trips: &[Trip]) -> SplitPlan {
    let mut sorted: Vec<&Trip> = trips.iter().collect();
    sorted.sort_by(|a, b| b.passenger_count.cmp(&a.passenger_count));

    let mut parts: [SplitPart; 2] = [SplitPart::default(), SplitPart::default()];
    for trip in sorted {
        let index = usize::from(parts[0].passengers > parts[1].passengers);
        parts[index].passengers += trip.passenger_count;
        parts[index].shares.push(whole_trip_share(trip));
    }

    if parts[1].shares.is_empty() && parts[0].shares.len() >= 2 {
        if let Some(moved) = parts[0].shares.pop() {
            parts[0].passengers -= moved.passengers;
            parts[1].passengers += moved.passengers;
            parts[1].shares.push(moved);
        }
    }

    SplitPlan { parts }
}

fn whole_trip_share(trip: &Trip) -> TripShare {
    TripShare {
        trip_id: trip.id.clone(),
        passengers: trip.passenger_count,
        stop_keys: trip
            .stops
            .iter()
            .filter(|s| trip.direction.matches_tag(&s.direction_tag))
            .map(|s| stop_key(trip, s))
            .collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::PlanningStatus;

    fn trip_with_stops(code: &str, passengers: i32, stop_spec: &[(&str, &str, i32)]) -> Trip {
        Trip {
            id: format!("{code}-HIN"),
            direction: Direction::Outbound,
            reservation_code: code.to_string(),
            product_code: String::new(),
            route_name: "Sölden - Hotel Alpenhof".to_string(),
            date: "10.01.2026".to_string(),
            departure_time: "07:00".to_string(),
            contingent: 80,
            passenger_count: passengers,
            status: PlanningStatus::Draft,
            group_id: Some("g1".to_string()),
            stops: stop_spec
                .iter()
                .map(|(time, location, count)| Stop {
                    reservation_code: code.to_string(),
                    direction_tag: "Hinfahrt Zustieg".to_string(),
                    time: (*time).to_string(),
                    location: (*location).to_string(),
                    passengers: *count,
                })
                .collect(),
        }
    }

    fn all_stops(trips: &[Trip]) -> Vec<Stop> {
        trips.iter().flat_map(|t| t.stops.clone()).collect()
    }

    fn bus(seats: i32) -> Bus {
        Bus {
            id: format!("bus-{seats}"),
            name: format!("Bus {seats}"),
            seat_count: seats,
            is_contractual: false,
        }
    }

    // === Stop-balance TESTS ===

    #[test]
    fn test_stop_balance_greedy_smaller_first() {
        // Fixed chronological order: 20, 15, 10, 15, 10 passengers.
        let trips = vec![trip_with_stops(
            "R100",
            70,
            &[
                ("07:00", "Essen", 20),
                ("08:00", "Köln", 15),
                ("09:00", "Bonn", 10),
                ("10:00", "Frankfurt", 15),
                ("11:00", "Mannheim", 10),
            ],
        )];
        let stops = all_stops(&trips);

        let plan = plan_split(&trips, &stops, &SplitStrategy::StopBalance).unwrap();

        assert_eq!(plan.total_passengers(), 70);
        assert_eq!(plan.parts[0].passengers, 35);
        assert_eq!(plan.parts[1].passengers, 35);
        assert!(plan.parts.iter().all(|p| p.passengers <= 61));
        // Greedy trace: A=20 | B=15 | B=25 | A=35 | B=35.
        assert_eq!(plan.parts[0].assigned_stop_keys.len(), 2);
        assert_eq!(plan.parts[1].assigned_stop_keys.len(), 3);
        assert!(validate_split(&plan, &bus(61), &bus(49)).is_ok());
    }

    #[test]
    fn test_stop_balance_conserves_per_trip_counts() {
        let trips = vec![
            trip_with_stops("R100", 30, &[("07:00", "Essen", 20), ("09:00", "Bonn", 10)]),
            trip_with_stops("R200", 40, &[("08:00", "Köln", 25), ("10:00", "Mainz", 15)]),
        ];
        let stops = all_stops(&trips);

        let plan = plan_split(&trips, &stops, &SplitStrategy::StopBalance).unwrap();
        assert_eq!(plan.trip_total("R100-HIN"), 30);
        assert_eq!(plan.trip_total("R200-HIN"), 40);
        assert_eq!(plan.total_passengers(), 70);
    }

    #[test]
    fn test_stop_balance_without_stop_detail_rejected() {
        let trips = vec![trip_with_stops("R100", 70, &[])];
        let err = plan_split(&trips, &[], &SplitStrategy::StopBalance);
        assert!(matches!(err, Err(PlanningError::Validation(_))));
    }

    // === Trip-balance TESTS ===

    #[test]
    fn test_trip_balance_moves_whole_trips() {
        let trips = vec![
            trip_with_stops("R100", 25, &[("07:00", "Essen", 25)]),
            trip_with_stops("R200", 20, &[("08:00", "Köln", 20)]),
            trip_with_stops("R300", 15, &[("09:00", "Bonn", 15)]),
            trip_with_stops("R400", 10, &[("10:00", "Mainz", 10)]),
        ];
        let plan = plan_split(&trips, &all_stops(&trips), &SplitStrategy::TripBalance).unwrap();

        assert_eq!(plan.parts[0].passengers, 35);
        assert_eq!(plan.parts[1].passengers, 35);
        for trip in &trips {
            assert_eq!(plan.trip_total(&trip.id), trip.passenger_count);
            // A whole trip never spans both parts here.
            let appearances = plan
                .parts
                .iter()
                .filter(|p| p.shares.iter().any(|s| s.trip_id == trip.id))
                .count();
            assert_eq!(appearances, 1);
        }
    }

    #[test]
    fn test_trip_balance_forces_second_part_nonempty() {
        let trips = vec![
            trip_with_stops("R100", 0, &[]),
            trip_with_stops("R200", 0, &[]),
        ];
        let plan = plan_split(&trips, &[], &SplitStrategy::TripBalance).unwrap();
        assert!(!plan.parts[0].shares.is_empty());
        assert!(!plan.parts[1].shares.is_empty());
    }

    // === Manual TESTS ===

    #[test]
    fn test_manual_requires_every_populated_stop() {
        let trips = vec![trip_with_stops(
            "R100",
            30,
            &[("07:00", "Essen", 20), ("09:00", "Bonn", 10)],
        )];
        let stops = all_stops(&trips);
        let essen_key = stop_key(&trips[0], &trips[0].stops[0]);
        let bonn_key = stop_key(&trips[0], &trips[0].stops[1]);

        let partial: HashMap<String, SplitTarget> =
            [(essen_key.clone(), SplitTarget::First)].into();
        assert!(matches!(
            plan_split(&trips, &stops, &SplitStrategy::Manual(partial)),
            Err(PlanningError::Validation(_))
        ));

        let full: HashMap<String, SplitTarget> = [
            (essen_key, SplitTarget::First),
            (bonn_key, SplitTarget::Second),
        ]
        .into();
        let plan = plan_split(&trips, &stops, &SplitStrategy::Manual(full)).unwrap();
        assert_eq!(plan.parts[0].passengers, 20);
        assert_eq!(plan.parts[1].passengers, 10);
    }

    // === Validation TESTS ===

    #[test]
    fn test_mixed_directions_rejected() {
        let mut outbound = trip_with_stops("R100", 30, &[("07:00", "Essen", 30)]);
        let mut ret = trip_with_stops("R200", 20, &[("14:00", "Köln", 20)]);
        ret.direction = Direction::Return;
        ret.id = "R200-RUECK".to_string();
        outbound.group_id = Some("g1".to_string());
        let trips = vec![outbound, ret];

        assert!(matches!(
            plan_split(&trips, &all_stops(&trips), &SplitStrategy::TripBalance),
            Err(PlanningError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_split_blocks_capacity_overflow() {
        let trips = vec![trip_with_stops(
            "R100",
            70,
            &[("07:00", "Essen", 40), ("08:00", "Köln", 30)],
        )];
        let stops = all_stops(&trips);
        let plan = plan_split(&trips, &stops, &SplitStrategy::StopBalance).unwrap();

        assert!(validate_split(&plan, &bus(49), &bus(49)).is_ok());
        assert!(matches!(
            validate_split(&plan, &bus(30), &bus(49)),
            Err(PlanningError::Validation(_))
        ));
    }
}
