//! Capacity and grouping rules: which trips may share a bus, and whether
//! a group still fits the fleet.

use crate::dates::days_between;
use crate::error::{PlanningError, Result};
use crate::manifest::direction_total;
use crate::types::{Bus, Direction, Stop, Trip};

/// Same-direction legs may span at most one day (a 22:00 departure
/// crossing midnight).
const MAX_SAME_DIRECTION_SPAN_DAYS: i64 = 1;
/// Outbound and return legs may be at most two weeks apart.
const MAX_LEG_GAP_DAYS: i64 = 14;
/// Beyond this gap the bus idles on-site ("Standbus") - advisory only.
const STANDING_BUS_THRESHOLD_DAYS: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineOutcome {
    /// Days the bus would wait on-site when the leg gap exceeds the
    /// standing-bus threshold.
    pub standing_bus_days: Option<i64>,
}

/// Decides whether a set of trips may form one group. Violations are
/// `Combination` errors; a large-but-legal leg gap comes back as a
/// standing-bus advisory.
pub fn can_combine(trips: &[Trip]) -> Result<CombineOutcome> {
    if trips.is_empty() {
        return Err(PlanningError::Validation(
            "At least one trip is required to form a group".to_string(),
        ));
    }

    let earliest_outbound = direction_span(trips, Direction::Outbound)?;
    let earliest_return = direction_span(trips, Direction::Return)?;

    let mut standing_bus_days = None;
    if let (Some(outbound), Some(ret)) = (earliest_outbound, earliest_return) {
        let gap = days_between(&outbound, &ret);
        if gap < 0 {
            return Err(PlanningError::Combination(format!(
                "Return leg ({ret}) departs before outbound leg ({outbound})"
            )));
        }
        if gap > MAX_LEG_GAP_DAYS {
            return Err(PlanningError::Combination(format!(
                "Gap of {gap} days between outbound and return exceeds {MAX_LEG_GAP_DAYS} days"
            )));
        }
        if gap > STANDING_BUS_THRESHOLD_DAYS {
            standing_bus_days = Some(gap);
        }
    }

    Ok(CombineOutcome { standing_bus_days })
}

/// Validates the date span of one direction and returns its earliest date.
fn direction_span(trips: &[Trip], direction: Direction) -> Result<Option<String>> {
    let dates: Vec<&str> = trips
        .iter()
        .filter(|t| t.direction == direction)
        .map(|t| t.date.as_str())
        .collect();
    let Some(&earliest) = dates
        .iter()
        .min_by_key(|d| crate::dates::parse_german_date(d))
    else {
        return Ok(None);
    };
    let Some(&latest) = dates
        .iter()
        .max_by_key(|d| crate::dates::parse_german_date(d))
    else {
        return Ok(None);
    };
    if days_between(earliest, latest) > MAX_SAME_DIRECTION_SPAN_DAYS {
        return Err(PlanningError::Combination(format!(
            "{} legs span from {earliest} to {latest}; more than one day apart",
            direction.label()
        )));
    }
    Ok(Some(earliest.to_string()))
}

pub fn max_fleet_seats(buses: &[Bus]) -> i32 {
    buses.iter().map(|b| b.seat_count).max().unwrap_or(0)
}

/// True when either direction's manifest total exceeds every bus in the
/// fleet, i.e. the group cannot be completed without a split.
pub fn needs_split(trips: &[Trip], stops: &[Stop], buses: &[Bus]) -> bool {
    let max_seats = max_fleet_seats(buses);
    [Direction::Outbound, Direction::Return]
        .into_iter()
        .any(|direction| direction_total(trips, stops, direction) > max_seats)
}

/// A bus must fit each direction on its own, not just the combined total.
pub fn can_assign_bus(trips: &[Trip], stops: &[Stop], bus: &Bus) -> bool {
    [Direction::Outbound, Direction::Return]
        .into_iter()
        .all(|direction| direction_total(trips, stops, direction) <= bus.seat_count)
}
