//! Planning service: loads state, runs the pure engines and persists the
//! outcome. Every mutating operation runs in one transaction; hub commits
//! additionally re-read the rows afterwards.

use crate::booking_api::BookingClient;
use crate::capacity::{can_assign_bus, can_combine, needs_split};
use crate::error::{PlanningError, Result};
use crate::export::export_groups;
use crate::hub::{self, HubGroup, HubPlan};
use crate::lifecycle::{self, LifecycleAction};
use crate::manifest::passenger_anomalies;
use crate::repositories;
use crate::split::{plan_split, validate_split, SplitPlan, SplitStrategy, PART_SUFFIXES};
use crate::types::{Bus, BusGroup, Direction, PlanningStatus, Stop, Trip};
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of one booking sync pass.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub fetched: usize,
    pub inserted: usize,
    pub kept_planned: usize,
    pub anomalies: Vec<String>,
}

/// Operator-editable logistics fields of a group.
#[derive(Debug, Clone, Default)]
pub struct AssignmentUpdate {
    pub bus_id: Option<String>,
    pub km_outbound: Option<String>,
    pub km_return: Option<String>,
    pub luggage: Option<String>,
    pub accommodation: Option<String>,
    pub notes: Option<String>,
}

pub struct PlanningService {
    db: DatabaseConnection,
}

impl PlanningService {
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Pulls the booking window and replaces every unplanned trip. Trips
    /// already in a group survive the refresh untouched.
    pub async fn sync_bookings(
        &self,
        client: &BookingClient,
        date_from: &str,
        date_to: &str,
    ) -> Result<SyncReport> {
        let data = client.fetch_complete_data(date_from, date_to).await?;
        let mut report = SyncReport {
            fetched: data.trips.len(),
            ..SyncReport::default()
        };

        report.anomalies = passenger_anomalies(&data.trips);
        for anomaly in &report.anomalies {
            warn!("{anomaly}");
        }

        let txn = self.db.begin().await?;
        let existing = repositories::get_all_trips(&txn).await?;
        for trip in &existing {
            if trip.status == PlanningStatus::Unplanned {
                repositories::delete_trip(&txn, &trip.id).await?;
            }
        }
        let planned: Vec<&Trip> = existing
            .iter()
            .filter(|t| t.status != PlanningStatus::Unplanned)
            .collect();

        for trip in &data.trips {
            if planned.iter().any(|p| p.id == trip.id) {
                report.kept_planned += 1;
                continue;
            }
            repositories::save_trip(&txn, trip).await?;
            report.inserted += 1;
        }
        txn.commit().await?;

        info!(
            "Sync done: {} fetched, {} inserted, {} planned kept",
            report.fetched, report.inserted, report.kept_planned
        );
        Ok(report)
    }

    /// Groups unplanned trips into a new draft group after the combination
    /// rules pass. A long leg gap is noted on the group, not rejected.
    pub async fn create_group(&self, trip_ids: &[String]) -> Result<BusGroup> {
        let txn = self.db.begin().await?;

        let mut trips = Vec::with_capacity(trip_ids.len());
        for id in trip_ids {
            let trip = repositories::get_trip(&txn, id)
                .await?
                .ok_or_else(|| PlanningError::Validation(format!("Unknown trip {id}")))?;
            if trip.status != PlanningStatus::Unplanned {
                return Err(PlanningError::Validation(format!(
                    "Trip {id} is already planned"
                )));
            }
            trips.push(trip);
        }
        let outcome = can_combine(&trips)?;

        let mut group = BusGroup::new(
            Uuid::new_v4().to_string(),
            repositories::next_trip_number(&txn).await?,
        );
        if let Some(days) = outcome.standing_bus_days {
            group.notes = Some(format!("Standbus: {days} Tage vor Ort"));
        }
        repositories::save_group(&txn, &group).await?;

        for mut trip in trips {
            trip.group_id = Some(group.id.clone());
            trip.status = PlanningStatus::Draft;
            repositories::save_trip(&txn, &trip).await?;
        }
        txn.commit().await?;

        info!("Created group {} ({})", group.trip_number, group.id);
        Ok(group)
    }

    /// Updates bus choice and logistics fields. Locked groups are
    /// read-only.
    pub async fn save_assignment(
        &self,
        group_id: &str,
        update: AssignmentUpdate,
    ) -> Result<BusGroup> {
        let txn = self.db.begin().await?;
        let mut group = required_group(&txn, group_id).await?;
        if group.status == PlanningStatus::Locked {
            return Err(PlanningError::Validation(format!(
                "Group {} is locked",
                group.trip_number
            )));
        }
        if let Some(bus_id) = &update.bus_id {
            if repositories::get_bus(&txn, bus_id).await?.is_none() {
                return Err(PlanningError::Validation(format!("Unknown bus {bus_id}")));
            }
        }

        group.bus_id = update.bus_id.or(group.bus_id);
        group.km_outbound = update.km_outbound.or(group.km_outbound);
        group.km_return = update.km_return.or(group.km_return);
        group.luggage = update.luggage.or(group.luggage);
        group.accommodation = update.accommodation.or(group.accommodation);
        group.notes = update.notes.or(group.notes);

        repositories::save_group(&txn, &group).await?;
        txn.commit().await?;
        Ok(group)
    }

    /// Draft -> completed. Requires a bus that fits; an oversized group is
    /// redirected into the split flow instead.
    pub async fn complete_group(&self, group_id: &str) -> Result<BusGroup> {
        let txn = self.db.begin().await?;
        let mut group = required_group(&txn, group_id).await?;
        let mut trips = repositories::get_trips_by_group(&txn, group_id).await?;
        let current = consistent_status(&group, &trips)?;
        let next = lifecycle::validate_transition(current, LifecycleAction::Complete)?;

        let Some(bus_id) = group.bus_id.clone() else {
            return Err(PlanningError::Validation(
                "Select a bus before completing the group".to_string(),
            ));
        };
        let bus = repositories::get_bus(&txn, &bus_id)
            .await?
            .ok_or_else(|| PlanningError::Validation(format!("Unknown bus {bus_id}")))?;

        let stops = collect_stops(&trips);
        let fleet = repositories::get_all_buses(&txn).await?;
        if needs_split(&trips, &stops, &fleet) {
            return Err(PlanningError::Validation(format!(
                "Group {} exceeds every bus in the fleet and must be split first",
                group.trip_number
            )));
        }
        if !can_assign_bus(&trips, &stops, &bus) {
            return Err(PlanningError::Validation(format!(
                "Bus {} is too small for group {}",
                bus.name, group.trip_number
            )));
        }

        group.status = next;
        repositories::save_group(&txn, &group).await?;
        for trip in &mut trips {
            trip.status = next;
            repositories::save_trip(&txn, trip).await?;
        }
        txn.commit().await?;

        info!("Completed group {}", group.trip_number);
        Ok(group)
    }

    pub async fn revert_to_draft(&self, group_id: &str) -> Result<BusGroup> {
        self.apply_transition(group_id, LifecycleAction::RevertToDraft)
            .await
    }

    pub async fn lock_group(&self, group_id: &str) -> Result<BusGroup> {
        self.apply_transition(group_id, LifecycleAction::Lock).await
    }

    /// Confirmation is the caller's job; the transition itself is plain.
    pub async fn unlock_group(&self, group_id: &str) -> Result<BusGroup> {
        self.apply_transition(group_id, LifecycleAction::Unlock)
            .await
    }

    /// Returns every member trip to the unplanned pool and deletes the
    /// group record.
    pub async fn dissolve_group(&self, group_id: &str) -> Result<()> {
        let txn = self.db.begin().await?;
        let group = required_group(&txn, group_id).await?;
        let mut trips = repositories::get_trips_by_group(&txn, group_id).await?;
        let current = consistent_status(&group, &trips)?;
        lifecycle::validate_transition(current, LifecycleAction::Dissolve)?;

        for trip in &mut trips {
            trip.status = PlanningStatus::Unplanned;
            trip.group_id = None;
            repositories::save_trip(&txn, trip).await?;
        }
        repositories::delete_group(&txn, group_id).await?;
        txn.commit().await?;

        info!("Dissolved group {}", group.trip_number);
        Ok(())
    }

    /// Splits one group into two sibling draft groups. Trips whose stops
    /// land in both parts are forked into per-part trip rows; the original
    /// group is deleted.
    pub async fn commit_split(
        &self,
        group_id: &str,
        strategy: &SplitStrategy,
        target_buses: (Option<String>, Option<String>),
    ) -> Result<(BusGroup, BusGroup)> {
        let txn = self.db.begin().await?;
        let group = required_group(&txn, group_id).await?;
        let trips = repositories::get_trips_by_group(&txn, group_id).await?;
        let current = consistent_status(&group, &trips)?;
        if current == PlanningStatus::Locked {
            return Err(PlanningError::Validation(format!(
                "Group {} is locked",
                group.trip_number
            )));
        }
        let stops = collect_stops(&trips);

        // Legs are planned per direction and the parts merged pairwise, so
        // a round-trip group splits into two round-trip groups.
        let mut plan: Option<SplitPlan> = None;
        for direction in [Direction::Outbound, Direction::Return] {
            let leg: Vec<Trip> = trips
                .iter()
                .filter(|t| t.direction == direction)
                .cloned()
                .collect();
            if leg.is_empty() {
                continue;
            }
            let leg_plan = plan_split(&leg, &stops, strategy)?;
            plan = Some(match plan {
                None => leg_plan,
                Some(mut merged) => {
                    for (part, leg_part) in merged.parts.iter_mut().zip(leg_plan.parts) {
                        part.passengers += leg_part.passengers;
                        part.shares.extend(leg_part.shares);
                        part.assigned_stop_keys.extend(leg_part.assigned_stop_keys);
                    }
                    merged
                }
            });
        }
        let plan = plan.ok_or_else(|| {
            PlanningError::Validation("Cannot split an empty group".to_string())
        })?;

        let buses = resolve_target_buses(&txn, &target_buses).await?;
        if let (Some(first), Some(second)) = (&buses.0, &buses.1) {
            validate_split(&plan, first, second)?;
        }

        let split_group_id = Uuid::new_v4().to_string();
        let stem = group.trip_number.clone();
        let mut new_groups = Vec::with_capacity(2);
        for (index, part) in plan.parts.iter().enumerate() {
            let mut new_group = BusGroup::new(
                Uuid::new_v4().to_string(),
                format!("{stem}{}", PART_SUFFIXES[index]),
            );
            new_group.bus_id = if index == 0 {
                target_buses.0.clone()
            } else {
                target_buses.1.clone()
            };
            new_group.km_outbound = group.km_outbound.clone();
            new_group.km_return = group.km_return.clone();
            new_group.luggage = group.luggage.clone();
            new_group.accommodation = group.accommodation.clone();
            new_group.notes = group.notes.clone();
            new_group.split_group_id = Some(split_group_id.clone());
            new_group.part_number = Some(i32::try_from(index).unwrap_or(0) + 1);
            new_group.total_parts = Some(2);
            new_group.assigned_stop_keys = part.assigned_stop_keys.clone();
            repositories::save_group(&txn, &new_group).await?;
            new_groups.push(new_group);
        }

        for trip in &trips {
            distribute_trip(&txn, trip, &plan, &new_groups).await?;
        }
        repositories::delete_group(&txn, group_id).await?;
        txn.commit().await?;

        info!(
            "Split group {} into {} and {}",
            group.trip_number, new_groups[0].trip_number, new_groups[1].trip_number
        );
        let mut iter = new_groups.into_iter();
        match (iter.next(), iter.next()) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(PlanningError::Validation(
                "Split produced fewer than two groups".to_string(),
            )),
        }
    }

    /// Planned groups sharing the given group's outbound date, as hub
    /// wizard input. The group itself is always included.
    pub async fn hub_participants(&self, group_id: &str) -> Result<Vec<HubGroup>> {
        let own_trips = repositories::get_trips_by_group(&self.db, group_id).await?;
        let own_date = own_trips
            .iter()
            .find(|t| t.direction == Direction::Outbound)
            .map(|t| t.date.clone())
            .ok_or_else(|| {
                PlanningError::Validation(format!("Group {group_id} has no outbound leg"))
            })?;

        let mut participants = Vec::new();
        for group in repositories::get_all_groups(&self.db).await? {
            if group.status == PlanningStatus::Locked {
                continue;
            }
            let trips = repositories::get_trips_by_group(&self.db, &group.id).await?;
            let same_date = trips
                .iter()
                .any(|t| t.direction == Direction::Outbound && t.date == own_date);
            if same_date {
                participants.push(HubGroup {
                    group_id: group.id,
                    trips,
                });
            }
        }
        Ok(participants)
    }

    /// Plans and persists a hub transfer in one transaction, then re-reads
    /// every touched trip to confirm the write.
    pub async fn commit_hub_transfer(
        &self,
        group_ids: &[String],
        hub_location: &str,
        collector_group_id: &str,
    ) -> Result<HubPlan> {
        let txn = self.db.begin().await?;

        let mut groups = Vec::with_capacity(group_ids.len());
        for id in group_ids {
            let group = required_group(&txn, id).await?;
            if group.status == PlanningStatus::Locked {
                return Err(PlanningError::Validation(format!(
                    "Group {} is locked",
                    group.trip_number
                )));
            }
            let trips = repositories::get_trips_by_group(&txn, id).await?;
            groups.push(HubGroup {
                group_id: group.id,
                trips,
            });
        }

        let plan = hub::plan_hub_transfer(&groups, hub_location, collector_group_id)?;

        for rewrite in &plan.rewrites {
            let mut group = required_group(&txn, &rewrite.group_id).await?;
            group.hub_id = Some(plan.hub_id.clone());
            group.hub_role = rewrite.role;
            group.hub_location = Some(plan.hub_location.clone());
            repositories::save_group(&txn, &group).await?;

            for trip_rewrite in &rewrite.trips {
                let mut trip = repositories::get_trip(&txn, &trip_rewrite.trip_id)
                    .await?
                    .ok_or_else(|| {
                        PlanningError::Validation(format!(
                            "Trip {} disappeared during hub commit",
                            trip_rewrite.trip_id
                        ))
                    })?;
                let kept: Vec<Stop> = trip
                    .stops
                    .iter()
                    .filter(|s| !trip.direction.matches_tag(&s.direction_tag))
                    .cloned()
                    .collect();
                trip.stops = trip_rewrite.stops.clone();
                trip.stops.extend(kept);
                trip.passenger_count = trip_rewrite.total_passengers;
                repositories::save_trip(&txn, &trip).await?;
            }
        }
        txn.commit().await?;

        // Read-back verification against partial writes.
        for rewrite in &plan.rewrites {
            for trip_rewrite in &rewrite.trips {
                let trip = repositories::get_trip(&self.db, &trip_rewrite.trip_id)
                    .await?
                    .ok_or_else(|| {
                        PlanningError::Validation(format!(
                            "Trip {} missing after hub commit",
                            trip_rewrite.trip_id
                        ))
                    })?;
                let matching: Vec<Stop> = trip
                    .stops
                    .iter()
                    .filter(|s| trip.direction.matches_tag(&s.direction_tag))
                    .cloned()
                    .collect();
                hub::verify_rewrite(trip_rewrite, &matching)?;
            }
        }

        info!(
            "Hub transfer {} at {} committed for {} groups",
            plan.hub_id,
            plan.hub_location,
            plan.rewrites.len()
        );
        Ok(plan)
    }

    /// CSV for every completed or locked group.
    pub async fn export_completed(&self) -> Result<String> {
        let mut rows = Vec::new();
        for group in repositories::get_all_groups(&self.db).await? {
            let trips = repositories::get_trips_by_group(&self.db, &group.id).await?;
            let bus = match &group.bus_id {
                Some(id) => repositories::get_bus(&self.db, id).await?,
                None => None,
            };
            rows.push((group, trips, bus));
        }
        export_groups(&rows)
    }

    async fn apply_transition(
        &self,
        group_id: &str,
        action: LifecycleAction,
    ) -> Result<BusGroup> {
        let txn = self.db.begin().await?;
        let mut group = required_group(&txn, group_id).await?;
        let mut trips = repositories::get_trips_by_group(&txn, group_id).await?;
        let current = consistent_status(&group, &trips)?;
        let next = lifecycle::validate_transition(current, action)?;

        group.status = next;
        repositories::save_group(&txn, &group).await?;
        for trip in &mut trips {
            trip.status = next;
            repositories::save_trip(&txn, trip).await?;
        }
        txn.commit().await?;
        Ok(group)
    }
}

async fn resolve_target_buses(
    db: &impl ConnectionTrait,
    target_buses: &(Option<String>, Option<String>),
) -> Result<(Option<Bus>, Option<Bus>)> {
    let mut resolved = (None, None);
    if let Some(id) = &target_buses.0 {
        resolved.0 = Some(
            repositories::get_bus(db, id)
                .await?
                .ok_or_else(|| PlanningError::Validation(format!("Unknown bus {id}")))?,
        );
    }
    if let Some(id) = &target_buses.1 {
        resolved.1 = Some(
            repositories::get_bus(db, id)
                .await?
                .ok_or_else(|| PlanningError::Validation(format!("Unknown bus {id}")))?,
        );
    }
    Ok(resolved)
}

/// Moves one original trip into the split parts: untouched when a
/// single part owns it, forked into "-a"/"-b" rows when both do.
async fn distribute_trip(
    db: &impl ConnectionTrait,
    trip: &Trip,
    plan: &SplitPlan,
    new_groups: &[BusGroup],
) -> Result<()> {
    let shares: Vec<(usize, &crate::split::TripShare)> = plan
        .parts
        .iter()
        .enumerate()
        .flat_map(|(index, part)| {
            part.shares
                .iter()
                .filter(|s| s.trip_id == trip.id)
                .map(move |s| (index, s))
        })
        .collect();

    match shares.as_slice() {
        // No stop detail anywhere: the whole trip rides with part one.
        [] => {
            let mut moved = trip.clone();
            moved.group_id = Some(new_groups[0].id.clone());
            moved.status = PlanningStatus::Draft;
            repositories::save_trip(db, &moved).await
        }
        [(index, share)] => {
            let mut moved = trip.clone();
            moved.group_id = Some(new_groups[*index].id.clone());
            moved.status = PlanningStatus::Draft;
            moved.passenger_count = share.passengers;
            repositories::save_trip(db, &moved).await
        }
        parts => {
            for (index, share) in parts {
                let mut fork = trip.clone();
                fork.id = format!("{}-{}", trip.id, PART_SUFFIXES[*index]);
                fork.group_id = Some(new_groups[*index].id.clone());
                fork.status = PlanningStatus::Draft;
                fork.passenger_count = share.passengers;
                fork.stops = trip
                    .stops
                    .iter()
                    .filter(|s| {
                        !trip.direction.matches_tag(&s.direction_tag)
                            || share.stop_keys.contains(&crate::manifest::stop_key(trip, s))
                    })
                    .cloned()
                    .collect();
                repositories::save_trip(db, &fork).await?;
            }
            repositories::delete_trip(db, &trip.id).await
        }
    }
}

async fn required_group(db: &impl ConnectionTrait, group_id: &str) -> Result<BusGroup> {
    repositories::get_group(db, group_id)
        .await?
        .ok_or_else(|| PlanningError::Validation(format!("Unknown group {group_id}")))
}

/// Group row and member trips must agree on one status.
fn consistent_status(group: &BusGroup, trips: &[Trip]) -> Result<PlanningStatus> {
    let status = lifecycle::group_status(trips)?;
    if status != group.status {
        return Err(PlanningError::Validation(format!(
            "Group {} row says {} but its trips say {}",
            group.trip_number,
            group.status.as_str(),
            status.as_str()
        )));
    }
    Ok(status)
}

fn collect_stops(trips: &[Trip]) -> Vec<Stop> {
    trips.iter().flat_map(|t| t.stops.clone()).collect()
}
