//! Group lifecycle: unplanned -> draft -> completed -> locked, with the
//! explicit backward edges and dissolution.
//!
//! The table here only rules on state pairs. Preconditions that need data
//! (bus assigned, no split pending) live in the planning service.

use crate::error::{PlanningError, Result};
use crate::types::{PlanningStatus, Trip};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Create,
    Complete,
    RevertToDraft,
    Lock,
    /// Needs operator confirmation upstream; the table itself allows it.
    Unlock,
    Dissolve,
}

impl LifecycleAction {
    pub const fn target(self) -> PlanningStatus {
        match self {
            Self::Create => PlanningStatus::Draft,
            Self::Complete => PlanningStatus::Completed,
            Self::RevertToDraft => PlanningStatus::Draft,
            Self::Lock => PlanningStatus::Locked,
            Self::Unlock => PlanningStatus::Completed,
            Self::Dissolve => PlanningStatus::Unplanned,
        }
    }
}

/// Checks one action against the current group status and returns the
/// resulting status.
pub fn validate_transition(
    current: PlanningStatus,
    action: LifecycleAction,
) -> Result<PlanningStatus> {
    let allowed = match action {
        LifecycleAction::Create => current == PlanningStatus::Unplanned,
        LifecycleAction::Complete => current == PlanningStatus::Draft,
        LifecycleAction::RevertToDraft => current == PlanningStatus::Completed,
        LifecycleAction::Lock => current == PlanningStatus::Completed,
        LifecycleAction::Unlock => current == PlanningStatus::Locked,
        LifecycleAction::Dissolve => current != PlanningStatus::Unplanned,
    };
    if allowed {
        Ok(action.target())
    } else {
        Err(PlanningError::Validation(format!(
            "Cannot apply {action:?} to a {} group",
            current.as_str()
        )))
    }
}

/// The shared status of a trip set. Mixed statuses mean a previous
/// transition was applied partially, which must never happen.
pub fn group_status(trips: &[Trip]) -> Result<PlanningStatus> {
    let Some(first) = trips.first() else {
        return Err(PlanningError::Validation(
            "Group has no member trips".to_string(),
        ));
    };
    for trip in trips {
        if trip.status != first.status {
            return Err(PlanningError::Validation(format!(
                "Group is in a mixed state: trip {} is {} while trip {} is {}",
                first.id,
                first.status.as_str(),
                trip.id,
                trip.status.as_str()
            )));
        }
    }
    Ok(first.status)
}
