use crate::error::{PlanningError, Result};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_PLACE: &str = "Unbekannt";

/// One leg of a round trip. The id suffix and the direction tag on stop
/// rows both derive from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(rename = "hin")]
    Outbound,
    #[serde(rename = "rueck")]
    Return,
}

impl Direction {
    pub const fn id_suffix(self) -> &'static str {
        match self {
            Self::Outbound => "HIN",
            Self::Return => "RUECK",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Outbound => "Hinfahrt",
            Self::Return => "Rückfahrt",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outbound => "hin",
            Self::Return => "rueck",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "hin" => Ok(Self::Outbound),
            "rueck" => Ok(Self::Return),
            other => Err(PlanningError::Parse(format!("Unknown direction: {other}"))),
        }
    }

    /// Matches the free-text leg tag on stop rows ("Hinfahrt Zustieg" etc.).
    pub fn matches_tag(self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        match self {
            Self::Outbound => tag.contains("hinfahrt"),
            Self::Return => tag.contains("rückfahrt") || tag.contains("rueckfahrt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanningStatus {
    Unplanned,
    Draft,
    Completed,
    Locked,
}

impl PlanningStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unplanned => "unplanned",
            Self::Draft => "draft",
            Self::Completed => "completed",
            Self::Locked => "locked",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "unplanned" => Ok(Self::Unplanned),
            "draft" => Ok(Self::Draft),
            "completed" => Ok(Self::Completed),
            "locked" => Ok(Self::Locked),
            other => Err(PlanningError::Parse(format!(
                "Unknown planning status: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubRole {
    None,
    Collector,
    Outgoing,
}

impl HubRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Collector => "collector",
            Self::Outgoing => "outgoing",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::None),
            "collector" => Ok(Self::Collector),
            "outgoing" => Ok(Self::Outgoing),
            other => Err(PlanningError::Parse(format!("Unknown hub role: {other}"))),
        }
    }
}

/// One boarding/alighting event, owned by a reservation code and leg.
/// Persisted embedded in the trip row, not as its own table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub reservation_code: String,
    pub direction_tag: String,
    /// "HH:MM", may be empty when the source has no time.
    pub time: String,
    pub location: String,
    pub passengers: i32,
}

/// One directional leg of one reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    /// `"<reservation code>-HIN"` or `"<reservation code>-RUECK"`, with a
    /// part suffix after a split.
    pub id: String,
    pub direction: Direction,
    pub reservation_code: String,
    pub product_code: String,
    /// Free text, "Destination - Venue" format.
    pub route_name: String,
    /// "DD.MM.YYYY".
    pub date: String,
    /// "HH:MM", may be empty.
    pub departure_time: String,
    pub contingent: i32,
    pub passenger_count: i32,
    pub status: PlanningStatus,
    pub group_id: Option<String>,
    pub stops: Vec<Stop>,
}

impl Trip {
    pub fn destination(&self) -> String {
        route_destination(&self.route_name)
    }

    /// Ungrouped trips must be unplanned and grouped trips must not be.
    pub fn validate(&self) -> Result<()> {
        match (&self.group_id, self.status) {
            (None, PlanningStatus::Unplanned) => Ok(()),
            (Some(_), status) if status != PlanningStatus::Unplanned => Ok(()),
            (None, status) => Err(PlanningError::Validation(format!(
                "Trip {} has status {} but no group",
                self.id,
                status.as_str()
            ))),
            (Some(_), _) => Err(PlanningError::Validation(format!(
                "Trip {} is grouped but still unplanned",
                self.id
            ))),
        }
    }
}

/// Capacity reference, externally supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    pub id: String,
    pub name: String,
    pub seat_count: i32,
    pub is_contractual: bool,
}

/// The unit of planning: one or more trips moving together on one bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusGroup {
    pub id: String,
    /// Human-facing sequence label, zero-padded, letter suffix for split
    /// parts ("007a").
    pub trip_number: String,
    pub status: PlanningStatus,
    pub bus_id: Option<String>,
    pub km_outbound: Option<String>,
    pub km_return: Option<String>,
    pub luggage: Option<String>,
    pub accommodation: Option<String>,
    pub notes: Option<String>,
    pub split_group_id: Option<String>,
    pub part_number: Option<i32>,
    pub total_parts: Option<i32>,
    pub hub_id: Option<String>,
    pub hub_role: HubRole,
    pub hub_location: Option<String>,
    /// Stop keys this group owns after a stop-level split.
    pub assigned_stop_keys: Vec<String>,
}

impl BusGroup {
    pub fn new(id: String, trip_number: String) -> Self {
        Self {
            id,
            trip_number,
            status: PlanningStatus::Draft,
            bus_id: None,
            km_outbound: None,
            km_return: None,
            luggage: None,
            accommodation: None,
            notes: None,
            split_group_id: None,
            part_number: None,
            total_parts: None,
            hub_id: None,
            hub_role: HubRole::None,
            hub_location: None,
            assigned_stop_keys: Vec::new(),
        }
    }
}

/// First hyphen-delimited token of a "Destination - Venue" route name.
/// Falls back to a placeholder when the name is empty.
pub fn route_destination(route_name: &str) -> String {
    route_name
        .split(" - ")
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_PLACE)
        .to_string()
}

/// Last hyphen-delimited token; the boarding region on return legs.
pub fn route_origin(route_name: &str) -> String {
    route_name
        .rsplit(" - ")
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_PLACE)
        .to_string()
}
