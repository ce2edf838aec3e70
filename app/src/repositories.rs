//! Persistence layer: typed CRUD over the trips, bus_groups and buses
//! tables, plus the model/domain conversions.
//!
//! Write functions are generic over [`ConnectionTrait`] so the planning
//! service can run them inside one transaction.

use crate::entities::{bus_groups, buses, prelude::*, trips};
use crate::error::{PlanningError, Result};
use crate::types::{Bus, BusGroup, Direction, HubRole, PlanningStatus, Stop, Trip};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set,
};

// --- conversions ---

fn trip_from_model(model: trips::Model) -> Result<Trip> {
    let stops: Vec<Stop> = serde_json::from_str(&model.stops_json)
        .map_err(|e| PlanningError::Parse(format!("Corrupt stop list on trip {}: {e}", model.id)))?;
    Ok(Trip {
        id: model.id,
        direction: Direction::parse(&model.direction)?,
        reservation_code: model.reservation_code,
        product_code: model.product_code,
        route_name: model.route_name,
        date: model.date,
        departure_time: model.departure_time,
        contingent: model.contingent,
        passenger_count: model.passenger_count,
        status: PlanningStatus::parse(&model.status)?,
        group_id: model.group_id,
        stops,
    })
}

fn trip_to_active(trip: &Trip) -> Result<trips::ActiveModel> {
    let stops_json = serde_json::to_string(&trip.stops)
        .map_err(|e| PlanningError::Parse(format!("Cannot serialize stops: {e}")))?;
    Ok(trips::ActiveModel {
        id: Set(trip.id.clone()),
        direction: Set(trip.direction.as_str().to_string()),
        reservation_code: Set(trip.reservation_code.clone()),
        product_code: Set(trip.product_code.clone()),
        route_name: Set(trip.route_name.clone()),
        date: Set(trip.date.clone()),
        departure_time: Set(trip.departure_time.clone()),
        contingent: Set(trip.contingent),
        passenger_count: Set(trip.passenger_count),
        status: Set(trip.status.as_str().to_string()),
        group_id: Set(trip.group_id.clone()),
        stops_json: Set(stops_json),
        created_at: Set(Utc::now().naive_utc()),
    })
}

fn group_from_model(model: bus_groups::Model) -> Result<BusGroup> {
    let assigned_stop_keys: Vec<String> = serde_json::from_str(&model.assigned_stop_keys)
        .map_err(|e| {
            PlanningError::Parse(format!("Corrupt stop keys on group {}: {e}", model.id))
        })?;
    Ok(BusGroup {
        id: model.id,
        trip_number: model.trip_number,
        status: PlanningStatus::parse(&model.status)?,
        bus_id: model.bus_id,
        km_outbound: model.km_outbound,
        km_return: model.km_return,
        luggage: model.luggage,
        accommodation: model.accommodation,
        notes: model.notes,
        split_group_id: model.split_group_id,
        part_number: model.part_number,
        total_parts: model.total_parts,
        hub_id: model.hub_id,
        hub_role: HubRole::parse(&model.hub_role)?,
        hub_location: model.hub_location,
        assigned_stop_keys,
    })
}

fn group_to_active(group: &BusGroup) -> Result<bus_groups::ActiveModel> {
    let assigned_stop_keys = serde_json::to_string(&group.assigned_stop_keys)
        .map_err(|e| PlanningError::Parse(format!("Cannot serialize stop keys: {e}")))?;
    Ok(bus_groups::ActiveModel {
        id: Set(group.id.clone()),
        trip_number: Set(group.trip_number.clone()),
        status: Set(group.status.as_str().to_string()),
        bus_id: Set(group.bus_id.clone()),
        km_outbound: Set(group.km_outbound.clone()),
        km_return: Set(group.km_return.clone()),
        luggage: Set(group.luggage.clone()),
        accommodation: Set(group.accommodation.clone()),
        notes: Set(group.notes.clone()),
        split_group_id: Set(group.split_group_id.clone()),
        part_number: Set(group.part_number),
        total_parts: Set(group.total_parts),
        hub_id: Set(group.hub_id.clone()),
        hub_role: Set(group.hub_role.as_str().to_string()),
        hub_location: Set(group.hub_location.clone()),
        assigned_stop_keys: Set(assigned_stop_keys),
        created_at: Set(Utc::now().naive_utc()),
    })
}

fn bus_from_model(model: buses::Model) -> Bus {
    Bus {
        id: model.id,
        name: model.name,
        seat_count: model.seat_count,
        is_contractual: model.is_contractual,
    }
}

// --- trips ---

pub async fn get_all_trips(db: &impl ConnectionTrait) -> Result<Vec<Trip>> {
    Trips::find()
        .all(db)
        .await?
        .into_iter()
        .map(trip_from_model)
        .collect()
}

pub async fn get_trip(db: &impl ConnectionTrait, id: &str) -> Result<Option<Trip>> {
    Trips::find_by_id(id).one(db).await?.map(trip_from_model).transpose()
}

pub async fn get_trips_by_group(db: &impl ConnectionTrait, group_id: &str) -> Result<Vec<Trip>> {
    Trips::find()
        .filter(trips::Column::GroupId.eq(group_id))
        .all(db)
        .await?
        .into_iter()
        .map(trip_from_model)
        .collect()
}

/// Insert-or-update by trip id. The creation timestamp is written once on
/// insert and left alone on updates.
pub async fn save_trip(db: &impl ConnectionTrait, trip: &Trip) -> Result<()> {
    let mut active = trip_to_active(trip)?;
    if Trips::find_by_id(&trip.id).one(db).await?.is_some() {
        active.created_at = NotSet;
        active.update(db).await?;
    } else {
        active.insert(db).await?;
    }
    Ok(())
}

pub async fn delete_trip(db: &impl ConnectionTrait, id: &str) -> Result<()> {
    Trips::delete_by_id(id).exec(db).await?;
    Ok(())
}

// --- bus groups ---

pub async fn get_all_groups(db: &impl ConnectionTrait) -> Result<Vec<BusGroup>> {
    BusGroups::find()
        .all(db)
        .await?
        .into_iter()
        .map(group_from_model)
        .collect()
}

pub async fn get_group(db: &impl ConnectionTrait, id: &str) -> Result<Option<BusGroup>> {
    BusGroups::find_by_id(id)
        .one(db)
        .await?
        .map(group_from_model)
        .transpose()
}

pub async fn save_group(db: &impl ConnectionTrait, group: &BusGroup) -> Result<()> {
    let mut active = group_to_active(group)?;
    if BusGroups::find_by_id(&group.id).one(db).await?.is_some() {
        active.created_at = NotSet;
        active.update(db).await?;
    } else {
        active.insert(db).await?;
    }
    Ok(())
}

pub async fn delete_group(db: &impl ConnectionTrait, id: &str) -> Result<()> {
    BusGroups::delete_by_id(id).exec(db).await?;
    Ok(())
}

/// Next free zero-padded sequence label ("001", "002", ...). Letter
/// suffixes of split parts share the numeric stem and are skipped over.
pub async fn next_trip_number(db: &impl ConnectionTrait) -> Result<String> {
    let groups = BusGroups::find().all(db).await?;
    let max = groups
        .iter()
        .filter_map(|g| numeric_stem(&g.trip_number))
        .max()
        .unwrap_or(0);
    Ok(format!("{:03}", max + 1))
}

fn numeric_stem(trip_number: &str) -> Option<u32> {
    let digits: String = trip_number.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

// --- buses ---

pub async fn get_all_buses(db: &impl ConnectionTrait) -> Result<Vec<Bus>> {
    Ok(Buses::find()
        .all(db)
        .await?
        .into_iter()
        .map(bus_from_model)
        .collect())
}

pub async fn get_bus(db: &impl ConnectionTrait, id: &str) -> Result<Option<Bus>> {
    Ok(Buses::find_by_id(id).one(db).await?.map(bus_from_model))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};

    async fn setup_db() -> DatabaseConnection {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn sample_trip(id: &str, group_id: Option<&str>) -> Trip {
        Trip {
            id: id.to_string(),
            direction: Direction::Outbound,
            reservation_code: "R100".to_string(),
            product_code: "SKI".to_string(),
            route_name: "Sölden - Hotel Alpenhof".to_string(),
            date: "10.01.2026".to_string(),
            departure_time: "07:00".to_string(),
            contingent: 50,
            passenger_count: 30,
            status: if group_id.is_some() {
                PlanningStatus::Draft
            } else {
                PlanningStatus::Unplanned
            },
            group_id: group_id.map(String::from),
            stops: vec![Stop {
                reservation_code: "R100".to_string(),
                direction_tag: "Hinfahrt Zustieg".to_string(),
                time: "07:00".to_string(),
                location: "Essen".to_string(),
                passengers: 30,
            }],
        }
    }

    // === Trip persistence TESTS ===

    #[tokio::test]
    async fn test_trip_roundtrip_with_embedded_stops() {
        let db = setup_db().await;
        let trip = sample_trip("R100-HIN", None);

        save_trip(&db, &trip).await.unwrap();
        let loaded = get_trip(&db, "R100-HIN").await.unwrap().unwrap();
        assert_eq!(loaded, trip);

        let mut updated = trip.clone();
        updated.status = PlanningStatus::Draft;
        updated.group_id = Some("g1".to_string());
        updated.stops[0].passengers = 31;
        save_trip(&db, &updated).await.unwrap();

        let reloaded = get_trip(&db, "R100-HIN").await.unwrap().unwrap();
        assert_eq!(reloaded.stops[0].passengers, 31);
        assert_eq!(reloaded.group_id.as_deref(), Some("g1"));
        assert_eq!(get_all_trips(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let db = setup_db().await;
        let trip = sample_trip("R100-HIN", None);
        save_trip(&db, &trip).await.unwrap();
        let created_at = Trips::find_by_id("R100-HIN")
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .created_at;

        let mut updated = trip;
        updated.passenger_count = 31;
        save_trip(&db, &updated).await.unwrap();

        let model = Trips::find_by_id("R100-HIN").one(&db).await.unwrap().unwrap();
        assert_eq!(model.passenger_count, 31);
        assert_eq!(model.created_at, created_at);

        let group = BusGroup::new("g1".to_string(), "001".to_string());
        save_group(&db, &group).await.unwrap();
        let group_created_at = BusGroups::find_by_id("g1")
            .one(&db)
            .await
            .unwrap()
            .unwrap()
            .created_at;

        let mut renamed = group;
        renamed.notes = Some("Gepäckanhänger".to_string());
        save_group(&db, &renamed).await.unwrap();

        let group_model = BusGroups::find_by_id("g1").one(&db).await.unwrap().unwrap();
        assert_eq!(group_model.notes.as_deref(), Some("Gepäckanhänger"));
        assert_eq!(group_model.created_at, group_created_at);
    }

    #[tokio::test]
    async fn test_trips_by_group_and_delete() {
        let db = setup_db().await;
        save_trip(&db, &sample_trip("R100-HIN", Some("g1"))).await.unwrap();
        let mut other = sample_trip("R200-HIN", Some("g2"));
        other.reservation_code = "R200".to_string();
        save_trip(&db, &other).await.unwrap();

        let members = get_trips_by_group(&db, "g1").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, "R100-HIN");

        delete_trip(&db, "R100-HIN").await.unwrap();
        assert!(get_trip(&db, "R100-HIN").await.unwrap().is_none());
    }

    // === Group persistence TESTS ===

    #[tokio::test]
    async fn test_group_roundtrip_with_stop_keys() {
        let db = setup_db().await;
        let mut group = BusGroup::new("g1".to_string(), "007".to_string());
        group.bus_id = Some("marti".to_string());
        group.hub_role = HubRole::Collector;
        group.assigned_stop_keys = vec!["10.01.2026|07:00|Essen|HIN".to_string()];

        save_group(&db, &group).await.unwrap();
        let loaded = get_group(&db, "g1").await.unwrap().unwrap();
        assert_eq!(loaded, group);

        delete_group(&db, "g1").await.unwrap();
        assert!(get_group(&db, "g1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_next_trip_number_skips_split_suffixes() {
        let db = setup_db().await;
        assert_eq!(next_trip_number(&db).await.unwrap(), "001");

        for trip_number in ["001", "002a", "002b"] {
            let group = BusGroup::new(format!("g-{trip_number}"), trip_number.to_string());
            save_group(&db, &group).await.unwrap();
        }
        assert_eq!(next_trip_number(&db).await.unwrap(), "003");
    }

    // === Bus fleet TESTS ===

    #[tokio::test]
    async fn test_fleet_seeded_by_migration() {
        let db = setup_db().await;
        let buses = get_all_buses(&db).await.unwrap();
        assert_eq!(buses.len(), 11);
        assert_eq!(buses.iter().map(|b| b.seat_count).max(), Some(61));
        assert_eq!(buses.iter().map(|b| b.seat_count).min(), Some(49));
        assert!(buses.iter().any(|b| b.is_contractual));

        let hager = get_bus(&db, "hager").await.unwrap().unwrap();
        assert_eq!(hager.seat_count, 61);
    }
}
