//! Planning core for seasonal bus charters: pulls bookings from the
//! reservation system, groups trips onto buses, validates capacity,
//! splits oversized groups and rewires shared-hub departures.

pub mod booking_api;
pub mod capacity;
pub mod config;
pub mod dates;
pub mod db;
pub mod entities;
pub mod error;
pub mod export;
pub mod hub;
pub mod lifecycle;
pub mod manifest;
pub mod repositories;
pub mod service;
pub mod split;
pub mod types;
