//! Server library module.
//!
//! Exposes the sync loop so the binary and the integration tests share
//! one implementation.

pub mod sync;
