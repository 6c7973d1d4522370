//! Test fixtures for yard-routing.
//!
//! Provides:
//! - Named points in and around the Keasby/Edison yard
//! - Canned OSRM route responses and in-memory transports
//! - Test logging via `init_tracing`

#![allow(dead_code)]

pub mod osrm_responses;
pub mod yard_locations;

pub use osrm_responses::*;
pub use yard_locations::*;

/// Route `tracing` output through the test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
