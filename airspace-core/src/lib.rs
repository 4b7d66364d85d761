//! airspace-core: map bindings, traffic state and reference data for the
//! Airspace map demos.
//!
//! No async, no network I/O. The server crate fetches OpenSky data, drives
//! the polling schedule, and carries map commands to the browser; everything
//! it hands in or reads back is defined here.

pub mod aircraft;
pub mod airports;
pub mod config;
pub mod geo;
pub mod map;
pub mod opensky;
pub mod pages;
pub mod places;
pub mod stations;
pub mod traffic;
pub mod types;

// Re-export commonly used types at crate root
pub use aircraft::{Aircraft, FlightPhase};
pub use airports::{Airport, AirportIndex};
pub use geo::{compute_bounding_box, BoundingBox};
pub use traffic::{TrafficMonitor, TrafficSnapshot};
pub use types::*;
