//! Shared types and the error enum for airspace-core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors produced by airspace-core.
#[derive(Debug, Error)]
pub enum AirspaceError {
    #[error("MAPBOX_TOKEN is not set")]
    MissingToken,
    #[error("map error: {0}")]
    Map(String),
    #[error("unknown airport: {0}")]
    UnknownAirport(String),
    #[error("unsupported search radius: {0} mi")]
    InvalidRadius(u32),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AirspaceError>;

// ---------------------------------------------------------------------------
// Coordinates
// ---------------------------------------------------------------------------

/// Longitude/latitude pair in degrees. Library-agnostic copy of whatever
/// the renderer hands back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub const fn new(lng: f64, lat: f64) -> Self {
        LngLat { lng, lat }
    }

    /// `[lng, lat]`, the GeoJSON position order.
    pub fn position(&self) -> Vec<f64> {
        vec![self.lng, self.lat]
    }

    /// Both components are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.lng.is_finite() && self.lat.is_finite()
    }
}

impl std::fmt::Display for LngLat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lng, self.lat)
    }
}

// ---------------------------------------------------------------------------
// Time formatting
// ---------------------------------------------------------------------------

/// Format unix seconds as a UTC wall-clock time `HH:MM:SS`.
pub fn format_clock(unix_secs: i64) -> String {
    let secs = unix_secs.rem_euclid(86_400);
    format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
