//! Normalized aircraft records and their map representation.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Coarse classification of vertical movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlightPhase {
    Climbing,
    Cruising,
    Descending,
}

impl std::fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlightPhase::Climbing => write!(f, "Climbing"),
            FlightPhase::Cruising => write!(f, "Cruising"),
            FlightPhase::Descending => write!(f, "Descending"),
        }
    }
}

/// One aircraft from a single poll, in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub icao24: String,
    pub callsign: String,
    pub origin_country: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_ft: f64,
    pub velocity_kts: f64,
    pub heading_deg: f64,
    pub vertical_rate_ms: f64,
    pub phase: FlightPhase,
}

/// Point features carrying `icao24` and `headingDeg` (for `icon-rotate`).
pub fn aircraft_to_feature_collection(aircraft: &[Aircraft]) -> FeatureCollection {
    let features = aircraft
        .iter()
        .map(|a| {
            let properties = json!({
                "icao24": a.icao24,
                "callsign": a.callsign,
                "headingDeg": a.heading_deg,
            });
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![a.longitude, a.latitude]))),
                id: None,
                properties: properties.as_object().cloned(),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
pub(crate) fn sample(icao24: &str, lng: f64, lat: f64) -> Aircraft {
    Aircraft {
        icao24: icao24.into(),
        callsign: "TEST1".into(),
        origin_country: "United States".into(),
        latitude: lat,
        longitude: lng,
        altitude_ft: 10_000.0,
        velocity_kts: 250.0,
        heading_deg: 90.0,
        vertical_rate_ms: 0.0,
        phase: FlightPhase::Cruising,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
