//! OpenSky state-vector decoding.
//!
//! Each state is a fixed-position JSON array. Indices consumed:
//! 0 icao24, 1 callsign, 2 origin country, 5 longitude, 6 latitude,
//! 7 barometric altitude (m), 9 ground speed (m/s), 10 true track (deg),
//! 11 vertical rate (m/s). These indices and the phase threshold belong to
//! the OpenSky schema; another provider needs its own table.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aircraft::{Aircraft, FlightPhase};
use crate::geo::BoundingBox;

/// State-vector endpoint.
pub const STATES_URL: &str = "https://opensky-network.org/api/states/all";

/// Meters to feet.
pub const M_TO_FT: f64 = 3.28084;
/// Meters per second to knots.
pub const MS_TO_KTS: f64 = 1.94384;
/// Band around zero (m/s) classified as cruising. Strict on both sides.
pub const VERTICAL_RATE_THRESHOLD_MS: f64 = 2.0;

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;

/// Loosely-typed state row.
pub type StateRow = Vec<Value>;

/// `GET /states/all` response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatesResponse {
    pub time: i64,
    pub states: Option<Vec<StateRow>>,
}

fn get_num(row: &[Value], i: usize) -> Option<f64> {
    row.get(i).and_then(Value::as_f64).filter(|v| v.is_finite())
}

fn get_str(row: &[Value], i: usize) -> Option<&str> {
    row.get(i).and_then(Value::as_str)
}

/// Classify vertical movement. `None` is cruising.
pub fn phase_from_vertical_rate(vertical_rate_ms: Option<f64>) -> FlightPhase {
    match vertical_rate_ms {
        Some(v) if v > VERTICAL_RATE_THRESHOLD_MS => FlightPhase::Climbing,
        Some(v) if v < -VERTICAL_RATE_THRESHOLD_MS => FlightPhase::Descending,
        _ => FlightPhase::Cruising,
    }
}

/// Decode one row. `None` when it cannot be placed on a map or keyed.
pub fn decode_row(row: &[Value]) -> Option<Aircraft> {
    let latitude = get_num(row, IDX_LATITUDE)?;
    let longitude = get_num(row, IDX_LONGITUDE)?;

    let icao24 = get_str(row, IDX_ICAO24).filter(|s| !s.is_empty())?;

    let callsign = get_str(row, IDX_CALLSIGN)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown");
    let origin_country = get_str(row, IDX_ORIGIN_COUNTRY).unwrap_or("");

    let vertical_rate = get_num(row, IDX_VERTICAL_RATE);

    Some(Aircraft {
        icao24: icao24.to_string(),
        callsign: callsign.to_string(),
        origin_country: origin_country.to_string(),
        latitude,
        longitude,
        altitude_ft: get_num(row, IDX_BARO_ALTITUDE).unwrap_or(0.0) * M_TO_FT,
        velocity_kts: get_num(row, IDX_VELOCITY).unwrap_or(0.0) * MS_TO_KTS,
        heading_deg: get_num(row, IDX_TRUE_TRACK).unwrap_or(0.0),
        vertical_rate_ms: vertical_rate.unwrap_or(0.0),
        phase: phase_from_vertical_rate(vertical_rate),
    })
}

/// Decode every usable row, preserving order.
pub fn map_state_vectors(states: Option<&[StateRow]>) -> Vec<Aircraft> {
    match states {
        Some(rows) => rows.iter().filter_map(|r| decode_row(r)).collect(),
        None => Vec::new(),
    }
}

/// Query parameters for a bounding box: south/west/north/east.
pub fn query_params(bbox: &BoundingBox) -> [(&'static str, String); 4] {
    [
        ("lamin", bbox.south.to_string()),
        ("lomin", bbox.west.to_string()),
        ("lamax", bbox.north.to_string()),
        ("lomax", bbox.east.to_string()),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
