//! NYC subway stations and route styling.

use geojson::{FeatureCollection, Value as GeoValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::LngLat;

/// MTA route colors keyed by `rt_symbol`.
pub const ROUTE_COLORS: &[(&str, &str)] = &[
    ("1", "#ee352e"),
    ("4", "#00933c"),
    ("7", "#b933ad"),
    ("A", "#0039a6"),
    ("SI", "#0039a6"),
    ("B", "#ff6319"),
    ("G", "#6cbe45"),
    ("J", "#996633"),
    ("L", "#a7a9ac"),
    ("N", "#fccc0a"),
];

pub const DEFAULT_ROUTE_COLOR: &str = "#808080";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    pub id: i64,
    pub name: String,
    pub line: String,
    pub coordinates: LngLat,
}

pub fn route_color(rt_symbol: &str) -> &'static str {
    ROUTE_COLORS
        .iter()
        .find(|(symbol, _)| *symbol == rt_symbol)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_ROUTE_COLOR)
}

/// `["match", ["get", "rt_symbol"], k1, c1, ..., default]`
pub fn line_color_expression() -> Value {
    let mut expr = vec![json!("match"), json!(["get", "rt_symbol"])];
    for (symbol, color) in ROUTE_COLORS {
        expr.push(json!(symbol));
        expr.push(json!(color));
    }
    expr.push(json!(DEFAULT_ROUTE_COLOR));
    Value::Array(expr)
}

/// A `cartodb_id` given as a number or a numeric string.
pub fn station_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn property_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Extract stations from point features. Features that are not points or
/// lack a numeric `cartodb_id` are skipped.
pub fn parse_stations(fc: &FeatureCollection) -> Vec<Station> {
    fc.features
        .iter()
        .filter_map(|f| {
            let GeoValue::Point(coords) = &f.geometry.as_ref()?.value else {
                return None;
            };
            let (&lng, &lat) = (coords.first()?, coords.get(1)?);
            let props = f.properties.as_ref();
            let id = station_id(props.and_then(|p| p.get("cartodb_id")))?;
            Some(Station {
                id,
                name: property_text(props.and_then(|p| p.get("name"))),
                line: property_text(props.and_then(|p| p.get("line"))),
                coordinates: LngLat::new(lng, lat),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
