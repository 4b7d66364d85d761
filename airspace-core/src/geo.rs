//! Search-area geometry: bounding boxes around a point and their GeoJSON form.

use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::{Deserialize, Serialize};

use crate::types::LngLat;

/// Statute miles per degree of latitude.
pub const MILES_PER_DEGREE_LAT: f64 = 69.0;

/// Selectable search radii, in statute miles.
pub const RADIUS_MILES_VALUES: [u32; 3] = [10, 25, 50];

/// Radius used until the user picks another one.
pub const DEFAULT_RADIUS_MILES: u32 = 25;

/// Axis-aligned rectangle in degrees, ordered `[west, south, east, north]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        BoundingBox {
            west,
            south,
            east,
            north,
        }
    }

    /// Box around `center` reaching `radius_miles` in each direction.
    ///
    /// Latitude uses a flat 69 mi/deg; longitude is widened by `1/cos(lat)`.
    pub fn around(center: LngLat, radius_miles: f64) -> Self {
        let lat_delta = radius_miles / MILES_PER_DEGREE_LAT;
        let lng_degrees_per_mile = 1.0 / (MILES_PER_DEGREE_LAT * center.lat.to_radians().cos());
        let lng_delta = radius_miles * lng_degrees_per_mile;

        BoundingBox {
            west: center.lng - lng_delta,
            south: center.lat - lat_delta,
            east: center.lng + lng_delta,
            north: center.lat + lat_delta,
        }
    }

    pub fn center(&self) -> LngLat {
        LngLat::new((self.west + self.east) / 2.0, (self.south + self.north) / 2.0)
    }

    pub fn contains(&self, point: LngLat) -> bool {
        point.lng >= self.west
            && point.lng <= self.east
            && point.lat >= self.south
            && point.lat <= self.north
    }

    /// `[[west, south], [east, north]]`, the renderer's bounds shape.
    pub fn to_lng_lat_bounds(&self) -> [[f64; 2]; 2] {
        [[self.west, self.south], [self.east, self.north]]
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// One closed polygon ring, for a fill layer.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        let ring = vec![
            vec![self.west, self.south],
            vec![self.east, self.south],
            vec![self.east, self.north],
            vec![self.west, self.north],
            vec![self.west, self.south],
        ];
        let feature = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: Some(serde_json::Map::new()),
            foreign_members: None,
        };
        FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }
    }
}

/// Shorthand for [`BoundingBox::around`].
pub fn compute_bounding_box(center: LngLat, radius_miles: f64) -> BoundingBox {
    BoundingBox::around(center, radius_miles)
}

/// An empty feature collection, used to blank a source.
pub fn empty_collection() -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: Vec::new(),
        foreign_members: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
