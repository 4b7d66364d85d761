//! The renderer seam.
//!
//! [`MapWidget`] is the subset of a Mapbox GL style map the hooks use. A
//! real renderer lives on the other side of this trait; [`HeadlessMap`]
//! implements it in memory and records what it was told to do.
//!
//! [`HeadlessMap`]: super::HeadlessMap

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::camera::{FitBoundsOptions, FlyToOptions};
use super::control::{ControlPosition, MapControl};
use super::event::Listener;
use super::layer::LayerSpec;
use super::marker::MarkerSpec;
use crate::types::{LngLat, Result};

macro_rules! handle_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);
    };
}

handle_id!(
    /// Handle returned by [`MapWidget::on`].
    ListenerId
);
handle_id!(
    /// Handle returned by [`MapWidget::add_control`].
    ControlId
);
handle_id!(
    /// Handle returned by [`MapWidget::add_marker`].
    MarkerId
);

/// Source definitions understood by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceSpec {
    Geojson {
        data: FeatureCollection,
        #[serde(flatten)]
        cluster: Option<Cluster>,
    },
    RasterDem {
        url: String,
        #[serde(rename = "tileSize")]
        tile_size: u32,
        maxzoom: u8,
    },
}

impl SourceSpec {
    pub fn empty_geojson() -> Self {
        SourceSpec::Geojson {
            data: crate::geo::empty_collection(),
            cluster: None,
        }
    }

    pub fn clustered_geojson(cluster: Cluster) -> Self {
        SourceSpec::Geojson {
            data: crate::geo::empty_collection(),
            cluster: Some(cluster),
        }
    }
}

/// Point clustering on a GeoJSON source. Flattened into the source object
/// as `cluster: true`, `clusterRadius` and `clusterMaxZoom`; clustered
/// features carry `point_count` and `point_count_abbreviated`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "ClusterWire", from = "ClusterWire")]
pub struct Cluster {
    pub radius: u32,
    pub max_zoom: u8,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClusterWire {
    cluster: bool,
    cluster_radius: u32,
    cluster_max_zoom: u8,
}

impl From<Cluster> for ClusterWire {
    fn from(c: Cluster) -> Self {
        ClusterWire {
            cluster: true,
            cluster_radius: c.radius,
            cluster_max_zoom: c.max_zoom,
        }
    }
}

impl From<ClusterWire> for Cluster {
    fn from(w: ClusterWire) -> Self {
        Cluster {
            radius: w.cluster_radius,
            max_zoom: w.cluster_max_zoom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terrain {
    pub source: String,
    pub exaggeration: f64,
}

pub trait MapWidget: Send + 'static {
    fn has_source(&self, id: &str) -> bool;
    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<()>;
    /// Replace the data of a GeoJSON source.
    fn set_source_data(&mut self, id: &str, data: &FeatureCollection) -> Result<()>;
    fn remove_source(&mut self, id: &str) -> Result<()>;

    fn has_layer(&self, id: &str) -> bool;
    /// Add a layer, honoring `before_id` when set.
    fn add_layer(&mut self, layer: &LayerSpec) -> Result<()>;
    fn remove_layer(&mut self, id: &str) -> Result<()>;
    fn set_filter(&mut self, layer: &str, filter: Option<Value>) -> Result<()>;

    fn has_image(&self, id: &str) -> bool;
    fn add_image(&mut self, id: &str, url: &str) -> Result<()>;
    fn remove_image(&mut self, id: &str) -> Result<()>;

    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId>;
    fn remove_marker(&mut self, id: MarkerId) -> Result<()>;

    fn add_control(&mut self, control: &dyn MapControl, position: ControlPosition) -> Result<ControlId>;
    fn has_control(&self, id: ControlId) -> bool;
    fn remove_control(&mut self, id: ControlId) -> Result<()>;

    /// Subscribe to an interaction event, optionally scoped to one layer.
    fn on(&mut self, event: &str, layer: Option<&str>, listener: Listener) -> Result<ListenerId>;
    fn off(&mut self, id: ListenerId) -> Result<()>;

    fn fly_to(&mut self, center: LngLat, options: &FlyToOptions) -> Result<()>;
    fn fit_bounds(&mut self, bounds: [[f64; 2]; 2], options: &FitBoundsOptions) -> Result<()>;
    fn set_terrain(&mut self, terrain: Option<Terrain>) -> Result<()>;
    fn set_cursor(&mut self, cursor: &str) -> Result<()>;

    /// Re-measure the container. Automatic tracking is always off.
    fn resize(&mut self) -> Result<()>;
    /// Destroy the widget. Every later mutation fails.
    fn remove(&mut self);
}
