//! Declarative layer specs and the source/layer binder.

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::widget::{MapWidget, SourceSpec};
use super::{lock, map_key, SharedMap};
use crate::types::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerKind {
    Fill,
    Line,
    Circle,
    Symbol,
    FillExtrusion,
    Heatmap,
    Raster,
    Hillshade,
    Background,
}

/// One style-spec layer. `before_id` is an insertion hint, not part of the
/// layer itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub source: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub paint: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub layout: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_id: Option<String>,
}

impl LayerSpec {
    pub fn new(id: impl Into<String>, kind: LayerKind, source: impl Into<String>) -> Self {
        LayerSpec {
            id: id.into(),
            kind,
            source: source.into(),
            paint: Map::new(),
            layout: Map::new(),
            filter: None,
            minzoom: None,
            maxzoom: None,
            before_id: None,
        }
    }

    pub fn paint(mut self, key: &str, value: Value) -> Self {
        self.paint.insert(key.to_string(), value);
        self
    }

    pub fn layout(mut self, key: &str, value: Value) -> Self {
        self.layout.insert(key.to_string(), value);
        self
    }

    pub fn filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn zoom_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.minzoom = min;
        self.maxzoom = max;
        self
    }

    pub fn before(mut self, layer_id: impl Into<String>) -> Self {
        self.before_id = Some(layer_id.into());
        self
    }
}

struct Attached<W> {
    map: SharedMap<W>,
    layers: Vec<LayerSpec>,
}

/// Binds one GeoJSON source and its layers to whatever map is current.
///
/// Specs are applied once per attach and never diffed; pushing data with
/// [`set_data`](Self::set_data) is the only mutation while attached.
pub struct MapLayer<W: MapWidget> {
    source_id: String,
    source: SourceSpec,
    layers: Vec<LayerSpec>,
    attached: Option<Attached<W>>,
}

impl<W: MapWidget> MapLayer<W> {
    pub fn new(source_id: impl Into<String>, layers: Vec<LayerSpec>) -> Self {
        MapLayer {
            source_id: source_id.into(),
            source: SourceSpec::empty_geojson(),
            layers,
            attached: None,
        }
    }

    /// Use `source` instead of an empty, unclustered GeoJSON source.
    pub fn with_source(mut self, source: SourceSpec) -> Self {
        self.source = source;
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Replace the specs used by the next attach. The current map is untouched.
    pub fn set_layers(&mut self, layers: Vec<LayerSpec>) {
        self.layers = layers;
    }

    /// Follow the current map: attach on appear, detach on change or removal.
    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        let current = self.attached.as_ref().map(|a| map_key(&a.map));
        if current == map.map(map_key) {
            return Ok(());
        }
        self.detach();

        let Some(map) = map else {
            return Ok(());
        };
        let layers = self.layers.clone();
        self.attached = Some(Attached {
            map: SharedMap::clone(map),
            layers: layers.clone(),
        });

        let mut widget = lock(map);
        if !widget.has_source(&self.source_id) {
            widget.add_source(&self.source_id, self.source.clone())?;
        }
        for layer in &layers {
            if !widget.has_layer(&layer.id) {
                widget.add_layer(layer)?;
            }
        }
        Ok(())
    }

    /// Push new data into the source. Returns `false` before attach.
    pub fn set_data(&self, data: &FeatureCollection) -> Result<bool> {
        let Some(attached) = &self.attached else {
            return Ok(false);
        };
        let mut widget = lock(&attached.map);
        if !widget.has_source(&self.source_id) {
            return Ok(false);
        }
        widget.set_source_data(&self.source_id, data)?;
        Ok(true)
    }

    /// Remove layers in reverse order, then the source.
    pub fn detach(&mut self) {
        let Some(attached) = self.attached.take() else {
            return;
        };
        let mut widget = lock(&attached.map);
        for layer in attached.layers.iter().rev() {
            if widget.has_layer(&layer.id) {
                if let Err(e) = widget.remove_layer(&layer.id) {
                    debug!(layer = %layer.id, error = %e, "layer teardown failed");
                }
            }
        }
        if widget.has_source(&self.source_id) {
            if let Err(e) = widget.remove_source(&self.source_id) {
                debug!(source = %self.source_id, error = %e, "source teardown failed");
            }
        }
    }
}

impl<W: MapWidget> Drop for MapLayer<W> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::headless::{HeadlessMap, MapCommand};
    use crate::map::test_map;
    use serde_json::json;

    fn specs() -> Vec<LayerSpec> {
        vec![
            LayerSpec::new("pts-circle", LayerKind::Circle, "pts").paint("circle-radius", json!(4)),
            LayerSpec::new("pts-label", LayerKind::Symbol, "pts").layout("text-field", json!(["get", "name"])),
        ]
    }

    fn ops(map: &SharedMap<HeadlessMap>) -> Vec<String> {
        lock(map)
            .commands_since(0)
            .into_iter()
            .map(|c| c.command.op_name().to_string())
            .collect()
    }

    #[test]
    fn test_spec_serialization() {
        let spec = LayerSpec::new("a", LayerKind::FillExtrusion, "s")
            .before("b")
            .zoom_range(Some(3.0), None);
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(value["type"], "fill-extrusion");
        assert_eq!(value["beforeId"], "b");
        assert_eq!(value["minzoom"], 3.0);
        assert!(value.get("paint").is_none());
        assert!(value.get("maxzoom").is_none());
    }

    #[test]
    fn test_attach_creates_source_and_layers() {
        let map = test_map();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&map)).unwrap();
        {
            let w = lock(&map);
            assert!(w.has_source("pts"));
            assert_eq!(w.layer_ids(), vec!["pts-circle", "pts-label"]);
        }
        // same map again is a no-op
        let before = lock(&map).last_seq();
        layer.sync(Some(&map)).unwrap();
        assert_eq!(lock(&map).last_seq(), before);
    }

    #[test]
    fn test_attach_is_idempotent_on_existing_source() {
        let map = test_map();
        lock(&map).add_source("pts", SourceSpec::empty_geojson()).unwrap();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&map)).unwrap();
        assert_eq!(lock(&map).layer_ids().len(), 2);
    }

    #[test]
    fn test_set_data_before_attach_is_noop() {
        let layer: MapLayer<HeadlessMap> = MapLayer::new("pts", specs());
        assert!(!layer.set_data(&crate::geo::empty_collection()).unwrap());
    }

    #[test]
    fn test_set_data_reaches_source() {
        let map = test_map();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&map)).unwrap();
        let fc = crate::geo::BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_feature_collection();
        assert!(layer.set_data(&fc).unwrap());
        assert_eq!(lock(&map).source_data("pts"), Some(&fc));
    }

    #[test]
    fn test_teardown_order() {
        let map = test_map();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&map)).unwrap();
        drop(layer);

        let ops = ops(&map);
        let tail: Vec<&str> = ops.iter().rev().take(3).rev().map(String::as_str).collect();
        assert_eq!(tail, vec!["removeLayer", "removeLayer", "removeSource"]);
        let w = lock(&map);
        let removed: Vec<String> = w
            .commands_since(0)
            .into_iter()
            .filter_map(|c| match c.command {
                MapCommand::RemoveLayer { id } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(removed, vec!["pts-label", "pts-circle"]);
        assert!(!w.has_source("pts"));
    }

    #[test]
    fn test_map_change_moves_layers() {
        let first = test_map();
        let second = test_map();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&first)).unwrap();
        layer.sync(Some(&second)).unwrap();
        assert!(!lock(&first).has_source("pts"));
        assert!(lock(&second).has_source("pts"));
        layer.sync(None).unwrap();
        assert!(!layer.is_attached());
        assert!(!lock(&second).has_source("pts"));
    }

    #[test]
    fn test_set_layers_applies_on_next_attach_only() {
        let first = test_map();
        let second = test_map();
        let mut layer = MapLayer::new("pts", specs());
        layer.sync(Some(&first)).unwrap();
        layer.set_layers(vec![LayerSpec::new("pts-only", LayerKind::Circle, "pts")]);
        assert_eq!(lock(&first).layer_ids().len(), 2);
        layer.sync(Some(&second)).unwrap();
        assert_eq!(lock(&second).layer_ids(), vec!["pts-only"]);
    }
}
