//! Interaction events and the event-subscription hook.

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::widget::{ListenerId, MapWidget};
use super::{lock, map_key, SharedMap};
use crate::types::{LngLat, Result};

/// A feature under the pointer, as reported by the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFeature {
    pub layer: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub lng_lat: Option<LngLat>,
    #[serde(default)]
    pub point: Option<[f64; 2]>,
    /// Rendered features at `point` across the subscribed layers.
    #[serde(default)]
    pub features: Vec<RenderedFeature>,
}

impl MapEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        MapEvent {
            kind: kind.into(),
            lng_lat: None,
            point: None,
            features: Vec::new(),
        }
    }

    pub fn click(lng_lat: LngLat) -> Self {
        MapEvent {
            lng_lat: Some(lng_lat),
            ..MapEvent::new("click")
        }
    }

    pub fn with_feature(mut self, layer: &str, properties: Value) -> Self {
        let properties = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.features.push(RenderedFeature {
            layer: layer.to_string(),
            properties,
        });
        self
    }

    pub fn has_features_in(&self, layer: &str) -> bool {
        self.features.iter().any(|f| f.layer == layer)
    }

    /// Copy of the event carrying only `layer`'s features, or `None` when it
    /// has none.
    pub fn scoped_to(&self, layer: &str) -> Option<MapEvent> {
        if !self.has_features_in(layer) {
            return None;
        }
        Some(MapEvent {
            kind: self.kind.clone(),
            lng_lat: self.lng_lat,
            point: self.point,
            features: self
                .features
                .iter()
                .filter(|f| f.layer == layer)
                .cloned()
                .collect(),
        })
    }
}

/// Callback registered on a widget.
pub type Listener = Arc<dyn Fn(&MapEvent) + Send + Sync>;

type Handler = Box<dyn FnMut(&MapEvent) + Send>;

/// Keeps one listener registered on the current map.
///
/// The handler lives in a shared slot so it can be swapped without touching
/// the registration; only a change of event name or layer re-subscribes.
pub struct MapEventHook<W: MapWidget> {
    event: String,
    layer: Option<String>,
    handler: Arc<Mutex<Handler>>,
    attached: Option<(SharedMap<W>, ListenerId)>,
}

impl<W: MapWidget> MapEventHook<W> {
    pub fn new(
        event: impl Into<String>,
        layer: Option<&str>,
        handler: impl FnMut(&MapEvent) + Send + 'static,
    ) -> Self {
        MapEventHook {
            event: event.into(),
            layer: layer.map(str::to_string),
            handler: Arc::new(Mutex::new(Box::new(handler))),
            attached: None,
        }
    }

    pub fn event(&self) -> &str {
        &self.event
    }

    pub fn layer(&self) -> Option<&str> {
        self.layer.as_deref()
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Swap the handler. The registration is kept.
    pub fn set_handler(&mut self, handler: impl FnMut(&MapEvent) + Send + 'static) {
        *self.handler.lock().unwrap_or_else(PoisonError::into_inner) = Box::new(handler);
    }

    /// Change event or layer, re-subscribing on the current map if either differs.
    pub fn retarget(&mut self, event: &str, layer: Option<&str>) -> Result<()> {
        if self.event == event && self.layer.as_deref() == layer {
            return Ok(());
        }
        self.event = event.to_string();
        self.layer = layer.map(str::to_string);

        let map = self.attached.as_ref().map(|(m, _)| SharedMap::clone(m));
        self.detach();
        match map {
            Some(map) => self.attach(&map),
            None => Ok(()),
        }
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        let current = self.attached.as_ref().map(|(m, _)| map_key(m));
        if current == map.map(map_key) {
            return Ok(());
        }
        self.detach();
        match map {
            Some(map) => self.attach(map),
            None => Ok(()),
        }
    }

    fn attach(&mut self, map: &SharedMap<W>) -> Result<()> {
        let slot = Arc::clone(&self.handler);
        let listener: Listener = Arc::new(move |event: &MapEvent| {
            let mut handler = slot.lock().unwrap_or_else(PoisonError::into_inner);
            (&mut **handler)(event);
        });
        let id = lock(map).on(&self.event, self.layer.as_deref(), listener)?;
        self.attached = Some((SharedMap::clone(map), id));
        Ok(())
    }

    pub fn detach(&mut self) {
        if let Some((map, id)) = self.attached.take() {
            if let Err(e) = lock(&map).off(id) {
                debug!(event = %self.event, error = %e, "listener teardown failed");
            }
        }
    }
}

impl<W: MapWidget> Drop for MapEventHook<W> {
    fn drop(&mut self) {
        self.detach();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
