//! In-memory widget that records a replayable command log.
//!
//! `HeadlessMap` enforces the same rules a Mapbox GL map does (a layer needs
//! its source, ids are unique, a removed map rejects everything) and keeps a
//! sequenced [`MapCommand`] log. A browser shim polls the log and replays it
//! onto a real map; interaction events come back through [`HeadlessMap::emit`].

use std::collections::BTreeMap;

use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;

use super::camera::{FitBoundsOptions, FlyToOptions};
use super::control::{ControlPosition, MapControl};
use super::event::{Listener, MapEvent};
use super::layer::LayerSpec;
use super::marker::MarkerSpec;
use super::provider::MapInit;
use super::widget::{ControlId, ListenerId, MapWidget, MarkerId, SourceSpec, Terrain};
use super::{lock, SharedMap};
use crate::types::{AirspaceError, LngLat, Result};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum MapCommand {
    Init { options: MapInit },
    AddSource { id: String, source: SourceSpec },
    SetData { source: String, data: FeatureCollection },
    RemoveSource { id: String },
    AddLayer { layer: LayerSpec },
    RemoveLayer { id: String },
    SetFilter { layer: String, filter: Option<Value> },
    AddImage { id: String, url: String },
    RemoveImage { id: String },
    AddMarker { id: MarkerId, marker: MarkerSpec },
    RemoveMarker { id: MarkerId },
    AddControl { id: ControlId, kind: String, options: Value, position: ControlPosition },
    RemoveControl { id: ControlId },
    /// The shim forwards `event` (scoped to `layer`) back to the server.
    On { id: ListenerId, event: String, layer: Option<String> },
    Off { id: ListenerId },
    FlyTo { center: [f64; 2], options: FlyToOptions },
    FitBounds { bounds: [[f64; 2]; 2], options: FitBoundsOptions },
    SetTerrain { terrain: Option<Terrain> },
    SetCursor { cursor: String },
    Resize,
    Remove,
}

impl MapCommand {
    /// Wire name of the command, as in the `op` tag.
    pub fn op_name(&self) -> &'static str {
        match self {
            MapCommand::Init { .. } => "init",
            MapCommand::AddSource { .. } => "addSource",
            MapCommand::SetData { .. } => "setData",
            MapCommand::RemoveSource { .. } => "removeSource",
            MapCommand::AddLayer { .. } => "addLayer",
            MapCommand::RemoveLayer { .. } => "removeLayer",
            MapCommand::SetFilter { .. } => "setFilter",
            MapCommand::AddImage { .. } => "addImage",
            MapCommand::RemoveImage { .. } => "removeImage",
            MapCommand::AddMarker { .. } => "addMarker",
            MapCommand::RemoveMarker { .. } => "removeMarker",
            MapCommand::AddControl { .. } => "addControl",
            MapCommand::RemoveControl { .. } => "removeControl",
            MapCommand::On { .. } => "on",
            MapCommand::Off { .. } => "off",
            MapCommand::FlyTo { .. } => "flyTo",
            MapCommand::FitBounds { .. } => "fitBounds",
            MapCommand::SetTerrain { .. } => "setTerrain",
            MapCommand::SetCursor { .. } => "setCursor",
            MapCommand::Resize => "resize",
            MapCommand::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequenced {
    pub seq: u64,
    #[serde(flatten)]
    pub command: MapCommand,
}

struct ListenerEntry {
    id: ListenerId,
    event: String,
    layer: Option<String>,
    listener: Listener,
}

pub struct HeadlessMap {
    init: MapInit,
    sources: BTreeMap<String, SourceSpec>,
    layers: Vec<LayerSpec>,
    images: BTreeMap<String, String>,
    markers: BTreeMap<MarkerId, MarkerSpec>,
    controls: BTreeMap<ControlId, (String, ControlPosition)>,
    listeners: Vec<ListenerEntry>,
    terrain: Option<Terrain>,
    cursor: String,
    resizes: u32,
    removed: bool,
    next_id: u64,
    log: Vec<Sequenced>,
    next_seq: u64,
}

fn map_error(message: impl Into<String>) -> AirspaceError {
    AirspaceError::Map(message.into())
}

/// Whether `newer` makes `older` redundant in the log. A client that has not
/// yet read `older` ends in the same state by replaying `newer` alone; every
/// removal is a no-op in the shim when its target is missing.
fn supersedes(newer: &MapCommand, older: &MapCommand) -> bool {
    use MapCommand::*;
    match (newer, older) {
        (SetData { source: a, .. }, SetData { source: b, .. }) => a == b,
        (SetFilter { layer: a, .. }, SetFilter { layer: b, .. }) => a == b,
        (SetCursor { .. }, SetCursor { .. }) => true,
        (SetTerrain { .. }, SetTerrain { .. }) => true,
        (Resize, Resize) => true,
        (FlyTo { .. } | FitBounds { .. }, FlyTo { .. } | FitBounds { .. }) => true,
        (RemoveSource { id: a }, AddSource { id: b, .. } | RemoveSource { id: b }) => a == b,
        (RemoveSource { id: a }, SetData { source: b, .. }) => a == b,
        (RemoveLayer { id: a }, AddLayer { layer }) => *a == layer.id,
        (RemoveLayer { id: a }, RemoveLayer { id: b } | SetFilter { layer: b, .. }) => a == b,
        (RemoveImage { id: a }, AddImage { id: b, .. } | RemoveImage { id: b }) => a == b,
        (RemoveMarker { id: a }, AddMarker { id: b, .. }) => a == b,
        (RemoveControl { id: a }, AddControl { id: b, .. }) => a == b,
        (Off { id: a }, On { id: b, .. }) => a == b,
        _ => false,
    }
}

impl HeadlessMap {
    pub fn new(init: MapInit) -> Self {
        let mut map = HeadlessMap {
            init: init.clone(),
            sources: BTreeMap::new(),
            layers: Vec::new(),
            images: BTreeMap::new(),
            markers: BTreeMap::new(),
            controls: BTreeMap::new(),
            listeners: Vec::new(),
            terrain: None,
            cursor: String::new(),
            resizes: 0,
            removed: false,
            next_id: 0,
            log: Vec::new(),
            next_seq: 0,
        };
        map.record(MapCommand::Init { options: init });
        map
    }

    fn record(&mut self, command: MapCommand) {
        self.log.retain(|entry| !supersedes(&command, &entry.command));
        self.next_seq += 1;
        self.log.push(Sequenced {
            seq: self.next_seq,
            command,
        });
    }

    fn ensure_live(&self) -> Result<()> {
        if self.removed {
            return Err(map_error("map has been removed"));
        }
        Ok(())
    }

    fn next_handle(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // --- log ------------------------------------------------------------

    /// Commands with a sequence number greater than `seq`, oldest first.
    pub fn commands_since(&self, seq: u64) -> Vec<Sequenced> {
        self.log.iter().filter(|c| c.seq > seq).cloned().collect()
    }

    pub fn last_seq(&self) -> u64 {
        self.next_seq
    }

    // --- inspection -----------------------------------------------------

    pub fn init(&self) -> &MapInit {
        &self.init
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn source(&self, id: &str) -> Option<&SourceSpec> {
        self.sources.get(id)
    }

    pub fn source_data(&self, id: &str) -> Option<&FeatureCollection> {
        match self.sources.get(id) {
            Some(SourceSpec::Geojson { data, .. }) => Some(data),
            _ => None,
        }
    }

    pub fn image_url(&self, id: &str) -> Option<&str> {
        self.images.get(id).map(String::as_str)
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.markers.values()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn control(&self, id: ControlId) -> Option<(&str, ControlPosition)> {
        self.controls.get(&id).map(|(kind, pos)| (kind.as_str(), *pos))
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn terrain(&self) -> Option<&Terrain> {
        self.terrain.as_ref()
    }

    pub fn cursor(&self) -> &str {
        &self.cursor
    }

    pub fn resize_count(&self) -> u32 {
        self.resizes
    }

    // --- events ---------------------------------------------------------

    /// Deliver an interaction event. Listeners are collected under the lock
    /// and invoked after it is released, so they may lock the map
    /// themselves. A layer-scoped listener runs only when the event carries
    /// features from its layer and sees only those. Returns the number of
    /// listeners invoked.
    pub fn emit(map: &SharedMap<HeadlessMap>, event: &MapEvent) -> usize {
        let targets: Vec<(Option<String>, Listener)> = {
            let widget = lock(map);
            if widget.removed {
                return 0;
            }
            widget
                .listeners
                .iter()
                .filter(|l| l.event == event.kind)
                .map(|l| (l.layer.clone(), Listener::clone(&l.listener)))
                .collect()
        };

        let mut invoked = 0;
        for (layer, listener) in targets {
            match layer {
                None => listener(event),
                Some(layer) => match event.scoped_to(&layer) {
                    Some(scoped) => listener(&scoped),
                    None => continue,
                },
            }
            invoked += 1;
        }
        invoked
    }

    /// Pairs the shim should forward, as `(event, layer)`.
    pub fn subscriptions(&self) -> Vec<(String, Option<String>)> {
        self.listeners
            .iter()
            .map(|l| (l.event.clone(), l.layer.clone()))
            .collect()
    }
}

impl MapWidget for HeadlessMap {
    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn add_source(&mut self, id: &str, source: SourceSpec) -> Result<()> {
        self.ensure_live()?;
        if self.sources.contains_key(id) {
            return Err(map_error(format!("source '{id}' already exists")));
        }
        self.sources.insert(id.to_string(), source.clone());
        self.record(MapCommand::AddSource {
            id: id.to_string(),
            source,
        });
        Ok(())
    }

    fn set_source_data(&mut self, id: &str, data: &FeatureCollection) -> Result<()> {
        self.ensure_live()?;
        match self.sources.get_mut(id) {
            Some(SourceSpec::Geojson { data: current, .. }) => *current = data.clone(),
            Some(_) => return Err(map_error(format!("source '{id}' is not a GeoJSON source"))),
            None => return Err(map_error(format!("source '{id}' does not exist"))),
        }
        self.record(MapCommand::SetData {
            source: id.to_string(),
            data: data.clone(),
        });
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        if !self.sources.contains_key(id) {
            return Err(map_error(format!("source '{id}' does not exist")));
        }
        if let Some(user) = self.layers.iter().find(|l| l.source == id) {
            return Err(map_error(format!(
                "source '{id}' is in use by layer '{}'",
                user.id
            )));
        }
        if self.terrain.as_ref().is_some_and(|t| t.source == id) {
            return Err(map_error(format!("source '{id}' is in use by terrain")));
        }
        self.sources.remove(id);
        self.record(MapCommand::RemoveSource { id: id.to_string() });
        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn add_layer(&mut self, layer: &LayerSpec) -> Result<()> {
        self.ensure_live()?;
        if self.has_layer(&layer.id) {
            return Err(map_error(format!("layer '{}' already exists", layer.id)));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(map_error(format!(
                "layer '{}' references missing source '{}'",
                layer.id, layer.source
            )));
        }
        let index = match &layer.before_id {
            Some(before) => self
                .layers
                .iter()
                .position(|l| l.id == *before)
                .ok_or_else(|| map_error(format!("before layer '{before}' does not exist")))?,
            None => self.layers.len(),
        };
        self.layers.insert(index, layer.clone());
        self.record(MapCommand::AddLayer {
            layer: layer.clone(),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        let index = self
            .layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| map_error(format!("layer '{id}' does not exist")))?;
        self.layers.remove(index);
        self.record(MapCommand::RemoveLayer { id: id.to_string() });
        Ok(())
    }

    fn set_filter(&mut self, layer: &str, filter: Option<Value>) -> Result<()> {
        self.ensure_live()?;
        let spec = self
            .layers
            .iter_mut()
            .find(|l| l.id == layer)
            .ok_or_else(|| map_error(format!("layer '{layer}' does not exist")))?;
        spec.filter = filter.clone();
        self.record(MapCommand::SetFilter {
            layer: layer.to_string(),
            filter,
        });
        Ok(())
    }

    fn has_image(&self, id: &str) -> bool {
        self.images.contains_key(id)
    }

    fn add_image(&mut self, id: &str, url: &str) -> Result<()> {
        self.ensure_live()?;
        if self.images.contains_key(id) {
            return Err(map_error(format!("image '{id}' already exists")));
        }
        self.images.insert(id.to_string(), url.to_string());
        self.record(MapCommand::AddImage {
            id: id.to_string(),
            url: url.to_string(),
        });
        Ok(())
    }

    fn remove_image(&mut self, id: &str) -> Result<()> {
        self.ensure_live()?;
        if self.images.remove(id).is_none() {
            return Err(map_error(format!("image '{id}' does not exist")));
        }
        self.record(MapCommand::RemoveImage { id: id.to_string() });
        Ok(())
    }

    fn add_marker(&mut self, marker: &MarkerSpec) -> Result<MarkerId> {
        self.ensure_live()?;
        let id = MarkerId(self.next_handle());
        self.markers.insert(id, marker.clone());
        self.record(MapCommand::AddMarker {
            id,
            marker: marker.clone(),
        });
        Ok(id)
    }

    fn remove_marker(&mut self, id: MarkerId) -> Result<()> {
        self.ensure_live()?;
        if self.markers.remove(&id).is_none() {
            return Err(map_error(format!("marker {} does not exist", id.0)));
        }
        self.record(MapCommand::RemoveMarker { id });
        Ok(())
    }

    fn add_control(&mut self, control: &dyn MapControl, position: ControlPosition) -> Result<ControlId> {
        self.ensure_live()?;
        let id = ControlId(self.next_handle());
        self.controls.insert(id, (control.kind().to_string(), position));
        self.record(MapCommand::AddControl {
            id,
            kind: control.kind().to_string(),
            options: control.options(),
            position,
        });
        Ok(id)
    }

    fn has_control(&self, id: ControlId) -> bool {
        self.controls.contains_key(&id)
    }

    fn remove_control(&mut self, id: ControlId) -> Result<()> {
        self.ensure_live()?;
        if self.controls.remove(&id).is_none() {
            return Err(map_error(format!("control {} does not exist", id.0)));
        }
        self.record(MapCommand::RemoveControl { id });
        Ok(())
    }

    fn on(&mut self, event: &str, layer: Option<&str>, listener: Listener) -> Result<ListenerId> {
        self.ensure_live()?;
        let id = ListenerId(self.next_handle());
        self.listeners.push(ListenerEntry {
            id,
            event: event.to_string(),
            layer: layer.map(str::to_string),
            listener,
        });
        self.record(MapCommand::On {
            id,
            event: event.to_string(),
            layer: layer.map(str::to_string),
        });
        Ok(id)
    }

    fn off(&mut self, id: ListenerId) -> Result<()> {
        self.ensure_live()?;
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        if self.listeners.len() == before {
            return Err(map_error(format!("listener {} does not exist", id.0)));
        }
        self.record(MapCommand::Off { id });
        Ok(())
    }

    fn fly_to(&mut self, center: LngLat, options: &FlyToOptions) -> Result<()> {
        self.ensure_live()?;
        if !center.is_finite() {
            return Err(map_error(format!("invalid center {center}")));
        }
        self.record(MapCommand::FlyTo {
            center: [center.lng, center.lat],
            options: options.clone(),
        });
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: [[f64; 2]; 2], options: &FitBoundsOptions) -> Result<()> {
        self.ensure_live()?;
        if bounds.iter().flatten().any(|v| !v.is_finite()) {
            return Err(map_error("invalid bounds"));
        }
        self.record(MapCommand::FitBounds {
            bounds,
            options: options.clone(),
        });
        Ok(())
    }

    fn set_terrain(&mut self, terrain: Option<Terrain>) -> Result<()> {
        self.ensure_live()?;
        if let Some(t) = &terrain {
            if !self.sources.contains_key(&t.source) {
                return Err(map_error(format!("terrain source '{}' does not exist", t.source)));
            }
        }
        self.terrain = terrain.clone();
        self.record(MapCommand::SetTerrain { terrain });
        Ok(())
    }

    fn set_cursor(&mut self, cursor: &str) -> Result<()> {
        self.ensure_live()?;
        if self.cursor == cursor {
            return Ok(());
        }
        self.cursor = cursor.to_string();
        self.record(MapCommand::SetCursor {
            cursor: cursor.to_string(),
        });
        Ok(())
    }

    fn resize(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.resizes += 1;
        self.record(MapCommand::Resize);
        Ok(())
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        self.sources.clear();
        self.layers.clear();
        self.images.clear();
        self.markers.clear();
        self.controls.clear();
        self.listeners.clear();
        self.terrain = None;
        self.record(MapCommand::Remove);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
