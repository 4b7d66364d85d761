//! Click to drop a pin.

use std::sync::{Arc, Mutex};

use crate::map::{lock, MapEvent, MapEventHook, MapWidget, Markers, SharedMap, DEFAULT_MARKER_COLOR};
use crate::types::{LngLat, Result};

/// Pins share a key when they share a position.
pub fn marker_key(at: &LngLat) -> String {
    format!("{}-{}", at.lng, at.lat)
}

pub struct MarkPage<W: MapWidget> {
    markers: Arc<Mutex<Vec<LngLat>>>,
    click: MapEventHook<W>,
    pins: Markers<W>,
}

impl<W: MapWidget> MarkPage<W> {
    pub fn new() -> Self {
        let markers: Arc<Mutex<Vec<LngLat>>> = Arc::default();
        let sink = Arc::clone(&markers);
        let click = MapEventHook::new("click", None, move |event: &MapEvent| {
            if let Some(at) = event.lng_lat {
                lock(&sink).push(at);
            }
        });
        MarkPage {
            markers,
            click,
            pins: Markers::new(DEFAULT_MARKER_COLOR),
        }
    }

    pub fn markers(&self) -> Vec<LngLat> {
        lock(&self.markers).clone()
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        self.click.sync(map)?;
        let items: Vec<(String, LngLat)> = lock(&self.markers)
            .iter()
            .map(|at| (marker_key(at), *at))
            .collect();
        self.pins.sync(map, &items)
    }
}

impl<W: MapWidget> Default for MarkPage<W> {
    fn default() -> Self {
        Self::new()
    }
}
