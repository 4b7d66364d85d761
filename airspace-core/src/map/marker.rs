//! DOM markers, reconciled by key.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::widget::{MapWidget, MarkerId};
use super::{lock, map_key, SharedMap};
use crate::types::{LngLat, Result};

pub const DEFAULT_MARKER_COLOR: &str = "red";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSpec {
    pub lng_lat: LngLat,
    pub color: String,
}

struct Placed {
    key: String,
    lng_lat: LngLat,
    id: MarkerId,
}

/// Keeps one marker per keyed item on the current map. A marker is
/// recreated when its key's position changes.
pub struct Markers<W: MapWidget> {
    color: String,
    map: Option<SharedMap<W>>,
    placed: Vec<Placed>,
}

impl<W: MapWidget> Markers<W> {
    pub fn new(color: impl Into<String>) -> Self {
        Markers {
            color: color.into(),
            map: None,
            placed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.placed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>, items: &[(String, LngLat)]) -> Result<()> {
        let current = self.map.as_ref().map(map_key);
        if current != map.map(map_key) {
            self.detach();
            self.map = map.map(SharedMap::clone);
        }
        let Some(map) = self.map.clone() else {
            return Ok(());
        };
        let mut widget = lock(&map);

        let mut kept = Vec::with_capacity(self.placed.len());
        for placed in self.placed.drain(..) {
            let wanted = items
                .iter()
                .any(|(key, at)| *key == placed.key && *at == placed.lng_lat);
            if wanted {
                kept.push(placed);
            } else if let Err(e) = widget.remove_marker(placed.id) {
                debug!(key = %placed.key, error = %e, "marker removal failed");
            }
        }
        self.placed = kept;

        for (key, at) in items {
            if self.placed.iter().any(|p| p.key == *key) {
                continue;
            }
            let id = widget.add_marker(&MarkerSpec {
                lng_lat: *at,
                color: self.color.clone(),
            })?;
            self.placed.push(Placed {
                key: key.clone(),
                lng_lat: *at,
                id,
            });
        }
        Ok(())
    }

    pub fn detach(&mut self) {
        let Some(map) = self.map.take() else {
            return;
        };
        let mut widget = lock(&map);
        for placed in self.placed.drain(..) {
            if let Err(e) = widget.remove_marker(placed.id) {
                debug!(key = %placed.key, error = %e, "marker removal failed");
            }
        }
    }
}

impl<W: MapWidget> Drop for Markers<W> {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::headless::HeadlessMap;
    use crate::map::test_map;

    fn item(key: &str, lng: f64, lat: f64) -> (String, LngLat) {
        (key.to_string(), LngLat::new(lng, lat))
    }

    #[test]
    fn test_reconcile_adds_and_removes() {
        let map = test_map();
        let mut markers = Markers::new(DEFAULT_MARKER_COLOR);
        markers.sync(Some(&map), &[item("a", 1.0, 1.0), item("b", 2.0, 2.0)]).unwrap();
        assert_eq!(lock(&map).marker_count(), 2);

        markers.sync(Some(&map), &[item("b", 2.0, 2.0)]).unwrap();
        assert_eq!(lock(&map).marker_count(), 1);
        assert_eq!(markers.len(), 1);
    }

    #[test]
    fn test_moved_marker_is_recreated() {
        let map = test_map();
        let mut markers = Markers::new("blue");
        markers.sync(Some(&map), &[item("a", 1.0, 1.0)]).unwrap();
        let seq = lock(&map).last_seq();
        markers.sync(Some(&map), &[item("a", 1.0, 1.0)]).unwrap();
        assert_eq!(lock(&map).last_seq(), seq);

        markers.sync(Some(&map), &[item("a", 5.0, 5.0)]).unwrap();
        let w = lock(&map);
        assert_eq!(w.marker_count(), 1);
        assert_eq!(w.markers().next().unwrap().lng_lat, LngLat::new(5.0, 5.0));
    }

    #[test]
    fn test_items_without_map_wait() {
        let mut markers: Markers<HeadlessMap> = Markers::new("red");
        markers.sync(None, &[item("a", 1.0, 1.0)]).unwrap();
        assert!(markers.is_empty());

        let map = test_map();
        markers.sync(Some(&map), &[item("a", 1.0, 1.0)]).unwrap();
        assert_eq!(lock(&map).marker_count(), 1);
        drop(markers);
        assert_eq!(lock(&map).marker_count(), 0);
    }
}
