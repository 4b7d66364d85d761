//! Click to add a place; pick one from the list to fly to it.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::map::{
    lock, FlyTo, FlyToOptions, MapEvent, MapEventHook, MapWidget, Markers, SharedMap,
    DEFAULT_MARKER_COLOR,
};
use crate::places::{Place, PlaceList};
use crate::types::{LngLat, Result};

pub const PLACE_ZOOM: f64 = 12.0;
pub const PLACE_DURATION_MS: u64 = 2000;

/// Hint shown while the list is empty.
pub const EMPTY_HINT: &str = "Click on the map to add places.";

pub struct PlacesPage<W: MapWidget> {
    places: Arc<Mutex<PlaceList>>,
    click: MapEventHook<W>,
    pins: Markers<W>,
    fly: FlyTo,
}

impl<W: MapWidget> PlacesPage<W> {
    pub fn new() -> Self {
        let places: Arc<Mutex<PlaceList>> = Arc::default();
        let sink = Arc::clone(&places);
        let click = MapEventHook::new("click", None, move |event: &MapEvent| {
            if let Some(at) = event.lng_lat {
                lock(&sink).add(at);
            }
        });
        PlacesPage {
            places,
            click,
            pins: Markers::new(DEFAULT_MARKER_COLOR),
            fly: FlyTo::new(),
        }
    }

    /// Current list, in insertion order.
    pub fn places(&self) -> PlaceList {
        lock(&self.places).clone()
    }

    pub fn add(&self, at: LngLat) -> Uuid {
        lock(&self.places).add(at)
    }

    pub fn select(&self, id: Uuid) -> bool {
        lock(&self.places).select(id)
    }

    pub fn delete(&self, id: Uuid) -> bool {
        lock(&self.places).remove(id)
    }

    pub fn selected(&self) -> Option<Place> {
        lock(&self.places).selected().cloned()
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        self.click.sync(map)?;
        let (items, target) = {
            let places = lock(&self.places);
            let items: Vec<(String, LngLat)> = places
                .iter()
                .map(|p| (p.id.to_string(), p.coordinates))
                .collect();
            (items, places.selected().map(|p| p.coordinates))
        };
        self.pins.sync(map, &items)?;
        let options = FlyToOptions::zoom_duration(PLACE_ZOOM, PLACE_DURATION_MS);
        self.fly.sync(map, target, &options)?;
        Ok(())
    }
}

impl<W: MapWidget> Default for PlacesPage<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{test_map, HeadlessMap, MapCommand};

    fn fly_targets(map: &SharedMap<HeadlessMap>) -> Vec<[f64; 2]> {
        lock(map)
            .commands_since(0)
            .into_iter()
            .filter_map(|c| match c.command {
                MapCommand::FlyTo { center, .. } => Some(center),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_click_adds_place() {
        let map = test_map();
        let mut page = PlacesPage::new();
        page.sync(Some(&map)).unwrap();
        HeadlessMap::emit(&map, &MapEvent::click(LngLat::new(1.0, 2.0)));
        HeadlessMap::emit(&map, &MapEvent::click(LngLat::new(3.0, 4.0)));
        page.sync(Some(&map)).unwrap();

        let coords: Vec<LngLat> = page.places().iter().map(|p| p.coordinates).collect();
        assert_eq!(coords, vec![LngLat::new(1.0, 2.0), LngLat::new(3.0, 4.0)]);
        assert_eq!(lock(&map).marker_count(), 2);
        assert!(fly_targets(&map).is_empty());
    }

    #[test]
    fn test_select_flies_to_place() {
        let map = test_map();
        let mut page = PlacesPage::new();
        let id = page.add(LngLat::new(5.0, 6.0));
        assert!(page.select(id));
        page.sync(Some(&map)).unwrap();
        assert_eq!(fly_targets(&map), vec![[5.0, 6.0]]);
        assert!(!page.select(Uuid::new_v4()));
    }

    #[test]
    fn test_delete_selected_place() {
        let map = test_map();
        let mut page = PlacesPage::new();
        let keep = page.add(LngLat::new(1.0, 1.0));
        let gone = page.add(LngLat::new(2.0, 2.0));
        page.select(gone);
        page.sync(Some(&map)).unwrap();

        assert!(page.delete(gone));
        page.sync(Some(&map)).unwrap();
        assert!(page.selected().is_none());
        assert_eq!(page.places().len(), 1);
        assert_eq!(page.places().iter().next().unwrap().id, keep);
        assert_eq!(lock(&map).marker_count(), 1);
    }
}
