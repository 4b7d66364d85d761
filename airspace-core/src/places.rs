//! User-dropped places, in insertion order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::LngLat;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub coordinates: LngLat,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaceList {
    places: Vec<Place>,
    selected: Option<Uuid>,
}

impl PlaceList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a place and return its new id.
    pub fn add(&mut self, coordinates: LngLat) -> Uuid {
        let id = Uuid::new_v4();
        self.places.push(Place { id, coordinates });
        id
    }

    /// Remove a place. Clears the selection if it pointed at it.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.places.len();
        self.places.retain(|p| p.id != id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.places.len() != before
    }

    /// Select an existing place. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: Uuid) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn get(&self, id: Uuid) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    pub fn selected(&self) -> Option<&Place> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.places.iter()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}
