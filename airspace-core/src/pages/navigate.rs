//! Fly-to-airport navigation.

use crate::airports::{Airport, AirportIndex, NAV_AIRPORT_IDS};
use crate::map::{FlyTo, FlyToOptions, MapWidget, SharedMap};
use crate::types::{AirspaceError, Result};

pub const NAVIGATE_ZOOM: f64 = 14.0;
pub const NAVIGATE_DURATION_MS: u64 = 2000;

pub struct NavigatePage {
    buttons: Vec<Airport>,
    selected: Option<String>,
    fly: FlyTo,
}

impl NavigatePage {
    /// Buttons for the navigation airports the index knows about.
    pub fn new(airports: &AirportIndex) -> Self {
        let buttons = NAV_AIRPORT_IDS
            .iter()
            .filter_map(|id| airports.get(id).cloned())
            .collect();
        NavigatePage {
            buttons,
            selected: None,
            fly: FlyTo::new(),
        }
    }

    pub fn buttons(&self) -> &[Airport] {
        &self.buttons
    }

    pub fn select(&mut self, id: &str) -> Result<&Airport> {
        let airport = self
            .buttons
            .iter()
            .find(|a| a.id.eq_ignore_ascii_case(id))
            .ok_or_else(|| AirspaceError::UnknownAirport(id.to_string()))?;
        self.selected = Some(airport.id.clone());
        Ok(airport)
    }

    pub fn selected(&self) -> Option<&Airport> {
        let id = self.selected.as_ref()?;
        self.buttons.iter().find(|a| a.id == *id)
    }

    pub fn sync<W: MapWidget>(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        let target = self.selected().map(|a| a.coordinates);
        let options = FlyToOptions::zoom_duration(NAVIGATE_ZOOM, NAVIGATE_DURATION_MS);
        self.fly.sync(map, target, &options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{lock, test_map, MapCommand};

    #[test]
    fn test_buttons_in_order() {
        let page = NavigatePage::new(&AirportIndex::builtin());
        let ids: Vec<&str> = page.buttons().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, NAV_AIRPORT_IDS.to_vec());
    }

    #[test]
    fn test_select_flies_once() {
        let map = test_map();
        let mut page = NavigatePage::new(&AirportIndex::builtin());
        page.sync(Some(&map)).unwrap();
        page.select("lhr").unwrap();
        page.sync(Some(&map)).unwrap();
        page.sync(Some(&map)).unwrap();

        let flights: Vec<MapCommand> = lock(&map)
            .commands_since(0)
            .into_iter()
            .map(|c| c.command)
            .filter(|c| matches!(c, MapCommand::FlyTo { .. }))
            .collect();
        assert_eq!(flights.len(), 1);
        let MapCommand::FlyTo { center, options } = &flights[0] else {
            unreachable!()
        };
        assert_eq!(*center, [-0.454295, 51.47002]);
        assert_eq!(options.zoom, Some(14.0));
        assert_eq!(options.duration, Some(2000));
    }

    #[test]
    fn test_unknown_button() {
        let mut page = NavigatePage::new(&AirportIndex::builtin());
        assert!(matches!(page.select("ATL"), Err(AirspaceError::UnknownAirport(_))));
        assert!(page.selected().is_none());
    }
}
