//! Page models: the site's routes and the map state each one drives.
//!
//! A page owns its hooks and its local state. Interaction events reach the
//! state through hook handlers; `sync` then reconciles the state onto the
//! current map.

pub mod mark;
pub mod navigate;
pub mod places;
pub mod subway;
pub mod traffic;

use serde::{Deserialize, Serialize};

use crate::airports::AirportIndex;
use crate::map::{MapOptions, MapWidget, SharedMap};
use crate::types::{LngLat, Result};

pub use mark::MarkPage;
pub use navigate::NavigatePage;
pub use places::PlacesPage;
pub use subway::SubwayPage;
pub use traffic::TrafficPage;

pub const SITE_NAME: &str = "Airspace";
pub const SITE_DESCRIPTION: &str = "An evolving lab for geospatial and autonomous systems UI";

/// Mapbox Standard, used by the pin pages.
pub const STANDARD_STYLE: &str = "mapbox://styles/mapbox/standard";
pub const SUBWAY_STYLE: &str = "mapbox://styles/mapbox/light-v11";
pub const TRAFFIC_STYLE: &str = "mapbox://styles/mapbox/dark-v11";

const SUBWAY_CENTER: LngLat = LngLat::new(-73.92, 40.74);
const TRAFFIC_CENTER: LngLat = LngLat::new(-98.5, 39.8);

/// Airport the pin pages open on.
pub const HOME_AIRPORT: &str = "BOS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Navigate,
    Mark,
    Places,
    Subway,
    Traffic,
}

impl Route {
    /// Navigation order.
    pub const ALL: [Route; 5] = [
        Route::Navigate,
        Route::Mark,
        Route::Places,
        Route::Subway,
        Route::Traffic,
    ];

    /// Resolve a request path. A trailing slash is ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL.into_iter().find(|r| r.path() == path)
    }

    /// Resolve the short name used under `/api/scenes/`.
    pub fn from_slug(slug: &str) -> Option<Route> {
        Route::ALL.into_iter().find(|r| r.slug() == slug)
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Navigate => "/",
            Route::Mark => "/mark",
            Route::Places => "/mark-places",
            Route::Subway => "/nyc-subway-stops",
            Route::Traffic => "/traffic-monitor",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Route::Navigate => "navigate",
            Route::Mark => "mark",
            Route::Places => "places",
            Route::Subway => "subway",
            Route::Traffic => "traffic",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Navigate => "Navigate",
            Route::Mark => "Mark",
            Route::Places => "Places",
            Route::Subway => "NYC Subway",
            Route::Traffic => "Traffic Monitor",
        }
    }

    /// Construction options for this page's map. A configured `style`
    /// replaces the page's own.
    pub fn map_options(self, airports: &AirportIndex, style: Option<&str>) -> MapOptions {
        let home = airports.get(HOME_AIRPORT).map(|a| a.coordinates);
        let mut options = match self {
            Route::Navigate => MapOptions::new(STANDARD_STYLE).zoom(14.0),
            Route::Mark | Route::Places => MapOptions::new(STANDARD_STYLE).zoom(12.0),
            Route::Subway => MapOptions::new(SUBWAY_STYLE).center(SUBWAY_CENTER).zoom(11.0),
            Route::Traffic => MapOptions::new(TRAFFIC_STYLE).center(TRAFFIC_CENTER).zoom(3.0),
        };
        if let (Route::Navigate | Route::Mark | Route::Places, Some(center)) = (self, home) {
            options = options.center(center);
        }
        if let Some(style) = style.filter(|s| !s.trim().is_empty()) {
            options.style = style.to_string();
        }
        options
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub path: &'static str,
    pub title: &'static str,
}

pub const NAV_ITEMS: [NavItem; 5] = [
    NavItem { path: "/", title: "Navigate" },
    NavItem { path: "/mark", title: "Mark" },
    NavItem { path: "/mark-places", title: "Places" },
    NavItem { path: "/nyc-subway-stops", title: "NYC Subway" },
    NavItem { path: "/traffic-monitor", title: "Traffic Monitor" },
];

/// Copy for unknown paths.
pub struct NotFound;

impl NotFound {
    pub const CODE: &'static str = "NAV: WAYPOINT_NOT_FOUND";
    pub const TITLE: &'static str = "404 - Off course";
    pub const MESSAGE: &'static str = "No flight plan for this heading. The waypoint you're looking for \
         isn't in the system. Return to base and pick a known route.";
    pub const ACTION: &'static str = "Return to base";
}

/// One mounted page, whichever route it is.
pub enum Page<W: MapWidget> {
    Navigate(NavigatePage),
    Mark(MarkPage<W>),
    Places(PlacesPage<W>),
    Subway(SubwayPage<W>),
    Traffic(TrafficPage<W>),
}

impl<W: MapWidget> Page<W> {
    pub fn route(&self) -> Route {
        match self {
            Page::Navigate(_) => Route::Navigate,
            Page::Mark(_) => Route::Mark,
            Page::Places(_) => Route::Places,
            Page::Subway(_) => Route::Subway,
            Page::Traffic(_) => Route::Traffic,
        }
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        match self {
            Page::Navigate(page) => page.sync(map),
            Page::Mark(page) => page.sync(map),
            Page::Places(page) => page.sync(map),
            Page::Subway(page) => page.sync(map),
            Page::Traffic(page) => page.sync(map),
        }
    }

    pub fn as_navigate_mut(&mut self) -> Option<&mut NavigatePage> {
        match self {
            Page::Navigate(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_mark(&self) -> Option<&MarkPage<W>> {
        match self {
            Page::Mark(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_places(&self) -> Option<&PlacesPage<W>> {
        match self {
            Page::Places(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_subway(&self) -> Option<&SubwayPage<W>> {
        match self {
            Page::Subway(page) => Some(page),
            _ => None,
        }
    }

    pub fn as_traffic_mut(&mut self) -> Option<&mut TrafficPage<W>> {
        match self {
            Page::Traffic(page) => Some(page),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::from_path("/"), Some(Route::Navigate));
        assert_eq!(Route::from_path(""), Some(Route::Navigate));
        assert_eq!(Route::from_path("/mark-places/"), Some(Route::Places));
        assert_eq!(Route::from_path("/traffic-monitor"), Some(Route::Traffic));
        assert_eq!(Route::from_path("/nowhere"), None);
    }

    #[test]
    fn test_nav_items_match_routes() {
        for (item, route) in NAV_ITEMS.iter().zip(Route::ALL) {
            assert_eq!(item.path, route.path());
            assert_eq!(item.title, route.title());
            assert_eq!(Route::from_slug(route.slug()), Some(route));
        }
    }

    #[test]
    fn test_map_options() {
        let airports = AirportIndex::builtin();
        let nav = Route::Navigate.map_options(&airports, None);
        assert_eq!(nav.style, STANDARD_STYLE);
        assert_eq!(nav.zoom, 14.0);
        assert_eq!(nav.center, Some(LngLat::new(-71.011487, 42.356007)));

        let subway = Route::Subway.map_options(&airports, None);
        assert_eq!(subway.center, Some(SUBWAY_CENTER));
        assert_eq!(subway.zoom, 11.0);

        // no home airport, no center
        let empty = AirportIndex::new(Vec::new());
        assert_eq!(Route::Mark.map_options(&empty, None).center, None);
    }

    #[test]
    fn test_configured_style_overrides_page_style() {
        let airports = AirportIndex::builtin();
        let style = "mapbox://styles/mapbox/satellite-v9";
        for route in Route::ALL {
            let options = route.map_options(&airports, Some(style));
            assert_eq!(options.style, style);
            assert_eq!(options.zoom, route.map_options(&airports, None).zoom);
        }
        assert_eq!(Route::Traffic.map_options(&airports, Some(" ")).style, TRAFFIC_STYLE);
    }
}
