//! Live traffic around an airport.
//!
//! The page holds the airport and radius selection and renders whatever
//! monitor snapshot it was last handed. Snapshots for another box are
//! ignored, so a late poll result never paints over a newer selection.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::aircraft::{aircraft_to_feature_collection, Aircraft, FlightPhase};
use crate::airports::{Airport, AirportIndex};
use crate::geo::{compute_bounding_box, empty_collection, BoundingBox, DEFAULT_RADIUS_MILES, RADIUS_MILES_VALUES};
use crate::map::{
    map_key, Cluster, FitBounds, FitBoundsOptions, LayerKind, LayerSpec, MapImage, MapLayer, MapWidget,
    Padding, SharedMap, SourceSpec,
};
use crate::traffic::{TrafficSnapshot, TrafficSummary};
use crate::types::{AirspaceError, Result};

pub const SEARCH_AREA_SOURCE_ID: &str = "search-area";
pub const SEARCH_AREA_LAYER_ID: &str = "search-area-fill";
pub const AIRCRAFT_SOURCE_ID: &str = "aircraft";
pub const AIRCRAFT_LAYER_ID: &str = "aircraft-symbols";
pub const AIRCRAFT_CLUSTER_LAYER_ID: &str = "aircraft-clusters";
pub const AIRCRAFT_CLUSTER_COUNT_LAYER_ID: &str = "aircraft-cluster-count";
pub const AIRCRAFT_ICON_ID: &str = "aircraft-icon";
pub const AIRCRAFT_ICON_URL: &str = "/static/airplane.svg";

pub const AIRCRAFT_CLUSTER: Cluster = Cluster {
    radius: 40,
    max_zoom: 11,
};

pub const FIT_PADDING: f64 = 40.0;
pub const FIT_MAX_ZOOM: f64 = 14.0;

const SEARCH_AREA_FILL: &str = "rgba(59, 130, 246, 0.1)";
const SEARCH_AREA_STROKE: &str = "rgba(59, 130, 246, 0.4)";

pub const NO_AIRPORT_MESSAGE: &str = "Select an airport to view traffic";
pub const LOADING_MESSAGE: &str = "Loading…";
pub const EMPTY_MESSAGE: &str = "No aircraft in search area";

pub fn search_area_layers() -> Vec<LayerSpec> {
    vec![LayerSpec::new(SEARCH_AREA_LAYER_ID, LayerKind::Fill, SEARCH_AREA_SOURCE_ID)
        .paint("fill-color", json!(SEARCH_AREA_FILL))
        .paint("fill-opacity", json!(1))
        .paint("fill-outline-color", json!(SEARCH_AREA_STROKE))]
}

/// Cluster bubbles sized and coloured by count with a count label, then
/// airplane icons rotated to each unclustered aircraft's heading.
pub fn aircraft_layers() -> Vec<LayerSpec> {
    let clustered = json!(["has", "point_count"]);
    vec![
        LayerSpec::new(AIRCRAFT_CLUSTER_LAYER_ID, LayerKind::Circle, AIRCRAFT_SOURCE_ID)
            .filter(clustered.clone())
            .paint(
                "circle-color",
                json!(["step", ["get", "point_count"], "#38bdf8", 10, "#f59e0b", 25, "#ef4444"]),
            )
            .paint(
                "circle-radius",
                json!(["step", ["get", "point_count"], 14, 10, 18, 25, 24]),
            )
            .paint("circle-opacity", json!(0.85)),
        LayerSpec::new(AIRCRAFT_CLUSTER_COUNT_LAYER_ID, LayerKind::Symbol, AIRCRAFT_SOURCE_ID)
            .filter(clustered.clone())
            .layout("text-field", json!(["get", "point_count_abbreviated"]))
            .layout("text-size", json!(12))
            .paint("text-color", json!("#0b1220")),
        LayerSpec::new(AIRCRAFT_LAYER_ID, LayerKind::Symbol, AIRCRAFT_SOURCE_ID)
            .filter(json!(["!", clustered]))
            .layout("icon-image", json!(AIRCRAFT_ICON_ID))
        .layout("icon-size", json!(0.5))
        .layout("icon-rotate", json!(["get", "headingDeg"]))
        .layout("icon-allow-overlap", json!(false))
            .layout("icon-ignore-placement", json!(false)),
    ]
}

pub fn fit_options() -> FitBoundsOptions {
    FitBoundsOptions {
        padding: Some(Padding::Uniform(FIT_PADDING)),
        max_zoom: Some(FIT_MAX_ZOOM),
        ..Default::default()
    }
}

/// One aircraft card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftRow {
    pub icao24: String,
    pub callsign: String,
    pub altitude: String,
    pub speed: String,
    pub heading: String,
    pub phase: FlightPhase,
}

impl From<&Aircraft> for AircraftRow {
    fn from(a: &Aircraft) -> Self {
        AircraftRow {
            icao24: a.icao24.clone(),
            callsign: a.callsign.clone(),
            altitude: format!("{} ft", a.altitude_ft.round()),
            speed: format!("{} kts", a.velocity_kts.round()),
            heading: format!("{}°", a.heading_deg.round()),
            phase: a.phase,
        }
    }
}

/// Everything the sidebar renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficSidebar {
    pub airport: Option<Airport>,
    pub radius_miles: u32,
    pub radius_options: [u32; 3],
    pub summary: TrafficSummary,
    /// Shown instead of the list.
    pub message: Option<&'static str>,
    pub aircraft: Vec<AircraftRow>,
}

pub struct TrafficPage<W: MapWidget> {
    airports: Arc<AirportIndex>,
    airport: Option<Airport>,
    radius_miles: u32,
    snapshot: Option<TrafficSnapshot>,
    icon: MapImage<W>,
    search_area: MapLayer<W>,
    aircraft: MapLayer<W>,
    fit: FitBounds,
    area_pushed: Option<(usize, Option<BoundingBox>)>,
    aircraft_pushed: Option<(usize, u64, Option<BoundingBox>)>,
}

impl<W: MapWidget> TrafficPage<W> {
    pub fn new(airports: Arc<AirportIndex>) -> Self {
        TrafficPage {
            airports,
            airport: None,
            radius_miles: DEFAULT_RADIUS_MILES,
            snapshot: None,
            icon: MapImage::new(AIRCRAFT_ICON_ID, AIRCRAFT_ICON_URL),
            search_area: MapLayer::new(SEARCH_AREA_SOURCE_ID, search_area_layers()),
            aircraft: MapLayer::new(AIRCRAFT_SOURCE_ID, aircraft_layers())
                .with_source(SourceSpec::clustered_geojson(AIRCRAFT_CLUSTER)),
            fit: FitBounds::new(),
            area_pushed: None,
            aircraft_pushed: None,
        }
    }

    pub fn airport(&self) -> Option<&Airport> {
        self.airport.as_ref()
    }

    pub fn radius_miles(&self) -> u32 {
        self.radius_miles
    }

    /// Pick an airport, or clear with `None`. Returns the new search box.
    pub fn select_airport(&mut self, id: Option<&str>) -> Result<Option<BoundingBox>> {
        self.airport = match id {
            Some(id) => Some(self.airports.require(&id.to_uppercase())?.clone()),
            None => None,
        };
        Ok(self.bounding_box())
    }

    /// Pick an airport and, optionally, a radius. Nothing changes unless
    /// both are valid.
    pub fn select(&mut self, id: &str, radius_miles: Option<u32>) -> Result<Option<BoundingBox>> {
        let radius_miles = radius_miles.unwrap_or(self.radius_miles);
        if !RADIUS_MILES_VALUES.contains(&radius_miles) {
            return Err(AirspaceError::InvalidRadius(radius_miles));
        }
        let airport = self.airports.require(&id.to_uppercase())?.clone();
        self.airport = Some(airport);
        self.radius_miles = radius_miles;
        Ok(self.bounding_box())
    }

    pub fn set_radius(&mut self, miles: u32) -> Result<Option<BoundingBox>> {
        if !RADIUS_MILES_VALUES.contains(&miles) {
            return Err(AirspaceError::InvalidRadius(miles));
        }
        self.radius_miles = miles;
        Ok(self.bounding_box())
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let airport = self.airport.as_ref()?;
        Some(compute_bounding_box(airport.coordinates, f64::from(self.radius_miles)))
    }

    /// Hand over the latest monitor state.
    pub fn update(&mut self, snapshot: TrafficSnapshot) {
        self.snapshot = Some(snapshot);
    }

    /// The snapshot, when it belongs to the current box.
    fn current(&self) -> Option<&TrafficSnapshot> {
        let bbox = self.bounding_box()?;
        self.snapshot.as_ref().filter(|s| s.bbox == Some(bbox))
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        match self.current() {
            Some(snapshot) => &snapshot.aircraft,
            None => &[],
        }
    }

    pub fn sidebar(&self) -> TrafficSidebar {
        let current = self.current();
        let summary = match current {
            Some(s) => s.summary.clone(),
            None if self.airport.is_some() => TrafficSummary {
                headline: LOADING_MESSAGE.to_string(),
                status: Some("Please standby".to_string()),
            },
            None => TrafficSummary {
                headline: "Flights".to_string(),
                status: None,
            },
        };
        let aircraft = self.aircraft();
        let loading = current.map_or(true, |s| s.loading);
        let message = if self.airport.is_none() {
            Some(NO_AIRPORT_MESSAGE)
        } else if loading && aircraft.is_empty() {
            Some(LOADING_MESSAGE)
        } else if aircraft.is_empty() {
            Some(EMPTY_MESSAGE)
        } else {
            None
        };
        TrafficSidebar {
            airport: self.airport.clone(),
            radius_miles: self.radius_miles,
            radius_options: RADIUS_MILES_VALUES,
            summary,
            message,
            aircraft: aircraft.iter().map(AircraftRow::from).collect(),
        }
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        // icon before the symbol layer that references it
        self.icon.sync(map);
        self.search_area.sync(map)?;
        self.aircraft.sync(map)?;

        let bbox = self.bounding_box();
        self.fit
            .sync(map, bbox.map(|b| b.to_lng_lat_bounds()), &fit_options())?;

        let Some(map) = map else {
            self.area_pushed = None;
            self.aircraft_pushed = None;
            return Ok(());
        };
        let key = map_key(map);

        if self.area_pushed != Some((key, bbox)) {
            let data = bbox.map_or_else(empty_collection, |b| b.to_feature_collection());
            self.search_area.set_data(&data)?;
            self.area_pushed = Some((key, bbox));
        }

        let version = self.current().map_or(0, |s| s.version);
        if self.aircraft_pushed != Some((key, version, bbox)) {
            let data = aircraft_to_feature_collection(self.aircraft());
            self.aircraft.set_data(&data)?;
            self.aircraft_pushed = Some((key, version, bbox));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::sample;
    use crate::map::{lock, test_map, HeadlessMap, MapCommand};
    use crate::traffic::TrafficMonitor;

    fn page() -> TrafficPage<HeadlessMap> {
        TrafficPage::new(Arc::new(AirportIndex::builtin()))
    }

    fn snapshot_for(bbox: BoundingBox, aircraft: Vec<Aircraft>) -> TrafficSnapshot {
        let mut monitor = TrafficMonitor::new();
        monitor.select(Some(bbox));
        let mut snapshot = monitor.snapshot();
        snapshot.aircraft = aircraft;
        snapshot
    }

    fn count(map: &SharedMap<HeadlessMap>, op: &str) -> usize {
        lock(map)
            .commands_since(0)
            .iter()
            .filter(|c| c.command.op_name() == op)
            .count()
    }

    #[test]
    fn test_select_airport_frames_search_area() {
        let map = test_map();
        let mut page = page();
        page.sync(Some(&map)).unwrap();
        assert_eq!(count(&map, "fitBounds"), 0);

        let bbox = page.select_airport(Some("bos")).unwrap().unwrap();
        page.sync(Some(&map)).unwrap();

        let w = lock(&map);
        assert_eq!(
            w.layer_ids(),
            vec![
                SEARCH_AREA_LAYER_ID,
                AIRCRAFT_CLUSTER_LAYER_ID,
                AIRCRAFT_CLUSTER_COUNT_LAYER_ID,
                AIRCRAFT_LAYER_ID
            ]
        );
        assert_eq!(w.image_url(AIRCRAFT_ICON_ID), Some(AIRCRAFT_ICON_URL));
        assert_eq!(
            w.source_data(SEARCH_AREA_SOURCE_ID),
            Some(&bbox.to_feature_collection())
        );
        let fit = w.commands_since(0).into_iter().find_map(|c| match c.command {
            MapCommand::FitBounds { bounds, options } => Some((bounds, options)),
            _ => None,
        });
        assert_eq!(fit, Some((bbox.to_lng_lat_bounds(), fit_options())));
    }

    #[test]
    fn test_aircraft_source_is_clustered() {
        let map = test_map();
        let mut page = page();
        page.sync(Some(&map)).unwrap();

        let w = lock(&map);
        let source = serde_json::to_value(w.source(AIRCRAFT_SOURCE_ID).unwrap()).unwrap();
        assert_eq!(source["type"], "geojson");
        assert_eq!(source["cluster"], true);
        assert_eq!(source["clusterRadius"], 40);
        assert_eq!(source["clusterMaxZoom"], 11);

        let has_count = json!(["has", "point_count"]);
        assert_eq!(w.layer(AIRCRAFT_CLUSTER_LAYER_ID).unwrap().filter, Some(has_count.clone()));
        assert_eq!(
            w.layer(AIRCRAFT_CLUSTER_COUNT_LAYER_ID).unwrap().filter,
            Some(has_count.clone())
        );
        assert_eq!(w.layer(AIRCRAFT_LAYER_ID).unwrap().filter, Some(json!(["!", has_count])));

        let search_area = serde_json::to_value(w.source(SEARCH_AREA_SOURCE_ID).unwrap()).unwrap();
        assert!(search_area.get("cluster").is_none());
    }

    #[test]
    fn test_snapshot_pushed_once_per_version() {
        let map = test_map();
        let mut page = page();
        let bbox = page.select_airport(Some("BOS")).unwrap().unwrap();
        page.update(snapshot_for(bbox, vec![sample("abc123", -71.0, 42.3)]));
        page.sync(Some(&map)).unwrap();
        let seq = lock(&map).last_seq();
        page.sync(Some(&map)).unwrap();
        assert_eq!(lock(&map).last_seq(), seq);

        let w = lock(&map);
        let data = w.source_data(AIRCRAFT_SOURCE_ID).unwrap();
        assert_eq!(data.features.len(), 1);
    }

    #[test]
    fn test_snapshot_for_other_box_ignored() {
        let map = test_map();
        let mut page = page();
        let old = page.select_airport(Some("JFK")).unwrap().unwrap();
        page.select_airport(Some("LAX")).unwrap();
        page.update(snapshot_for(old, vec![sample("abc123", -73.7, 40.6)]));
        page.sync(Some(&map)).unwrap();

        assert!(page.aircraft().is_empty());
        assert!(lock(&map).source_data(AIRCRAFT_SOURCE_ID).unwrap().features.is_empty());
    }

    #[test]
    fn test_clear_selection_blanks_layers() {
        let map = test_map();
        let mut page = page();
        let bbox = page.select_airport(Some("BOS")).unwrap().unwrap();
        page.update(snapshot_for(bbox, vec![sample("abc123", -71.0, 42.3)]));
        page.sync(Some(&map)).unwrap();

        assert_eq!(page.select_airport(None).unwrap(), None);
        page.sync(Some(&map)).unwrap();
        let w = lock(&map);
        assert!(w.source_data(SEARCH_AREA_SOURCE_ID).unwrap().features.is_empty());
        assert!(w.source_data(AIRCRAFT_SOURCE_ID).unwrap().features.is_empty());
    }

    #[test]
    fn test_radius_changes_box() {
        let mut page = page();
        page.select_airport(Some("BOS")).unwrap();
        let wide = page.set_radius(50).unwrap().unwrap();
        let narrow = page.set_radius(10).unwrap().unwrap();
        assert!(wide.north - wide.south > narrow.north - narrow.south);
        assert!(matches!(page.set_radius(30), Err(AirspaceError::InvalidRadius(30))));
        assert_eq!(page.radius_miles(), 10);
    }

    #[test]
    fn test_failed_select_keeps_previous_box() {
        let mut page = page();
        let before = page.select("BOS", Some(25)).unwrap();

        assert!(matches!(
            page.select("XXX", Some(50)),
            Err(AirspaceError::UnknownAirport(_))
        ));
        assert!(matches!(
            page.select("JFK", Some(30)),
            Err(AirspaceError::InvalidRadius(30))
        ));
        assert_eq!(page.radius_miles(), 25);
        assert_eq!(page.airport().unwrap().id, "BOS");
        assert_eq!(page.bounding_box(), before);

        let after = page.select("bos", None).unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn test_unknown_airport() {
        let mut page = page();
        assert!(matches!(
            page.select_airport(Some("ZZZ")),
            Err(AirspaceError::UnknownAirport(_))
        ));
        assert!(page.airport().is_none());
    }

    #[test]
    fn test_sidebar_messages() {
        let mut page = page();
        assert_eq!(page.sidebar().message, Some(NO_AIRPORT_MESSAGE));
        assert_eq!(page.sidebar().summary.headline, "Flights");

        let bbox = page.select_airport(Some("BOS")).unwrap().unwrap();
        assert_eq!(page.sidebar().message, Some(LOADING_MESSAGE));

        page.update(snapshot_for(bbox, Vec::new()));
        assert_eq!(page.sidebar().message, Some(EMPTY_MESSAGE));

        page.update(snapshot_for(bbox, vec![sample("abc123", -71.0, 42.3)]));
        let sidebar = page.sidebar();
        assert_eq!(sidebar.message, None);
        assert_eq!(sidebar.aircraft[0].altitude, "10000 ft");
        assert_eq!(sidebar.aircraft[0].heading, "90°");
    }
}
