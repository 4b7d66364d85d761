//! NYC subway routes and stops with stop selection.

use std::sync::{Arc, Mutex};

use geojson::FeatureCollection;
use serde_json::{json, Value};

use crate::map::{
    lock, map_key, LayerKind, LayerSpec, MapEvent, MapEventHook, MapLayer, MapWidget, SharedMap,
};
use crate::stations::{line_color_expression, parse_stations, station_id, Station};
use crate::types::Result;

pub const ROUTES_SOURCE_ID: &str = "subway-routes";
pub const ROUTES_LAYER_ID: &str = "subway-routes-lines";
pub const STOPS_SOURCE_ID: &str = "subway-stops";
pub const STOPS_LAYER_ID: &str = "subway-stops-circle";
pub const HIGHLIGHT_LAYER_ID: &str = "subway-stops-highlight";

/// `cartodb_id` that matches no stop.
pub const NO_SELECTION: i64 = -1;

pub fn highlight_filter(selected: Option<i64>) -> Value {
    json!(["==", ["get", "cartodb_id"], selected.unwrap_or(NO_SELECTION)])
}

/// Route lines colored by `rt_symbol`, 2 px at zoom 10 up to 5 px at 15.
pub fn routes_layers() -> Vec<LayerSpec> {
    vec![LayerSpec::new(ROUTES_LAYER_ID, LayerKind::Line, ROUTES_SOURCE_ID)
        .paint("line-color", line_color_expression())
        .paint(
            "line-width",
            json!(["interpolate", ["linear"], ["zoom"], 10, 2, 15, 5]),
        )]
}

pub fn stops_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec::new(STOPS_LAYER_ID, LayerKind::Circle, STOPS_SOURCE_ID)
            .paint("circle-radius", json!(4))
            .paint("circle-color", json!("#e11d48"))
            .paint("circle-stroke-width", json!(1))
            .paint("circle-stroke-color", json!("#ffffff")),
        LayerSpec::new(HIGHLIGHT_LAYER_ID, LayerKind::Circle, STOPS_SOURCE_ID)
            .filter(highlight_filter(None))
            .paint("circle-radius", json!(8))
            .paint("circle-color", json!("#facc15"))
            .paint("circle-stroke-width", json!(2))
            .paint("circle-stroke-color", json!("#ffffff")),
    ]
}

#[derive(Debug, Default)]
struct Interaction {
    selected: Option<i64>,
    cursor: &'static str,
}

/// The `(map, value)` last written by one reconcile step.
type Applied<T> = Option<(usize, T)>;

pub struct SubwayPage<W: MapWidget> {
    routes: Option<FeatureCollection>,
    stops: Option<FeatureCollection>,
    stations: Vec<Station>,
    load_error: Option<String>,
    state: Arc<Mutex<Interaction>>,
    routes_layer: MapLayer<W>,
    stops_layer: MapLayer<W>,
    deselect: MapEventHook<W>,
    select: MapEventHook<W>,
    hover_in: MapEventHook<W>,
    hover_out: MapEventHook<W>,
    pushed: Option<usize>,
    filter: Applied<Option<i64>>,
    cursor: Applied<&'static str>,
}

impl<W: MapWidget> SubwayPage<W> {
    /// Either collection may have failed to load. One failure is shown
    /// inline (stops first) and the other layer still renders.
    pub fn new(
        routes: std::result::Result<FeatureCollection, String>,
        stops: std::result::Result<FeatureCollection, String>,
    ) -> Self {
        let load_error = stops.as_ref().err().or(routes.as_ref().err()).cloned();
        let routes = routes.ok();
        let stops = stops.ok();
        let stations = stops.as_ref().map(parse_stations).unwrap_or_default();

        let state: Arc<Mutex<Interaction>> = Arc::default();

        let sink = Arc::clone(&state);
        let deselect = MapEventHook::new("click", None, move |event: &MapEvent| {
            if !event.has_features_in(STOPS_LAYER_ID) {
                lock(&sink).selected = None;
            }
        });
        let sink = Arc::clone(&state);
        let select = MapEventHook::new("click", Some(STOPS_LAYER_ID), move |event: &MapEvent| {
            let id = event
                .features
                .first()
                .and_then(|f| station_id(f.properties.get("cartodb_id")));
            if let Some(id) = id {
                lock(&sink).selected = Some(id);
            }
        });
        let sink = Arc::clone(&state);
        let hover_in = MapEventHook::new("mouseenter", Some(STOPS_LAYER_ID), move |_: &MapEvent| {
            lock(&sink).cursor = "pointer";
        });
        let sink = Arc::clone(&state);
        let hover_out = MapEventHook::new("mouseleave", Some(STOPS_LAYER_ID), move |_: &MapEvent| {
            lock(&sink).cursor = "";
        });

        SubwayPage {
            routes,
            stops,
            stations,
            load_error,
            state,
            routes_layer: MapLayer::new(ROUTES_SOURCE_ID, routes_layers()),
            stops_layer: MapLayer::new(STOPS_SOURCE_ID, stops_layers()),
            deselect,
            select,
            hover_in,
            hover_out,
            pushed: None,
            filter: None,
            cursor: None,
        }
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn selected_id(&self) -> Option<i64> {
        lock(&self.state).selected
    }

    /// The selected station, if its id is one of the parsed stations.
    pub fn selected_station(&self) -> Option<&Station> {
        let id = self.selected_id()?;
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn select_station(&self, id: i64) {
        lock(&self.state).selected = Some(id);
    }

    pub fn deselect(&self) {
        lock(&self.state).selected = None;
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        self.routes_layer.sync(map)?;
        self.stops_layer.sync(map)?;
        self.deselect.sync(map)?;
        self.select.sync(map)?;
        self.hover_in.sync(map)?;
        self.hover_out.sync(map)?;

        let Some(map) = map else {
            self.pushed = None;
            self.filter = None;
            self.cursor = None;
            return Ok(());
        };
        let key = map_key(map);

        if self.pushed != Some(key) {
            if let Some(routes) = &self.routes {
                self.routes_layer.set_data(routes)?;
            }
            if let Some(stops) = &self.stops {
                self.stops_layer.set_data(stops)?;
            }
            self.pushed = Some(key);
        }

        let (selected, cursor) = {
            let state = lock(&self.state);
            (state.selected, state.cursor)
        };

        if self.filter != Some((key, selected)) {
            let mut widget = lock(map);
            if widget.has_layer(HIGHLIGHT_LAYER_ID) {
                widget.set_filter(HIGHLIGHT_LAYER_ID, Some(highlight_filter(selected)))?;
            }
            self.filter = Some((key, selected));
        }

        // "" is the renderer default, nothing to undo on a fresh map
        let unchanged = match self.cursor {
            Some(applied) => applied == (key, cursor),
            None => cursor.is_empty(),
        };
        if !unchanged {
            lock(map).set_cursor(cursor)?;
            self.cursor = Some((key, cursor));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
