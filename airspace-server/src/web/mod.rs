//! Web server: HTML pages, static shim assets and the JSON API.
//!
//! Shared state holds the airport table, the per-route map scenes and the
//! traffic poller. Handlers never hold a lock across an await.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use geojson::{FeatureCollection, GeoJson};
use http::{header, HeaderValue};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};

use airspace_core::airports::AirportIndex;
use airspace_core::config::Config;

use crate::poller::TrafficPoller;

pub mod pages;
pub mod routes;
pub mod scene;

use scene::{SceneData, Scenes};

const BUNDLED_ROUTES: &str = include_str!("../../data/nyc-subway-routes.geojson");
const BUNDLED_STOPS: &str = include_str!("../../data/nyc-subway-stops.geojson");

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

pub struct AppState {
    pub airports: Arc<AirportIndex>,
    pub scenes: Scenes,
    pub poller: TrafficPoller,
}

impl AppState {
    pub fn new(data: SceneData, token: Option<String>, poller: TrafficPoller) -> Self {
        AppState {
            airports: Arc::clone(&data.airports),
            scenes: Scenes::new(data, token),
            poller,
        }
    }
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

fn parse_collection(text: &str) -> Result<FeatureCollection, String> {
    let geojson = text.parse::<GeoJson>().map_err(|e| e.to_string())?;
    FeatureCollection::try_from(geojson).map_err(|e| e.to_string())
}

/// Read a collection from `path`, or the bundled copy. Failures become the
/// message shown on the page.
fn load_collection(path: Option<&str>, bundled: &str, what: &str) -> Result<FeatureCollection, String> {
    let result = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| parse_collection(&text)),
        None => parse_collection(bundled),
    };
    result.map_err(|e| {
        warn!(what, error = %e, "subway data failed to load");
        format!("Failed to load {what}: {e}")
    })
}

/// Airport table from `path`, or the built-in one.
pub fn load_airports(path: Option<&str>) -> anyhow::Result<AirportIndex> {
    match path {
        Some(path) => AirportIndex::load(Path::new(path))
            .with_context(|| format!("loading airports from {path}")),
        None => Ok(AirportIndex::builtin()),
    }
}

pub fn load_scene_data(config: &Config) -> anyhow::Result<SceneData> {
    let data = &config.data;
    let airports = load_airports(data.airports.as_deref())?;
    info!(airports = airports.len(), "reference data loaded");
    Ok(SceneData {
        airports: Arc::new(airports),
        style: config.map.style.clone(),
        routes: load_collection(data.routes.as_deref(), BUNDLED_ROUTES, "routes"),
        stops: load_collection(data.stations.as_deref(), BUNDLED_STOPS, "stops"),
    })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/api/airports", get(routes::api_airports))
        .route("/api/airports/:id", get(routes::api_airport_detail))
        .route("/api/traffic", get(routes::api_traffic))
        .route(
            "/api/traffic/selection",
            post(routes::api_traffic_select).delete(routes::api_traffic_clear),
        )
        .route("/api/places", get(routes::api_places))
        .route("/api/places/:id", axum::routing::delete(routes::api_places_delete))
        .route("/api/places/:id/select", post(routes::api_places_select))
        .route("/api/stations", get(routes::api_stations))
        .route("/api/navigate", get(routes::api_navigate).post(routes::api_navigate_select))
        .route("/api/scenes/:page/mount", post(routes::api_scene_mount))
        .route("/api/scenes/:page/loaded", post(routes::api_scene_loaded))
        .route("/api/scenes/:page/events", post(routes::api_scene_events))
        .route("/api/scenes/:page/error", post(routes::api_scene_error))
        .route("/api/scenes/:page/resize", post(routes::api_scene_resize))
        .route("/api/scenes/:page/commands", get(routes::api_scene_commands))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    Router::new()
        .route("/", get(pages::page_navigate))
        .route("/mark", get(pages::page_mark))
        .route("/mark-places", get(pages::page_places))
        .route("/nyc-subway-stops", get(pages::page_subway))
        .route("/traffic-monitor", get(pages::page_traffic))
        .route("/static/airspace.js", get(pages::static_shim))
        .route("/static/airplane.svg", get(pages::static_airplane))
        .merge(api)
        .fallback(pages::page_not_found)
        .with_state(state)
        .layer(cors)
}

/// Start the web server.
pub async fn serve(config: &Config, token: Option<String>, poller: TrafficPoller) -> anyhow::Result<()> {
    if token.is_none() {
        warn!("no Mapbox token configured; pages will show the missing-token banner");
    }
    let data = load_scene_data(config)?;
    let state = Arc::new(AppState::new(data, token, poller));

    let app = build_router(state);
    let addr = format!("{}:{}", config.dashboard.host, config.dashboard.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Airspace listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
