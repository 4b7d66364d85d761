//! REST API route handlers.
//!
//! Page state lives in the route's scene; every mutation is followed by a
//! scene sync so the next command poll carries the map changes. Errors are
//! returned as `{"error": "..."}`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use airspace_core::airports::label;
use airspace_core::map::MapEvent;
use airspace_core::pages::Route;
use airspace_core::types::AirspaceError;

use crate::web::scene::Scene;
use crate::web::AppState;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, message)
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ApiError::new(StatusCode::BAD_REQUEST, message)
    }

    fn page_mismatch(route: Route) -> Self {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("scene '{}' holds another page", route.slug()),
        )
    }
}

impl From<AirspaceError> for ApiError {
    fn from(e: AirspaceError) -> Self {
        let status = match &e {
            AirspaceError::UnknownAirport(_) => StatusCode::NOT_FOUND,
            AirspaceError::InvalidRadius(_) => StatusCode::BAD_REQUEST,
            AirspaceError::Map(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct SearchParams {
    q: Option<String>,
}

#[derive(Deserialize)]
pub struct SelectionBody {
    airport: String,
    radius_miles: Option<u32>,
}

#[derive(Deserialize)]
pub struct NavigateBody {
    id: String,
}

#[derive(Deserialize)]
pub struct ErrorBody {
    message: String,
}

#[derive(Deserialize)]
pub struct SinceParams {
    since: Option<u64>,
}

fn scene_route(slug: &str) -> Result<Route, ApiError> {
    Route::from_slug(slug).ok_or_else(|| ApiError::not_found(format!("unknown page: {slug}")))
}

fn parse_place_id(id: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request(format!("invalid place id: {id}")))
}

// ---------------------------------------------------------------------------
// Airports
// ---------------------------------------------------------------------------

/// GET /api/airports?q=: typeahead.
pub async fn api_airports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Json<Value> {
    let query = params.q.unwrap_or_default();
    let results: Vec<Value> = state
        .airports
        .search(&query)
        .into_iter()
        .map(|a| {
            json!({
                "id": a.id,
                "name": a.name,
                "municipality": a.municipality,
                "iso_country": a.iso_country,
                "coordinates": a.coordinates,
                "label": label(a),
            })
        })
        .collect();
    Json(json!(results))
}

/// GET /api/airports/:id
pub async fn api_airport_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let airport = state.airports.require(&id.to_uppercase())?;
    Ok(Json(json!(airport)))
}

// ---------------------------------------------------------------------------
// Traffic
// ---------------------------------------------------------------------------

fn traffic_view(state: &AppState, scene: &mut Scene) -> Result<Value, ApiError> {
    let snapshot = state.poller.snapshot();
    let page = scene
        .page_mut()
        .as_traffic_mut()
        .ok_or_else(|| ApiError::page_mismatch(Route::Traffic))?;
    page.update(snapshot.clone());
    let sidebar = page.sidebar();
    let bbox = page.bounding_box();
    scene.sync()?;
    Ok(json!({
        "bbox": bbox,
        "sidebar": sidebar,
        "snapshot": snapshot,
    }))
}

/// GET /api/traffic: monitor snapshot plus the rendered sidebar.
pub async fn api_traffic(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let view = state
        .scenes
        .with(Route::Traffic, |scene| traffic_view(&state, scene))?;
    Ok(Json(view))
}

/// POST /api/traffic/selection: pick an airport (and optionally a radius).
pub async fn api_traffic_select(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SelectionBody>,
) -> ApiResult<Value> {
    let view = state.scenes.with(Route::Traffic, |scene| {
        let page = scene
            .page_mut()
            .as_traffic_mut()
            .ok_or_else(|| ApiError::page_mismatch(Route::Traffic))?;
        let bbox = page.select(&body.airport, body.radius_miles)?;
        state.poller.select(bbox);
        traffic_view(&state, scene)
    })?;
    Ok(Json(view))
}

/// DELETE /api/traffic/selection: clear the airport and stop polling.
pub async fn api_traffic_clear(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let view = state.scenes.with(Route::Traffic, |scene| {
        let page = scene
            .page_mut()
            .as_traffic_mut()
            .ok_or_else(|| ApiError::page_mismatch(Route::Traffic))?;
        page.select_airport(None)?;
        state.poller.select(None);
        traffic_view(&state, scene)
    })?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

/// GET /api/places
pub async fn api_places(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let places = state.scenes.with(Route::Places, |scene| {
        scene
            .page()
            .as_places()
            .map(|page| page.places())
            .ok_or_else(|| ApiError::page_mismatch(Route::Places))
    })?;
    Ok(Json(json!(places)))
}

/// POST /api/places/:id/select: select and fly to a place.
pub async fn api_places_select(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_place_id(&id)?;
    let places = state.scenes.with(Route::Places, |scene| {
        let page = scene
            .page()
            .as_places()
            .ok_or_else(|| ApiError::page_mismatch(Route::Places))?;
        if !page.select(id) {
            return Err(ApiError::not_found(format!("no place {id}")));
        }
        let places = page.places();
        scene.sync()?;
        Ok(places)
    })?;
    Ok(Json(json!(places)))
}

/// DELETE /api/places/:id
pub async fn api_places_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    let id = parse_place_id(&id)?;
    let places = state.scenes.with(Route::Places, |scene| {
        let page = scene
            .page()
            .as_places()
            .ok_or_else(|| ApiError::page_mismatch(Route::Places))?;
        if !page.delete(id) {
            return Err(ApiError::not_found(format!("no place {id}")));
        }
        let places = page.places();
        scene.sync()?;
        Ok(places)
    })?;
    Ok(Json(json!(places)))
}

// ---------------------------------------------------------------------------
// Stations
// ---------------------------------------------------------------------------

/// GET /api/stations: parsed stops, the selection and any load error.
pub async fn api_stations(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let view = state.scenes.with(Route::Subway, |scene| {
        let page = scene
            .page()
            .as_subway()
            .ok_or_else(|| ApiError::page_mismatch(Route::Subway))?;
        Ok::<_, ApiError>(json!({
            "stations": page.stations(),
            "selected": page.selected_station(),
            "load_error": page.load_error(),
        }))
    })?;
    Ok(Json(view))
}

// ---------------------------------------------------------------------------
// Navigate
// ---------------------------------------------------------------------------

/// GET /api/navigate: button airports and the current pick.
pub async fn api_navigate(State(state): State<Arc<AppState>>) -> ApiResult<Value> {
    let view = state.scenes.with(Route::Navigate, |scene| {
        let page = scene
            .page_mut()
            .as_navigate_mut()
            .ok_or_else(|| ApiError::page_mismatch(Route::Navigate))?;
        Ok::<_, ApiError>(json!({
            "buttons": page.buttons(),
            "selected": page.selected(),
        }))
    })?;
    Ok(Json(view))
}

/// POST /api/navigate: fly to one of the button airports.
pub async fn api_navigate_select(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NavigateBody>,
) -> ApiResult<Value> {
    let airport = state.scenes.with(Route::Navigate, |scene| {
        let page = scene
            .page_mut()
            .as_navigate_mut()
            .ok_or_else(|| ApiError::page_mismatch(Route::Navigate))?;
        let airport = page.select(&body.id)?.clone();
        scene.sync()?;
        Ok::<_, ApiError>(airport)
    })?;
    Ok(Json(json!(airport)))
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// POST /api/scenes/:page/mount: fresh page state and a new map.
pub async fn api_scene_mount(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Value> {
    let route = scene_route(&slug)?;
    if route == Route::Traffic {
        state.poller.select(None);
    }
    let view = state.scenes.mount(route)?;
    Ok(Json(json!({
        "accessToken": state.scenes.token(),
        "view": view,
    })))
}

/// POST /api/scenes/:page/loaded: the browser map fired `load`.
pub async fn api_scene_loaded(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let route = scene_route(&slug)?;
    state.scenes.with(route, Scene::style_loaded)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/scenes/:page/events: an interaction event from the browser.
pub async fn api_scene_events(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(event): Json<MapEvent>,
) -> ApiResult<Value> {
    let route = scene_route(&slug)?;
    let fired = state.scenes.with(route, |scene| scene.dispatch(&event))?;
    Ok(Json(json!({ "fired": fired })))
}

/// POST /api/scenes/:page/error: a runtime error event from the widget.
pub async fn api_scene_error(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(body): Json<ErrorBody>,
) -> Result<StatusCode, ApiError> {
    let route = scene_route(&slug)?;
    state.scenes.with(route, |scene| scene.report_error(&body.message));
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/scenes/:page/resize: the map container changed size.
pub async fn api_scene_resize(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<StatusCode, ApiError> {
    let route = scene_route(&slug)?;
    state
        .scenes
        .with(route, |scene| scene.container_resized(Instant::now()));
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/scenes/:page/commands?since=N: the command log after `since`.
pub async fn api_scene_commands(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(params): Query<SinceParams>,
) -> ApiResult<Value> {
    let route = scene_route(&slug)?;
    let since = params.since.unwrap_or(0);
    let view = state.scenes.with(route, |scene| {
        if let Some(page) = scene.page_mut().as_traffic_mut() {
            page.update(state.poller.snapshot());
        }
        scene.view(since, Instant::now())
    })?;
    Ok(Json(json!(view)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use airspace_core::airports::AirportIndex;
    use airspace_core::geo::{empty_collection, BoundingBox};
    use airspace_core::opensky::StatesResponse;

    use crate::opensky::{TrafficError, TrafficSource};
    use crate::poller::TrafficPoller;
    use crate::web::scene::SceneData;

    struct EmptySky;

    #[async_trait::async_trait]
    impl TrafficSource for EmptySky {
        async fn fetch_states(&self, _bbox: &BoundingBox) -> Result<StatesResponse, TrafficError> {
            Ok(StatesResponse {
                time: 1_700_000_000,
                states: None,
            })
        }
    }

    fn test_state(token: Option<&str>) -> Arc<AppState> {
        let data = SceneData {
            airports: Arc::new(AirportIndex::builtin()),
            style: None,
            routes: Ok(empty_collection()),
            stops: Ok(empty_collection()),
        };
        let poller = TrafficPoller::new(Arc::new(EmptySky), Duration::from_secs(60));
        Arc::new(AppState::new(data, token.map(str::to_string), poller))
    }

    async fn send(state: &Arc<AppState>, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let app = crate::web::build_router(state.clone());
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_api_airports_search() {
        let state = test_state(None);
        let (status, json) = send(&state, "GET", "/api/airports?q=bos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["id"], "BOS");
        assert_eq!(json[0]["label"], "BOS - Boston Logan Airport");
    }

    #[tokio::test]
    async fn test_api_airport_detail() {
        let state = test_state(None);
        let (status, json) = send(&state, "GET", "/api/airports/lhr", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["municipality"], "London");

        let (status, json) = send(&state, "GET", "/api/airports/XXX", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "unknown airport: XXX");
    }

    #[tokio::test]
    async fn test_api_traffic_select_and_clear() {
        let state = test_state(None);
        let (status, json) = send(&state, "GET", "/api/traffic", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["bbox"].is_null());
        assert_eq!(json["sidebar"]["summary"]["headline"], "Flights");

        let (status, json) = send(
            &state,
            "POST",
            "/api/traffic/selection",
            Some(json!({ "airport": "bos", "radius_miles": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sidebar"]["airport"]["id"], "BOS");
        assert_eq!(json["sidebar"]["radius_miles"], 10);
        assert!(json["bbox"]["west"].as_f64().unwrap() < -71.0);
        assert!(state.poller.is_polling());

        let (status, json) = send(&state, "DELETE", "/api/traffic/selection", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["bbox"].is_null());
        assert!(json["snapshot"]["aircraft"].as_array().unwrap().is_empty());
        assert!(!state.poller.is_polling());
    }

    #[tokio::test]
    async fn test_api_traffic_rejects_bad_radius() {
        let state = test_state(None);
        let (status, json) = send(
            &state,
            "POST",
            "/api/traffic/selection",
            Some(json!({ "airport": "BOS", "radius_miles": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "unsupported search radius: 30 mi");
        assert!(!state.poller.is_polling());
    }

    #[tokio::test]
    async fn test_api_traffic_failed_select_keeps_selection() {
        let state = test_state(None);
        let (_, selected) = send(
            &state,
            "POST",
            "/api/traffic/selection",
            Some(json!({ "airport": "BOS", "radius_miles": 25 })),
        )
        .await;

        let (status, json) = send(
            &state,
            "POST",
            "/api/traffic/selection",
            Some(json!({ "airport": "XXX", "radius_miles": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].is_string());

        let (status, json) = send(&state, "GET", "/api/traffic", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["bbox"], selected["bbox"]);
        assert_eq!(json["sidebar"]["radius_miles"], 25);
        assert_eq!(json["sidebar"]["airport"]["id"], "BOS");
        assert!(state.poller.is_polling());
    }

    #[tokio::test]
    async fn test_api_places_flow() {
        let state = test_state(Some("pk.test"));
        send(&state, "POST", "/api/scenes/places/mount", None).await;
        let (status, _) = send(&state, "POST", "/api/scenes/places/loaded", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let click = json!({ "type": "click", "lngLat": { "lng": -71.05, "lat": 42.36 } });
        let (_, json) = send(&state, "POST", "/api/scenes/places/events", Some(click)).await;
        assert_eq!(json["fired"], 1);

        let (_, json) = send(&state, "GET", "/api/places", None).await;
        let id = json["places"][0]["id"].as_str().unwrap().to_string();

        let (status, json) = send(&state, "POST", &format!("/api/places/{id}/select"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["selected"], id.as_str());

        let (_, view) = send(&state, "GET", "/api/scenes/places/commands?since=0", None).await;
        let ops: Vec<&str> = view["commands"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["op"].as_str().unwrap())
            .collect();
        assert!(ops.contains(&"addMarker"));
        assert!(ops.contains(&"flyTo"));

        let (status, json) = send(&state, "DELETE", &format!("/api/places/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["places"].as_array().unwrap().is_empty());
        assert!(json["selected"].is_null());

        let (status, _) = send(&state, "DELETE", &format!("/api/places/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, "DELETE", "/api/places/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_api_navigate() {
        let state = test_state(None);
        let (_, json) = send(&state, "GET", "/api/navigate", None).await;
        assert_eq!(json["buttons"].as_array().unwrap().len(), 9);

        let (status, json) = send(&state, "POST", "/api/navigate", Some(json!({ "id": "hnd" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], "HND");

        let (status, _) = send(&state, "POST", "/api/navigate", Some(json!({ "id": "ATL" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_api_stations() {
        let state = test_state(None);
        let (status, json) = send(&state, "GET", "/api/stations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["stations"].as_array().unwrap().is_empty());
        assert!(json["selected"].is_null());
        assert!(json["load_error"].is_null());
    }

    #[tokio::test]
    async fn test_scene_mount_without_token() {
        let state = test_state(None);
        let (status, json) = send(&state, "POST", "/api/scenes/subway/mount", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["accessToken"].is_null());
        assert_eq!(json["view"]["status"]["state"], "missing-token");
        assert_eq!(json["view"]["fallback"], "MAPBOX_TOKEN is not set");
    }

    #[tokio::test]
    async fn test_scene_unknown_page() {
        let state = test_state(None);
        let (status, json) = send(&state, "GET", "/api/scenes/nowhere/commands", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "unknown page: nowhere");
    }

    #[tokio::test]
    async fn test_scene_commands_are_incremental() {
        let state = test_state(Some("pk.test"));
        let (_, mounted) = send(&state, "POST", "/api/scenes/traffic/mount", None).await;
        assert_eq!(mounted["accessToken"], "pk.test");
        assert_eq!(mounted["view"]["commands"][0]["op"], "init");
        send(&state, "POST", "/api/scenes/traffic/loaded", None).await;

        let (_, first) = send(&state, "GET", "/api/scenes/traffic/commands?since=0", None).await;
        let last = first["lastSeq"].as_u64().unwrap();
        assert!(first["commands"].as_array().unwrap().len() > 1);

        let (_, second) = send(
            &state,
            "GET",
            &format!("/api/scenes/traffic/commands?since={last}"),
            None,
        )
        .await;
        assert!(second["commands"].as_array().unwrap().is_empty());
        assert_eq!(second["status"]["state"], "ready");
    }

    #[tokio::test]
    async fn test_pages_and_fallback() {
        let state = test_state(None);
        for (uri, expected) in [
            ("/", StatusCode::OK),
            ("/traffic-monitor", StatusCode::OK),
            ("/static/airspace.js", StatusCode::OK),
            ("/no/such/page", StatusCode::NOT_FOUND),
        ] {
            let app = crate::web::build_router(state.clone());
            let response = app
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), expected, "{uri}");
            let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
                .await
                .unwrap();
            let text = String::from_utf8(body.to_vec()).unwrap();
            if expected == StatusCode::NOT_FOUND {
                assert!(text.contains("NAV: WAYPOINT_NOT_FOUND"));
            }
        }
    }
}
