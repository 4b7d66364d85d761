//! Server-side map scenes.
//!
//! A scene pairs one page model with the headless map that mirrors the
//! browser's Mapbox GL instance. The browser shim mounts a scene, reports
//! style load, forwards interaction events, and polls the command log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use geojson::FeatureCollection;
use serde::Serialize;
use tracing::{debug, info};

use airspace_core::airports::AirportIndex;
use airspace_core::map::{lock, HeadlessMap, MapEvent, MapProvider, MapStatus, Sequenced};
use airspace_core::pages::{MarkPage, NavigatePage, Page, PlacesPage, Route, SubwayPage, TrafficPage};
use airspace_core::types::Result;

/// Reference data every scene is built from.
pub struct SceneData {
    pub airports: Arc<AirportIndex>,
    /// Configured map style; pages use their own when unset.
    pub style: Option<String>,
    pub routes: std::result::Result<FeatureCollection, String>,
    pub stops: std::result::Result<FeatureCollection, String>,
}

impl SceneData {
    pub fn page(&self, route: Route) -> Page<HeadlessMap> {
        match route {
            Route::Navigate => Page::Navigate(NavigatePage::new(&self.airports)),
            Route::Mark => Page::Mark(MarkPage::new()),
            Route::Places => Page::Places(PlacesPage::new()),
            Route::Subway => Page::Subway(SubwayPage::new(self.routes.clone(), self.stops.clone())),
            Route::Traffic => Page::Traffic(TrafficPage::new(Arc::clone(&self.airports))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subscription {
    pub event: String,
    pub layer: Option<String>,
}

/// What the shim receives on every poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub page: Route,
    /// `None` until the browser mounts the page.
    pub status: Option<MapStatus>,
    /// Replaces the map viewport when set.
    pub fallback: Option<String>,
    /// Banner over a still-mounted map.
    pub runtime_error: Option<String>,
    pub last_seq: u64,
    pub commands: Vec<Sequenced>,
    pub subscriptions: Vec<Subscription>,
}

pub struct Scene {
    route: Route,
    provider: Option<MapProvider<HeadlessMap>>,
    page: Page<HeadlessMap>,
}

impl Scene {
    pub fn new(page: Page<HeadlessMap>) -> Self {
        Scene {
            route: page.route(),
            provider: None,
            page,
        }
    }

    /// Mount a fresh map for this page. A blank token leaves the scene in
    /// the missing-token state.
    pub fn mount(page: Page<HeadlessMap>, token: Option<&str>, data: &SceneData) -> Self {
        let route = page.route();
        let options = route.map_options(&data.airports, data.style.as_deref());
        let provider = MapProvider::mount(token, options, |init| {
            Ok(HeadlessMap::new(init))
        });
        info!(page = route.slug(), status = ?provider.status(), "scene mounted");
        Scene {
            route,
            provider: Some(provider),
            page,
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn page(&self) -> &Page<HeadlessMap> {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut Page<HeadlessMap> {
        &mut self.page
    }

    pub fn provider(&self) -> Option<&MapProvider<HeadlessMap>> {
        self.provider.as_ref()
    }

    /// Reconcile the page onto the ready map, if any.
    pub fn sync(&mut self) -> Result<()> {
        let map = self.provider.as_ref().and_then(MapProvider::map);
        self.page.sync(map)
    }

    pub fn style_loaded(&mut self) -> Result<()> {
        if let Some(provider) = self.provider.as_mut() {
            provider.style_loaded()?;
        }
        self.sync()
    }

    /// Deliver an event from the browser and reconcile. Returns how many
    /// listeners ran.
    pub fn dispatch(&mut self, event: &MapEvent) -> Result<usize> {
        let fired = match self.provider.as_ref().and_then(MapProvider::map) {
            Some(map) => HeadlessMap::emit(map, event),
            None => 0,
        };
        debug!(page = self.route.slug(), event = %event.kind, fired, "map event");
        self.sync()?;
        Ok(fired)
    }

    pub fn report_error(&mut self, message: &str) {
        if let Some(provider) = self.provider.as_mut() {
            provider.report_error(message);
        }
    }

    pub fn container_resized(&mut self, now: Instant) {
        if let Some(provider) = self.provider.as_mut() {
            provider.container_resized(now);
        }
    }

    /// Flush a due resize, reconcile, and read the log after `since`.
    pub fn view(&mut self, since: u64, now: Instant) -> Result<SceneView> {
        if let Some(provider) = self.provider.as_mut() {
            provider.poll_resize(now)?;
        }
        self.sync()?;

        let Some(provider) = self.provider.as_ref() else {
            return Ok(SceneView {
                page: self.route,
                status: None,
                fallback: None,
                runtime_error: None,
                last_seq: 0,
                commands: Vec::new(),
                subscriptions: Vec::new(),
            });
        };

        let (last_seq, commands, subscriptions) = match provider.widget() {
            Some(map) => {
                let widget = lock(map);
                let subscriptions = widget
                    .subscriptions()
                    .into_iter()
                    .map(|(event, layer)| Subscription { event, layer })
                    .collect();
                (widget.last_seq(), widget.commands_since(since), subscriptions)
            }
            None => (0, Vec::new(), Vec::new()),
        };

        Ok(SceneView {
            page: self.route,
            status: Some(provider.status().clone()),
            fallback: provider.fallback_message(),
            runtime_error: provider.runtime_error().map(str::to_string),
            last_seq,
            commands,
            subscriptions,
        })
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        // hooks detach before the provider removes the widget
        if let Err(e) = self.page.sync(None) {
            debug!(page = self.route.slug(), error = %e, "scene teardown");
        }
    }
}

/// One scene per route. Pages are created on first use and replaced on
/// every mount.
pub struct Scenes {
    data: SceneData,
    token: Option<String>,
    scenes: Mutex<HashMap<Route, Scene>>,
}

impl Scenes {
    pub fn new(data: SceneData, token: Option<String>) -> Self {
        Scenes {
            data,
            token,
            scenes: Mutex::new(HashMap::new()),
        }
    }

    pub fn data(&self) -> &SceneData {
        &self.data
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<Route, Scene>> {
        self.scenes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the route's scene with a freshly mounted one.
    pub fn mount(&self, route: Route) -> Result<SceneView> {
        let mut scene = Scene::mount(self.data.page(route), self.token(), &self.data);
        let view = scene.view(0, Instant::now());
        self.guard().insert(route, scene);
        view
    }

    /// Run `f` on the route's scene, creating an unmounted one if needed.
    pub fn with<R>(&self, route: Route, f: impl FnOnce(&mut Scene) -> R) -> R {
        let mut scenes = self.guard();
        let scene = scenes
            .entry(route)
            .or_insert_with(|| Scene::new(self.data.page(route)));
        f(scene)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use airspace_core::geo::empty_collection;
    use airspace_core::map::MapCommand;
    use airspace_core::types::LngLat;
    use std::time::Duration;

    fn data() -> SceneData {
        SceneData {
            airports: Arc::new(AirportIndex::builtin()),
            style: None,
            routes: Ok(empty_collection()),
            stops: Err("Failed to load stops: 404".into()),
        }
    }

    #[test]
    fn test_missing_token_view() {
        let scenes = Scenes::new(data(), None);
        let view = scenes.mount(Route::Mark).unwrap();
        assert_eq!(view.status, Some(MapStatus::MissingToken));
        assert_eq!(view.fallback.as_deref(), Some("MAPBOX_TOKEN is not set"));
        assert!(view.commands.is_empty());
    }

    #[test]
    fn test_mount_load_and_click() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        let view = scenes.mount(Route::Mark).unwrap();
        assert_eq!(view.status, Some(MapStatus::Loading));
        assert_eq!(view.commands[0].command.op_name(), "init");

        scenes.with(Route::Mark, |scene| {
            scene.style_loaded().unwrap();
            let view = scene.view(0, Instant::now()).unwrap();
            assert_eq!(view.status, Some(MapStatus::Ready));
            assert_eq!(
                view.subscriptions,
                vec![Subscription {
                    event: "click".into(),
                    layer: None
                }]
            );

            let fired = scene.dispatch(&MapEvent::click(LngLat::new(-71.0, 42.3))).unwrap();
            assert_eq!(fired, 1);
            let after = scene.view(view.last_seq, Instant::now()).unwrap();
            assert!(matches!(after.commands[0].command, MapCommand::AddMarker { .. }));
        });
    }

    #[test]
    fn test_configured_style_reaches_map_init() {
        let style = "mapbox://styles/mapbox/satellite-v9";
        let scenes = Scenes::new(
            SceneData {
                style: Some(style.into()),
                ..data()
            },
            Some("pk.test".into()),
        );
        let view = scenes.mount(Route::Subway).unwrap();
        let MapCommand::Init { options } = &view.commands[0].command else {
            panic!("first command is {:?}", view.commands[0].command);
        };
        assert_eq!(options.style, style);
    }

    #[test]
    fn test_unmounted_scene_keeps_page_state() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        let at = LngLat::new(1.0, 2.0);
        let id = scenes.with(Route::Places, |scene| scene.page().as_places().unwrap().add(at));
        let view = scenes.with(Route::Places, |scene| scene.view(0, Instant::now()).unwrap());
        assert_eq!(view.status, None);
        let places = scenes.with(Route::Places, |scene| scene.page().as_places().unwrap().places());
        assert_eq!(places.get(id).unwrap().coordinates, at);
    }

    #[test]
    fn test_subway_load_error_reaches_page() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        scenes.mount(Route::Subway).unwrap();
        let message = scenes.with(Route::Subway, |scene| {
            scene.page().as_subway().unwrap().load_error().map(str::to_string)
        });
        assert_eq!(message.as_deref(), Some("Failed to load stops: 404"));
    }

    #[test]
    fn test_resize_is_debounced() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        scenes.mount(Route::Navigate).unwrap();
        scenes.with(Route::Navigate, |scene| {
            scene.style_loaded().unwrap();
            let t0 = Instant::now();
            scene.container_resized(t0);
            let view = scene.view(0, t0).unwrap();
            assert!(!view.commands.iter().any(|c| c.command == MapCommand::Resize));

            let view = scene.view(0, t0 + Duration::from_millis(250)).unwrap();
            assert!(view.commands.iter().any(|c| c.command == MapCommand::Resize));
        });
    }

    #[test]
    fn test_remount_replaces_widget() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        scenes.mount(Route::Mark).unwrap();
        let first = scenes.with(Route::Mark, |scene| {
            scene.style_loaded().unwrap();
            Arc::clone(scene.provider().unwrap().map().unwrap())
        });
        scenes.mount(Route::Mark).unwrap();
        assert!(lock(&first).is_removed());
    }

    #[test]
    fn test_runtime_error_keeps_map() {
        let scenes = Scenes::new(data(), Some("pk.test".into()));
        scenes.mount(Route::Mark).unwrap();
        scenes.with(Route::Mark, |scene| {
            scene.style_loaded().unwrap();
            scene.report_error("tile 503");
            let view = scene.view(0, Instant::now()).unwrap();
            assert_eq!(view.status, Some(MapStatus::Ready));
            assert_eq!(view.runtime_error.as_deref(), Some("tile 503"));
            assert_eq!(view.fallback, None);
        });
    }
}
