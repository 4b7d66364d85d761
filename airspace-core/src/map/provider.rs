//! Map lifecycle: build once, expose after style load, tear down on drop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::widget::{MapWidget, SourceSpec, Terrain};
use super::{lock, SharedMap};
use crate::types::{AirspaceError, LngLat, Result};

pub const DEFAULT_MAP_STYLE: &str = "mapbox://styles/mapbox/outdoors-v12";
pub const DEFAULT_ZOOM: f64 = 12.0;

pub const DEM_SOURCE_ID: &str = "mapbox-dem";
pub const DEM_URL: &str = "mapbox://mapbox.mapbox-terrain-dem-v1";
pub const TERRAIN_EXAGGERATION: f64 = 1.5;

/// Quiet period before a container resize reaches the widget.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(200);

/// Construction-time options. Read once by [`MapProvider::mount`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    pub style: String,
    pub center: Option<LngLat>,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub enable_3d: bool,
    /// Extra constructor options passed through untouched.
    pub extra: Map<String, Value>,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            style: DEFAULT_MAP_STYLE.into(),
            center: None,
            zoom: DEFAULT_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
            enable_3d: false,
            extra: Map::new(),
        }
    }
}

impl MapOptions {
    pub fn new(style: impl Into<String>) -> Self {
        MapOptions {
            style: style.into(),
            ..Default::default()
        }
    }

    pub fn center(mut self, center: LngLat) -> Self {
        self.center = Some(center);
        self
    }

    pub fn zoom(mut self, zoom: f64) -> Self {
        self.zoom = zoom;
        self
    }

    pub fn with_3d(mut self) -> Self {
        self.enable_3d = true;
        self
    }
}

/// What the widget is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapInit {
    pub style: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    /// Always `false`; resizes go through [`MapProvider::container_resized`].
    pub track_resize: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl From<&MapOptions> for MapInit {
    fn from(options: &MapOptions) -> Self {
        let mut extra = options.extra.clone();
        for reserved in ["container", "style", "center", "zoom", "pitch", "bearing", "trackResize"] {
            extra.remove(reserved);
        }
        MapInit {
            style: options.style.clone(),
            center: options.center.map(|c| [c.lng, c.lat]),
            zoom: options.zoom,
            pitch: options.pitch,
            bearing: options.bearing,
            track_resize: false,
            extra,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "kebab-case")]
pub enum MapStatus {
    MissingToken,
    Failed(String),
    Loading,
    Ready,
}

type LoadCallback<W> = Box<dyn FnMut(&SharedMap<W>) + Send>;
type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Owns one widget. Consumers see it through [`map`](Self::map) only once
/// the style has loaded.
pub struct MapProvider<W: MapWidget> {
    status: MapStatus,
    widget: Option<SharedMap<W>>,
    enable_3d: bool,
    runtime_error: Option<String>,
    on_load: Option<LoadCallback<W>>,
    on_error: Option<ErrorCallback>,
    resize_due: Option<Instant>,
}

impl<W: MapWidget> MapProvider<W> {
    /// Build the widget. A missing or blank token skips construction.
    pub fn mount(
        token: Option<&str>,
        options: MapOptions,
        build: impl FnOnce(MapInit) -> Result<W>,
    ) -> Self {
        let mut provider = MapProvider {
            status: MapStatus::Loading,
            widget: None,
            enable_3d: options.enable_3d,
            runtime_error: None,
            on_load: None,
            on_error: None,
            resize_due: None,
        };

        if token.map_or(true, |t| t.trim().is_empty()) {
            provider.status = MapStatus::MissingToken;
            return provider;
        }

        match build(MapInit::from(&options)) {
            Ok(widget) => provider.widget = Some(Arc::new(Mutex::new(widget))),
            Err(e) => {
                warn!(error = %e, "map construction failed");
                provider.status = MapStatus::Failed(e.to_string());
            }
        }
        provider
    }

    pub fn on_load(mut self, callback: impl FnMut(&SharedMap<W>) + Send + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl FnMut(&str) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(callback));
        self
    }

    pub fn status(&self) -> &MapStatus {
        &self.status
    }

    /// The ready map, for hooks.
    pub fn map(&self) -> Option<&SharedMap<W>> {
        match self.status {
            MapStatus::Ready => self.widget.as_ref(),
            _ => None,
        }
    }

    /// The constructed widget, ready or not.
    pub fn widget(&self) -> Option<&SharedMap<W>> {
        self.widget.as_ref()
    }

    /// The widget finished loading its style.
    pub fn style_loaded(&mut self) -> Result<()> {
        if self.status != MapStatus::Loading {
            return Ok(());
        }
        let Some(map) = self.widget.clone() else {
            return Ok(());
        };

        if self.enable_3d {
            if let Err(e) = Self::enable_terrain(&map) {
                self.status = MapStatus::Failed(e.to_string());
                return Err(e);
            }
        }

        self.status = MapStatus::Ready;
        self.runtime_error = None;
        info!(terrain = self.enable_3d, "map ready");
        if let Some(callback) = self.on_load.as_mut() {
            callback(&map);
        }
        Ok(())
    }

    fn enable_terrain(map: &SharedMap<W>) -> Result<()> {
        let mut widget = lock(map);
        if !widget.has_source(DEM_SOURCE_ID) {
            widget.add_source(
                DEM_SOURCE_ID,
                SourceSpec::RasterDem {
                    url: DEM_URL.into(),
                    tile_size: 512,
                    maxzoom: 14,
                },
            )?;
        }
        widget.set_terrain(Some(Terrain {
            source: DEM_SOURCE_ID.into(),
            exaggeration: TERRAIN_EXAGGERATION,
        }))
    }

    /// A runtime error from the widget. The map stays mounted.
    pub fn report_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(error = %message, "map runtime error");
        if let Some(callback) = self.on_error.as_mut() {
            callback(message.as_str());
        }
        self.runtime_error = Some(message);
    }

    pub fn runtime_error(&self) -> Option<&str> {
        self.runtime_error.as_deref()
    }

    /// Text shown instead of the map when it cannot be displayed.
    pub fn fallback_message(&self) -> Option<String> {
        match &self.status {
            MapStatus::MissingToken => Some(AirspaceError::MissingToken.to_string()),
            MapStatus::Failed(message) => Some(message.clone()),
            MapStatus::Loading | MapStatus::Ready => None,
        }
    }

    /// The container changed size. Restarts the debounce window.
    pub fn container_resized(&mut self, now: Instant) {
        if self.status == MapStatus::Ready {
            self.resize_due = Some(now + RESIZE_DEBOUNCE);
        }
    }

    /// Resize the widget if the debounce window has elapsed.
    pub fn poll_resize(&mut self, now: Instant) -> Result<bool> {
        match self.resize_due {
            Some(due) if due <= now => {
                self.resize_due = None;
                match self.map() {
                    Some(map) => {
                        lock(map).resize()?;
                        Ok(true)
                    }
                    None => Ok(false),
                }
            }
            _ => Ok(false),
        }
    }

    /// Destroy the widget and stop exposing it.
    pub fn unmount(&mut self) {
        self.resize_due = None;
        if let Some(map) = self.widget.take() {
            lock(&map).remove();
            if self.status == MapStatus::Ready {
                self.status = MapStatus::Loading;
            }
        }
    }
}

impl<W: MapWidget> Drop for MapProvider<W> {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
