//! Map-binding layer.
//!
//! Hooks own one piece of map state each and reconcile it onto whatever
//! widget they are given through `sync(Option<&SharedMap<W>>)`: attach when
//! a map appears, detach when it changes or goes away, detach on drop.

pub mod camera;
pub mod control;
pub mod event;
pub mod headless;
pub mod image;
pub mod layer;
pub mod marker;
pub mod provider;
pub mod widget;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub use camera::{FitBounds, FitBoundsOptions, FlyTo, FlyToOptions, Padding};
pub use control::{
    draw_hook, ControlHook, ControlPosition, DrawControl, MapControl, NavigationControl,
    ScaleControl,
};
pub use event::{Listener, MapEvent, MapEventHook, RenderedFeature};
pub use headless::{HeadlessMap, MapCommand, Sequenced};
pub use image::MapImage;
pub use layer::{LayerKind, LayerSpec, MapLayer};
pub use marker::{MarkerSpec, Markers, DEFAULT_MARKER_COLOR};
pub use provider::{MapInit, MapOptions, MapProvider, MapStatus};
pub use widget::{Cluster, ControlId, ListenerId, MapWidget, MarkerId, SourceSpec, Terrain};

/// A widget shared between its provider and the hooks bound to it.
pub type SharedMap<W> = Arc<Mutex<W>>;

/// Identity of a shared widget. Two handles compare equal iff they point at
/// the same widget.
pub fn map_key<W>(map: &SharedMap<W>) -> usize {
    Arc::as_ptr(map) as *const () as usize
}

/// Lock a widget, recovering the guard if a previous holder panicked.
pub fn lock<W>(map: &SharedMap<W>) -> MutexGuard<'_, W> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
pub(crate) fn test_map() -> SharedMap<HeadlessMap> {
    Arc::new(Mutex::new(HeadlessMap::new(MapInit::from(&MapOptions::default()))))
}
