//! Map controls and the control-attachment hook.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::widget::{ControlId, MapWidget};
use super::{lock, map_key, SharedMap};
use crate::types::Result;

/// Map corner a control is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// A control the renderer knows how to build from a kind and options.
pub trait MapControl: Send + Sync + 'static {
    fn kind(&self) -> &'static str;

    fn options(&self) -> Value {
        json!({})
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationControl {
    pub show_compass: bool,
    pub show_zoom: bool,
    pub visualize_pitch: bool,
}

impl Default for NavigationControl {
    fn default() -> Self {
        NavigationControl {
            show_compass: true,
            show_zoom: true,
            visualize_pitch: false,
        }
    }
}

impl MapControl for NavigationControl {
    fn kind(&self) -> &'static str {
        "navigation"
    }

    fn options(&self) -> Value {
        json!({
            "showCompass": self.show_compass,
            "showZoom": self.show_zoom,
            "visualizePitch": self.visualize_pitch,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleControl {
    pub max_width: u32,
    pub unit: &'static str,
}

impl Default for ScaleControl {
    fn default() -> Self {
        ScaleControl {
            max_width: 100,
            unit: "imperial",
        }
    }
}

impl MapControl for ScaleControl {
    fn kind(&self) -> &'static str {
        "scale"
    }

    fn options(&self) -> Value {
        json!({ "maxWidth": self.max_width, "unit": self.unit })
    }
}

/// Interactive geometry editing (mapbox-gl-draw). Options pass through as-is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrawControl {
    pub options: Value,
}

impl MapControl for DrawControl {
    fn kind(&self) -> &'static str {
        "draw"
    }

    fn options(&self) -> Value {
        match &self.options {
            Value::Null => json!({}),
            other => other.clone(),
        }
    }
}

type Factory<C> = Box<dyn Fn() -> C + Send>;
type Subscriber = Box<dyn Fn() + Send>;

/// Subscription handle from [`ControlHook::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Adds a freshly built control whenever a map is current and removes it
/// when the map or position changes.
pub struct ControlHook<W: MapWidget, C: MapControl> {
    factory: Factory<C>,
    position: ControlPosition,
    attached: Option<(SharedMap<W>, ControlId)>,
    current: Option<Arc<C>>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl<W: MapWidget, C: MapControl> ControlHook<W, C> {
    pub fn new(factory: impl Fn() -> C + Send + 'static, position: ControlPosition) -> Self {
        ControlHook {
            factory: Box::new(factory),
            position,
            attached: None,
            current: None,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn position(&self) -> ControlPosition {
        self.position
    }

    /// The live control, or `None` while no map is attached.
    pub fn snapshot(&self) -> Option<Arc<C>> {
        self.current.clone()
    }

    pub fn control_id(&self) -> Option<ControlId> {
        self.attached.as_ref().map(|(_, id)| *id)
    }

    /// Called after every attach and detach.
    pub fn subscribe(&mut self, listener: impl Fn() + Send + 'static) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(s, _)| *s != id);
        self.subscribers.len() != before
    }

    fn notify(&self) {
        for (_, listener) in &self.subscribers {
            listener();
        }
    }

    pub fn sync(&mut self, map: Option<&SharedMap<W>>) -> Result<()> {
        let current = self.attached.as_ref().map(|(m, _)| map_key(m));
        if current.is_some() && current == map.map(map_key) {
            return Ok(());
        }
        self.detach();
        match map {
            Some(map) => self.attach(map),
            None => Ok(()),
        }
    }

    /// Move the control. Re-adds it on the current map when attached.
    pub fn set_position(&mut self, position: ControlPosition) -> Result<()> {
        if self.position == position {
            return Ok(());
        }
        self.position = position;
        let map = self.attached.as_ref().map(|(m, _)| SharedMap::clone(m));
        self.detach();
        match map {
            Some(map) => self.attach(&map),
            None => Ok(()),
        }
    }

    fn attach(&mut self, map: &SharedMap<W>) -> Result<()> {
        let control = Arc::new((self.factory)());
        let id = lock(map).add_control(control.as_ref(), self.position)?;
        self.attached = Some((SharedMap::clone(map), id));
        self.current = Some(control);
        self.notify();
        Ok(())
    }

    pub fn detach(&mut self) {
        let Some((map, id)) = self.attached.take() else {
            return;
        };
        {
            let mut widget = lock(&map);
            if widget.has_control(id) {
                if let Err(e) = widget.remove_control(id) {
                    debug!(error = %e, "control teardown failed");
                }
            }
        }
        self.current = None;
        self.notify();
    }
}

impl<W: MapWidget, C: MapControl> Drop for ControlHook<W, C> {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Draw control in the top-right corner.
pub fn draw_hook<W: MapWidget>(options: Value) -> ControlHook<W, DrawControl> {
    ControlHook::new(
        move || DrawControl {
            options: options.clone(),
        },
        ControlPosition::TopRight,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::headless::HeadlessMap;
    use crate::map::test_map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_snapshot_follows_attachment() {
        let map = test_map();
        let mut hook: ControlHook<HeadlessMap, NavigationControl> =
            ControlHook::new(NavigationControl::default, ControlPosition::default());
        assert!(hook.snapshot().is_none());

        hook.sync(Some(&map)).unwrap();
        assert!(hook.snapshot().is_some());
        let id = hook.control_id().unwrap();
        assert_eq!(lock(&map).control(id).unwrap().1, ControlPosition::TopRight);

        hook.sync(None).unwrap();
        assert!(hook.snapshot().is_none());
        assert!(!lock(&map).has_control(id));
    }

    #[test]
    fn test_subscribers_notified() {
        let map = test_map();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut hook: ControlHook<HeadlessMap, ScaleControl> =
            ControlHook::new(ScaleControl::default, ControlPosition::BottomLeft);
        let counter = Arc::clone(&hits);
        let sub = hook.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        hook.sync(Some(&map)).unwrap();
        hook.sync(None).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(hook.unsubscribe(sub));
        hook.sync(Some(&map)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_position_change_readds() {
        let map = test_map();
        let mut hook: ControlHook<HeadlessMap, NavigationControl> =
            ControlHook::new(NavigationControl::default, ControlPosition::TopRight);
        hook.sync(Some(&map)).unwrap();
        let first = hook.control_id().unwrap();

        hook.set_position(ControlPosition::BottomRight).unwrap();
        let second = hook.control_id().unwrap();
        assert_ne!(first, second);
        let w = lock(&map);
        assert!(!w.has_control(first));
        assert_eq!(w.control(second).unwrap().1, ControlPosition::BottomRight);
    }

    #[test]
    fn test_drop_removes_control() {
        let map = test_map();
        let mut hook = draw_hook::<HeadlessMap>(serde_json::json!({"displayControlsDefault": false}));
        hook.sync(Some(&map)).unwrap();
        let id = hook.control_id().unwrap();
        assert_eq!(lock(&map).control(id).unwrap().0, "draw");
        drop(hook);
        assert!(!lock(&map).has_control(id));
    }

    #[test]
    fn test_draw_options_pass_through() {
        let control = DrawControl {
            options: serde_json::json!({"controls": {"polygon": true}}),
        };
        assert_eq!(control.options()["controls"]["polygon"], true);
        assert_eq!(DrawControl::default().options(), serde_json::json!({}));
    }
}
