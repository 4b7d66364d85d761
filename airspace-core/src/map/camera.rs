//! Reactive camera commands.
//!
//! [`FlyTo`] and [`FitBounds`] remember the last inputs they saw (map,
//! target, options) and issue their command only when those change. An
//! absent map or target counts as an input too, so clearing a selection and
//! picking the same one again flies again.

use serde::{Deserialize, Serialize};

use super::widget::MapWidget;
use super::{lock, map_key, SharedMap};
use crate::types::{LngLat, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlyToOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
    /// Milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearing: Option<f64>,
}

impl FlyToOptions {
    pub fn zoom_duration(zoom: f64, duration_ms: u64) -> Self {
        FlyToOptions {
            zoom: Some(zoom),
            duration: Some(duration_ms),
            ..Default::default()
        }
    }
}

/// Pixels around the fitted region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Padding {
    Uniform(f64),
    Sides {
        top: f64,
        bottom: f64,
        left: f64,
        right: f64,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitBoundsOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<Padding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_zoom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<bool>,
}

type FlyDeps = (Option<usize>, Option<LngLat>, FlyToOptions);

#[derive(Debug, Default)]
pub struct FlyTo {
    last: Option<FlyDeps>,
}

impl FlyTo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when a `flyTo` was issued.
    pub fn sync<W: MapWidget>(
        &mut self,
        map: Option<&SharedMap<W>>,
        center: Option<LngLat>,
        options: &FlyToOptions,
    ) -> Result<bool> {
        let deps = (map.map(map_key), center, options.clone());
        if self.last.as_ref() == Some(&deps) {
            return Ok(false);
        }
        self.last = Some(deps);

        let (Some(map), Some(center)) = (map, center) else {
            return Ok(false);
        };
        lock(map).fly_to(center, options)?;
        Ok(true)
    }
}

type FitDeps = (Option<usize>, Option<[[f64; 2]; 2]>, FitBoundsOptions);

#[derive(Debug, Default)]
pub struct FitBounds {
    last: Option<FitDeps>,
}

impl FitBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// `bounds` is `[[west, south], [east, north]]`.
    pub fn sync<W: MapWidget>(
        &mut self,
        map: Option<&SharedMap<W>>,
        bounds: Option<[[f64; 2]; 2]>,
        options: &FitBoundsOptions,
    ) -> Result<bool> {
        let deps = (map.map(map_key), bounds, options.clone());
        if self.last.as_ref() == Some(&deps) {
            return Ok(false);
        }
        self.last = Some(deps);

        let (Some(map), Some(bounds)) = (map, bounds) else {
            return Ok(false);
        };
        lock(map).fit_bounds(bounds, options)?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
