//! Traffic state for one search-area selection.
//!
//! The monitor is pure state; the server drives it from a polling task.
//! Every fetch carries a [`FetchTicket`] stamped with the selection
//! generation at the time it started. Changing the selection bumps the
//! generation, so results for a superseded box are rejected on arrival.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::aircraft::Aircraft;
use crate::geo::BoundingBox;
use crate::opensky::{map_state_vectors, StatesResponse};
use crate::types::format_clock;

/// Time between fetches for an active selection. Fixed, no backoff.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Proof that a fetch was started for a particular selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    bbox: BoundingBox,
}

impl FetchTicket {
    /// The box this fetch should query.
    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Sidebar headline and optional status line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub headline: String,
    pub status: Option<String>,
}

/// Serializable view of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficSnapshot {
    pub version: u64,
    pub bbox: Option<BoundingBox>,
    pub aircraft: Vec<Aircraft>,
    pub last_updated: Option<i64>,
    pub loading: bool,
    pub error: Option<String>,
    pub summary: TrafficSummary,
}

#[derive(Debug, Default)]
pub struct TrafficMonitor {
    generation: u64,
    bbox: Option<BoundingBox>,
    aircraft: Vec<Aircraft>,
    last_updated: Option<i64>,
    loading: bool,
    error: Option<String>,
    version: u64,
}

impl TrafficMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the active selection. Returns `false` when `bbox` equals the
    /// current one and nothing changed.
    pub fn select(&mut self, bbox: Option<BoundingBox>) -> bool {
        if self.bbox == bbox {
            return false;
        }
        self.generation += 1;
        self.bbox = bbox;
        self.loading = false;
        if bbox.is_none() {
            self.aircraft.clear();
            self.last_updated = None;
            self.error = None;
        }
        self.version += 1;
        debug!(generation = self.generation, ?bbox, "traffic selection changed");
        true
    }

    /// Drop the selection and reset everything shown for it.
    pub fn clear(&mut self) {
        self.select(None);
    }

    /// Start a fetch for the current selection. `None` while idle.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        let bbox = self.bbox?;
        self.loading = true;
        self.error = None;
        self.version += 1;
        Some(FetchTicket {
            generation: self.generation,
            bbox,
        })
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && self.bbox == Some(ticket.bbox)
    }

    /// Replace the aircraft list with a decoded response.
    pub fn apply_success(&mut self, ticket: &FetchTicket, response: &StatesResponse) -> bool {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.generation, current = self.generation, "dropping stale traffic result");
            return false;
        }
        self.aircraft = map_state_vectors(response.states.as_deref());
        self.last_updated = Some(response.time);
        self.error = None;
        self.loading = false;
        self.version += 1;
        true
    }

    /// Record a failed tick. The previous list is not retained.
    pub fn apply_error(&mut self, ticket: &FetchTicket, message: impl Into<String>) -> bool {
        if !self.is_current(ticket) {
            debug!(ticket = ticket.generation, current = self.generation, "dropping stale traffic error");
            return false;
        }
        self.error = Some(message.into());
        self.aircraft.clear();
        self.loading = false;
        self.version += 1;
        true
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bbox
    }

    pub fn aircraft(&self) -> &[Aircraft] {
        &self.aircraft
    }

    pub fn last_updated(&self) -> Option<i64> {
        self.last_updated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn summary(&self) -> TrafficSummary {
        if self.bbox.is_none() {
            return TrafficSummary {
                headline: "Flights".to_string(),
                status: None,
            };
        }

        let headline = if self.loading && self.aircraft.is_empty() {
            "Loading…".to_string()
        } else {
            format!("{} aircraft in search area", self.aircraft.len())
        };

        let status = if self.error.is_some() {
            Some("Unable to fetch traffic data — retrying".to_string())
        } else if self.loading {
            Some("Please standby".to_string())
        } else {
            self.last_updated.map(|t| format!("Updated {}", format_clock(t)))
        };

        TrafficSummary { headline, status }
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            version: self.version,
            bbox: self.bbox,
            aircraft: self.aircraft.clone(),
            last_updated: self.last_updated,
            loading: self.loading,
            error: self.error.clone(),
            summary: self.summary(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
