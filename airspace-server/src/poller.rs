//! Background polling for the active traffic selection.
//!
//! One task per selection: fire immediately, then every interval, no
//! backoff. Changing the selection aborts the task; a fetch that was already
//! in flight is still rejected by the monitor's generation check.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use airspace_core::geo::BoundingBox;
use airspace_core::traffic::{TrafficMonitor, TrafficSnapshot};

use crate::opensky::TrafficSource;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Run one fetch for the current selection. Returns `true` when the result
/// (success or error) was applied, `false` when idle or superseded.
pub async fn poll_once(monitor: &Mutex<TrafficMonitor>, source: &dyn TrafficSource) -> bool {
    let Some(ticket) = guard(monitor).begin_fetch() else {
        return false;
    };
    let result = source.fetch_states(&ticket.bbox()).await;

    let mut monitor = guard(monitor);
    match result {
        Ok(response) => {
            let applied = monitor.apply_success(&ticket, &response);
            if applied {
                debug!(aircraft = monitor.aircraft().len(), "traffic updated");
            }
            applied
        }
        Err(e) => {
            warn!(error = %e, "traffic fetch failed");
            monitor.apply_error(&ticket, e.to_string())
        }
    }
}

pub struct TrafficPoller {
    monitor: Arc<Mutex<TrafficMonitor>>,
    source: Arc<dyn TrafficSource>,
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TrafficPoller {
    pub fn new(source: Arc<dyn TrafficSource>, interval: Duration) -> Self {
        TrafficPoller {
            monitor: Arc::new(Mutex::new(TrafficMonitor::new())),
            source,
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> TrafficSnapshot {
        guard(&self.monitor).snapshot()
    }

    pub fn is_polling(&self) -> bool {
        guard(&self.task).as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Switch to a new selection. Reselecting the current box keeps the
    /// running task. Must be called inside a tokio runtime.
    pub fn select(&self, bbox: Option<BoundingBox>) -> bool {
        if !guard(&self.monitor).select(bbox) {
            return false;
        }
        self.stop();
        if bbox.is_some() {
            let monitor = Arc::clone(&self.monitor);
            let source = Arc::clone(&self.source);
            let interval = self.interval;
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    poll_once(&monitor, source.as_ref()).await;
                }
            });
            *guard(&self.task) = Some(handle);
        }
        true
    }

    pub fn stop(&self) {
        if let Some(task) = guard(&self.task).take() {
            task.abort();
        }
    }
}

impl Drop for TrafficPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
