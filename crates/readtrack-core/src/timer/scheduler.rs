//! Periodic tick sources.
//!
//! [`ReadingTimer`](super::ReadingTimer) only sees the [`PeriodicScheduler`]
//! trait. `TokioScheduler` is the runtime-backed source; `ManualScheduler` is
//! for hosts that own their own frame loop, and for tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, warn};

pub type TickCallback = Arc<dyn Fn() + Send + Sync>;

/// A cancellable periodic source. `start` while active and `stop` while
/// stopped are both no-ops.
pub trait PeriodicScheduler: Send + Sync {
    fn start(&self, interval: Duration, callback: TickCallback);
    fn stop(&self);
    fn is_active(&self) -> bool;
}

/// Spawns one tokio task per active period. Must be started from inside a
/// tokio runtime.
#[derive(Default)]
pub struct TokioScheduler {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TokioScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PeriodicScheduler for TokioScheduler {
    fn start(&self, interval: Duration, callback: TickCallback) {
        let mut guard = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(rt) => rt,
            Err(err) => {
                warn!("tick source not started, no tokio runtime: {err}");
                return;
            }
        };

        let period = interval.max(Duration::from_millis(1));
        let handle = runtime.spawn(async move {
            // First tick lands one full period after start.
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        debug!(?period, "tick source started");
        *guard = Some(handle);
    }

    fn stop(&self) {
        if let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        {
            handle.abort();
            debug!("tick source stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.handle
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A source driven by explicit [`fire`](ManualScheduler::fire) calls.
#[derive(Default)]
pub struct ManualScheduler {
    inner: Mutex<ManualInner>,
}

#[derive(Default)]
struct ManualInner {
    callback: Option<TickCallback>,
    interval: Option<Duration>,
    starts: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke the registered callback once. Returns false when stopped.
    pub fn fire(&self) -> bool {
        // Clone out so the callback runs without our lock held.
        let callback = self
            .inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .callback
            .clone();
        match callback {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }

    /// Number of times a new period was actually started.
    pub fn start_count(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).starts
    }

    pub fn interval(&self) -> Option<Duration> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).interval
    }
}

impl PeriodicScheduler for ManualScheduler {
    fn start(&self, interval: Duration, callback: TickCallback) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.callback.is_some() {
            return;
        }
        inner.callback = Some(callback);
        inner.interval = Some(interval);
        inner.starts += 1;
    }

    fn stop(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.callback = None;
        inner.interval = None;
    }

    fn is_active(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .callback
            .is_some()
    }
}
