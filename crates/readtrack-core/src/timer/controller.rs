//! The background scheduler bridge.
//!
//! `ReadingTimer` owns the shared [`TimerState`], a [`Clock`] and a
//! [`PeriodicScheduler`]. It ticks the engine while a session runs, folds a
//! foreground transition into a single resync, and guarantees that once
//! `pause`, `complete` or `reset` returns no further tick can land: the
//! periodic source is cancelled while the state lock is held.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::scheduler::{PeriodicScheduler, TickCallback};
use super::state::TimerState;
use crate::clock::Clock;
use crate::error::TimerError;
use crate::events::Event;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Host application visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Foreground,
    Background,
}

/// Receives timer events outside the state lock.
pub trait TimerListener: Send + Sync {
    fn on_event(&self, event: &Event);

    /// Called after every tick recompute.
    fn on_tick(&self, _state: &TimerState) {}
}

struct Inner {
    state: Mutex<TimerState>,
    lifecycle: Mutex<AppLifecycle>,
    clock: Arc<dyn Clock>,
    source: Arc<dyn PeriodicScheduler>,
    interval: Duration,
    listeners: Mutex<Vec<Arc<dyn TimerListener>>>,
}

/// Cloneable handle to the one reading timer.
#[derive(Clone)]
pub struct ReadingTimer {
    inner: Arc<Inner>,
}

impl ReadingTimer {
    pub fn new(
        initial: TimerState,
        clock: Arc<dyn Clock>,
        source: Arc<dyn PeriodicScheduler>,
        interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(initial),
                lifecycle: Mutex::new(AppLifecycle::Foreground),
                clock,
                source,
                interval,
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn TimerListener>) {
        lock(&self.inner.listeners).push(listener);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        lock(&self.inner.state).clone()
    }

    pub fn lifecycle(&self) -> AppLifecycle {
        *lock(&self.inner.lifecycle)
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.source.is_active()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }

    /// Recompute, then describe the current state.
    pub fn snapshot(&self) -> Event {
        let now = self.inner.clock.now();
        let mut state = lock(&self.inner.state);
        state.update(now);
        state.snapshot(now)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Pick up a rehydrated state: a session that was running when the last
    /// process exited is recomputed from the wall clock and ticking resumes.
    pub fn attach(&self) -> Vec<Event> {
        let now = self.inner.clock.now();
        let mut events = Vec::new();
        {
            let mut state = lock(&self.inner.state);
            if !state.is_running {
                return events;
            }
            if state.is_background_active {
                events.extend(state.sync_from_background(now));
            } else {
                state.update(now);
            }
            events.extend(state.check_goal(now));
            self.begin_ticking();
        }
        self.dispatch(&events);
        events
    }

    /// Start timing `book_id`. A session already open for a different book
    /// is rejected; finish or abandon it first.
    pub fn start(
        &self,
        book_id: &str,
        current_page: Option<u32>,
    ) -> Result<Option<Event>, TimerError> {
        let now = self.inner.clock.now();
        let event = {
            let mut state = lock(&self.inner.state);
            if let Some(active) = state.active_book.as_deref() {
                if active != book_id {
                    return Err(TimerError::SessionInProgress {
                        active: active.to_string(),
                        requested: book_id.to_string(),
                    });
                }
            }
            let event = state.start(book_id, current_page, now);
            self.begin_ticking();
            event
        };
        info!(book_id, "reading session started");
        self.dispatch_opt(&event);
        Ok(event)
    }

    pub fn pause(&self) -> Option<Event> {
        let now = self.inner.clock.now();
        let event = {
            let mut state = lock(&self.inner.state);
            self.inner.source.stop();
            state.pause(now)
        };
        self.dispatch_opt(&event);
        event
    }

    pub fn resume(&self) -> Result<Option<Event>, TimerError> {
        let now = self.inner.clock.now();
        let event = {
            let mut state = lock(&self.inner.state);
            if !state.has_session() {
                return Err(TimerError::NoActiveSession);
            }
            let event = state.resume(now);
            self.begin_ticking();
            event
        };
        self.dispatch_opt(&event);
        Ok(event)
    }

    pub fn set_goal(&self, goal_secs: Option<u64>) {
        lock(&self.inner.state).set_goal(goal_secs);
    }

    /// One periodic recompute. The registered tick source calls this; hosts
    /// with their own loop may call it directly.
    pub fn tick(&self) {
        let now = self.inner.clock.now();
        let (snapshot, goal) = {
            let mut state = lock(&self.inner.state);
            if !state.is_running {
                return;
            }
            state.update(now);
            let goal = state.check_goal(now);
            (state.clone(), goal)
        };
        debug!(elapsed = snapshot.display_seconds, "tick");
        for listener in self.listeners() {
            listener.on_tick(&snapshot);
        }
        self.dispatch_opt(&goal);
    }

    /// Host went to the background. The tick source keeps running; some
    /// platforms still deliver degraded ticks and they are harmless.
    pub fn enter_background(&self) -> Option<Event> {
        let now = self.inner.clock.now();
        *lock(&self.inner.lifecycle) = AppLifecycle::Background;
        let event = lock(&self.inner.state).enter_background(now);
        self.dispatch_opt(&event);
        event
    }

    /// Host returned to the foreground. If the timer was running when it
    /// left, elapsed time is rebuilt once from the wall clock before ticks
    /// continue.
    pub fn enter_foreground(&self) -> Vec<Event> {
        let now = self.inner.clock.now();
        *lock(&self.inner.lifecycle) = AppLifecycle::Foreground;
        let mut events = Vec::new();
        {
            let mut state = lock(&self.inner.state);
            if state.is_background_active {
                events.extend(state.sync_from_background(now));
                events.extend(state.check_goal(now));
            }
            if state.is_running {
                self.begin_ticking();
            }
        }
        self.dispatch(&events);
        events
    }

    /// Freeze the session for review and stop ticking.
    pub fn complete(&self) -> Option<Event> {
        let now = self.inner.clock.now();
        let event = {
            let mut state = lock(&self.inner.state);
            self.inner.source.stop();
            state.complete_session(now)
        };
        self.dispatch_opt(&event);
        event
    }

    pub fn reset(&self) -> Option<Event> {
        let now = self.inner.clock.now();
        let event = {
            let mut state = lock(&self.inner.state);
            self.inner.source.stop();
            state.reset(now)
        };
        info!("reading session reset");
        self.dispatch_opt(&event);
        event
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_ticking(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let callback: TickCallback = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                ReadingTimer { inner }.tick();
            }
        });
        self.inner.source.start(self.inner.interval, callback);
    }

    fn listeners(&self) -> Vec<Arc<dyn TimerListener>> {
        lock(&self.inner.listeners).clone()
    }

    fn dispatch(&self, events: &[Event]) {
        if events.is_empty() {
            return;
        }
        for listener in self.listeners() {
            for event in events {
                listener.on_event(event);
            }
        }
    }

    fn dispatch_opt(&self, event: &Option<Event>) {
        if let Some(event) = event {
            self.dispatch(std::slice::from_ref(event));
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timer::ManualScheduler;
    use chrono::{TimeZone, Utc};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
        ticks: Mutex<usize>,
    }

    impl TimerListener for Recorder {
        fn on_event(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }

        fn on_tick(&self, _state: &TimerState) {
            *self.ticks.lock().unwrap() += 1;
        }
    }

    impl Recorder {
        fn goal_events(&self) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| matches!(e, Event::GoalReached { .. }))
                .count()
        }
    }

    struct Harness {
        clock: Arc<ManualClock>,
        source: Arc<ManualScheduler>,
        timer: ReadingTimer,
        recorder: Arc<Recorder>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 5, 4, 21, 0, 0).unwrap(),
        ));
        let source = Arc::new(ManualScheduler::new());
        let timer = ReadingTimer::new(
            TimerState::new(),
            clock.clone(),
            source.clone(),
            DEFAULT_TICK_INTERVAL,
        );
        let recorder = Arc::new(Recorder::default());
        timer.add_listener(recorder.clone());
        Harness {
            clock,
            source,
            timer,
            recorder,
        }
    }

    impl Harness {
        fn tick_secs(&self, n: usize) {
            for _ in 0..n {
                self.clock.advance_secs(1);
                self.source.fire();
            }
        }
    }

    #[test]
    fn start_begins_ticking_once() {
        let h = harness();
        h.timer.start("b1", Some(1)).unwrap();
        h.timer.start("b1", None).unwrap();
        assert!(h.timer.is_ticking());
        assert_eq!(h.source.start_count(), 1);
        assert_eq!(h.source.interval(), Some(DEFAULT_TICK_INTERVAL));
    }

    #[test]
    fn start_for_other_book_is_rejected() {
        let h = harness();
        h.timer.start("b1", None).unwrap();
        let err = h.timer.start("b2", None).unwrap_err();
        assert_eq!(
            err,
            TimerError::SessionInProgress {
                active: "b1".into(),
                requested: "b2".into()
            }
        );
        assert_eq!(h.timer.state().active_book.as_deref(), Some("b1"));
    }

    #[test]
    fn resume_without_session_is_an_error() {
        let h = harness();
        assert_eq!(h.timer.resume().unwrap_err(), TimerError::NoActiveSession);
    }

    #[test]
    fn ticks_drive_display_seconds() {
        let h = harness();
        h.timer.start("b1", None).unwrap();
        h.tick_secs(90);
        assert_eq!(h.timer.state().display_seconds, 90);
        assert_eq!(*h.recorder.ticks.lock().unwrap(), 90);
    }

    #[test]
    fn pause_cancels_tick_source() {
        let h = harness();
        h.timer.start("b1", None).unwrap();
        h.tick_secs(10);
        h.timer.pause();
        assert!(!h.timer.is_ticking());
        h.clock.advance_secs(30);
        assert!(!h.source.fire());
        assert_eq!(h.timer.state().display_seconds, 10);
        assert_eq!(h.timer.state().paused_time, 10);
    }

    #[test]
    fn background_keeps_source_and_foreground_resyncs_once() {
        let h = harness();
        h.timer.start("b1", None).unwrap();
        h.tick_secs(5);

        assert!(h.timer.enter_background().is_some());
        assert!(h.timer.is_ticking());
        assert_eq!(h.timer.lifecycle(), AppLifecycle::Background);

        // Suspended: no ticks delivered for ten minutes.
        h.clock.advance_secs(600);
        let events = h.timer.enter_foreground();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Event::ForegroundResynced { elapsed_secs: 605, away_secs: 600, .. }
        ));
        assert_eq!(h.timer.state().display_seconds, 605);
        assert!(!h.timer.state().is_background_active);

        // A second foreground signal has nothing left to resync.
        assert!(h.timer.enter_foreground().is_empty());
        assert_eq!(h.source.start_count(), 1);
    }

    #[test]
    fn goal_notifies_once_even_across_resync() {
        let h = harness();
        h.timer.set_goal(Some(60));
        h.timer.start("b1", None).unwrap();
        h.tick_secs(30);
        h.timer.enter_background();
        h.clock.advance_secs(45);
        h.timer.enter_foreground();
        assert!(h.timer.state().goal_reached);
        h.tick_secs(100);
        assert_eq!(h.recorder.goal_events(), 1);
    }

    #[test]
    fn complete_then_reset_stops_everything() {
        let h = harness();
        h.timer.start("b1", Some(42)).unwrap();
        h.tick_secs(20);
        let event = h.timer.complete();
        assert!(matches!(event, Some(Event::SessionCompleted { elapsed_secs: 20, .. })));
        assert!(!h.timer.is_ticking());
        assert_eq!(h.timer.state().start_page, Some(42));

        h.timer.reset();
        assert_eq!(h.timer.state(), TimerState::default());
    }

    #[test]
    fn attach_resumes_running_rehydrated_state() {
        let h = harness();
        let mut stored = TimerState::new();
        stored.start("b1", None, h.clock.now());
        h.clock.advance_secs(42);

        let timer = ReadingTimer::new(
            stored,
            h.clock.clone(),
            h.source.clone(),
            DEFAULT_TICK_INTERVAL,
        );
        timer.attach();
        assert_eq!(timer.state().display_seconds, 42);
        assert!(timer.is_ticking());
    }

    #[test]
    fn attach_leaves_idle_state_alone() {
        let h = harness();
        assert!(h.timer.attach().is_empty());
        assert!(!h.timer.is_ticking());
    }
}
