//! Reading timer transitions.
//!
//! The engine is a wall-clock-based state machine over [`TimerState`]. It has
//! no threads and does no I/O: every transition receives `now` from the caller
//! and recomputes elapsed time from timestamps, so a suspended process loses
//! nothing as long as the clock kept moving.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Completed (frozen) -> Idle
//!            \___________________________________/
//!                          reset
//! ```
//!
//! Transitions that do not apply (pause while paused, resume while running)
//! are no-ops and return `None`.

use chrono::{DateTime, Utc};

use super::state::TimerState;
use crate::clock::elapsed_whole_secs;
use crate::events::Event;

impl TimerState {
    // ── Commands ─────────────────────────────────────────────────────

    /// Begin (or continue) timing `book_id`.
    ///
    /// The engine does not guard against switching books; callers reset first.
    /// Starting while already running folds the live segment into
    /// `paused_time` so no elapsed time is dropped.
    pub fn start(
        &mut self,
        book_id: &str,
        current_page: Option<u32>,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if self.is_running {
            self.fold_live_segment(now);
        }
        self.is_running = true;
        self.start_time = Some(now);
        self.last_active_time = Some(now);
        self.active_book = Some(book_id.to_string());
        if self.start_page.is_none() {
            self.start_page = current_page;
        }
        self.session_started_at.get_or_insert(now);
        self.completed_at = None;
        self.display_seconds = self.display_seconds.max(self.paused_time);

        Some(Event::SessionStarted {
            book_id: book_id.to_string(),
            start_page: self.start_page,
            elapsed_secs: self.display_seconds,
            at: now,
        })
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.fold_live_segment(now);
        self.is_running = false;
        self.start_time = None;
        self.last_active_time = Some(now);
        Some(Event::SessionPaused {
            book_id: self.active_book.clone(),
            elapsed_secs: self.display_seconds,
            at: now,
        })
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.is_running {
            return None;
        }
        self.is_running = true;
        self.start_time = Some(now);
        self.last_active_time = Some(now);
        self.completed_at = None;
        Some(Event::SessionResumed {
            book_id: self.active_book.clone(),
            elapsed_secs: self.display_seconds,
            at: now,
        })
    }

    /// Per-tick recompute. Idempotent for a given `now`; never touches
    /// `paused_time` or `start_time`.
    pub fn update(&mut self, now: DateTime<Utc>) {
        let Some(start) = self.start_time.filter(|_| self.is_running) else {
            return;
        };
        self.display_seconds = self.paused_time + elapsed_whole_secs(start, now);
        self.last_active_time = Some(now);
    }

    /// Record that the host went to the background while running.
    pub fn enter_background(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if !self.is_running {
            return None;
        }
        self.is_background_active = true;
        self.last_background_timestamp = Some(now);
        Some(Event::BackgroundEntered { at: now })
    }

    /// One-shot recompute after suspension. Missed ticks are not replayed;
    /// the single wall-clock delta covers them.
    pub fn sync_from_background(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let away_secs = self
            .last_background_timestamp
            .map(|since| elapsed_whole_secs(since, now))
            .unwrap_or(0);
        self.is_background_active = false;
        self.last_background_timestamp = None;
        if !self.is_running {
            return None;
        }
        self.update(now);
        Some(Event::ForegroundResynced {
            elapsed_secs: self.display_seconds,
            away_secs,
            at: now,
        })
    }

    pub fn set_goal(&mut self, goal_secs: Option<u64>) {
        self.goal_time = goal_secs;
    }

    /// Latch `goal_reached` the first time elapsed time meets the goal.
    /// Returns the event only on that first crossing; `reset` re-arms it.
    pub fn check_goal(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let goal = self.goal_time?;
        if self.goal_reached || self.display_seconds < goal {
            return None;
        }
        self.goal_reached = true;
        Some(Event::GoalReached {
            book_id: self.active_book.clone(),
            goal_secs: goal,
            elapsed_secs: self.display_seconds,
            at: now,
        })
    }

    /// Freeze the session for review. Keeps book, start page and elapsed
    /// time; stops the live segment.
    pub fn complete_session(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let book_id = self.active_book.clone()?;
        if self.is_running {
            self.fold_live_segment(now);
            self.is_running = false;
            self.start_time = None;
        }
        self.is_background_active = false;
        self.last_background_timestamp = None;
        self.last_active_time = Some(now);
        self.completed_at = Some(now);
        Some(Event::SessionCompleted {
            book_id,
            elapsed_secs: self.display_seconds,
            start_page: self.start_page,
            at: now,
        })
    }

    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        *self = Self::default();
        Some(Event::SessionReset { at: now })
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            is_running: self.is_running,
            book_id: self.active_book.clone(),
            elapsed_secs: self.display_seconds,
            goal_secs: self.goal_time,
            goal_reached: self.goal_reached,
            goal_progress_pct: self.goal_progress_pct(),
            at: now,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn fold_live_segment(&mut self, now: DateTime<Utc>) {
        if let Some(start) = self.start_time {
            self.paused_time += elapsed_whole_secs(start, now);
        }
        self.display_seconds = self.paused_time;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 20, 0, 0).unwrap()
    }

    fn secs(n: i64) -> DateTime<Utc> {
        t0() + Duration::seconds(n)
    }

    #[test]
    fn start_pause_resume() {
        let mut state = TimerState::new();
        assert!(state.start("b1", Some(10), t0()).is_some());
        assert!(state.is_running);
        assert_eq!(state.start_time, Some(t0()));
        assert!(state.is_consistent());

        assert!(state.pause(secs(30)).is_some());
        assert!(!state.is_running);
        assert!(state.start_time.is_none());
        assert_eq!(state.paused_time, 30);
        assert_eq!(state.display_seconds, 30);

        assert!(state.resume(secs(40)).is_some());
        assert!(state.is_running);
        assert_eq!(state.paused_time, 30);
        assert_eq!(state.active_book.as_deref(), Some("b1"));
    }

    #[test]
    fn pause_twice_is_idempotent() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        state.pause(secs(12));
        let once = state.paused_time;
        assert!(state.pause(secs(50)).is_none());
        assert_eq!(state.paused_time, once);
    }

    #[test]
    fn resume_while_running_is_noop() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        assert!(state.resume(secs(5)).is_none());
        assert_eq!(state.start_time, Some(t0()));
    }

    #[test]
    fn start_page_is_sticky() {
        let mut state = TimerState::new();
        state.start("b1", Some(42), t0());
        state.pause(secs(10));
        state.start("b1", Some(55), secs(20));
        assert_eq!(state.start_page, Some(42));

        let mut state = TimerState::new();
        state.start("b1", None, t0());
        assert!(state.start_page.is_none());
        state.start("b1", Some(7), secs(1));
        assert_eq!(state.start_page, Some(7));
    }

    #[test]
    fn restart_while_running_keeps_elapsed() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        state.start("b1", None, secs(25));
        state.update(secs(30));
        assert_eq!(state.display_seconds, 30);
    }

    #[test]
    fn update_floors_to_whole_seconds() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        state.update(t0() + Duration::milliseconds(999));
        assert_eq!(state.display_seconds, 0);
        state.update(t0() + Duration::milliseconds(1_000));
        assert_eq!(state.display_seconds, 1);
    }

    #[test]
    fn update_is_idempotent_and_leaves_anchors() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        state.update(secs(17));
        let first = state.clone();
        state.update(secs(17));
        assert_eq!(state, first);
        assert_eq!(state.paused_time, 0);
        assert_eq!(state.start_time, Some(t0()));
    }

    #[test]
    fn update_when_paused_is_noop() {
        let mut state = TimerState::new();
        state.start("b1", None, t0());
        state.pause(secs(10));
        let before = state.clone();
        state.update(secs(500));
        assert_eq!(state, before);
    }

    #[test]
    fn background_resync_matches_ticking() {
        let mut ticked = TimerState::new();
        ticked.start("b1", None, t0());
        for s in 1..=300 {
            ticked.update(secs(s));
        }

        let mut suspended = TimerState::new();
        suspended.start("b1", None, t0());
        suspended.enter_background(t0());
        assert!(suspended.is_background_active);
        let event = suspended.sync_from_background(secs(300));

        assert_eq!(suspended.display_seconds, ticked.display_seconds);
        assert!(!suspended.is_background_active);
        assert!(suspended.last_background_timestamp.is_none());
        match event {
            Some(Event::ForegroundResynced { away_secs, elapsed_secs, .. }) => {
                assert_eq!(away_secs, 300);
                assert_eq!(elapsed_secs, 300);
            }
            other => panic!("expected ForegroundResynced, got {other:?}"),
        }
    }

    #[test]
    fn background_when_paused_is_not_recorded() {
        let mut state = TimerState::new();
        assert!(state.enter_background(t0()).is_none());
        assert!(!state.is_background_active);
        assert!(state.sync_from_background(secs(10)).is_none());
    }

    #[test]
    fn goal_fires_once() {
        let mut state = TimerState::new();
        state.set_goal(Some(60));
        state.start("b1", None, t0());

        let mut fired = 0;
        for s in 1..=120 {
            state.update(secs(s));
            if state.check_goal(secs(s)).is_some() {
                fired += 1;
                assert_eq!(state.display_seconds, 60);
            }
        }
        assert_eq!(fired, 1);
        assert!(state.goal_reached);

        state.reset(secs(121));
        assert!(!state.goal_reached);
        assert!(state.goal_time.is_none());
    }

    #[test]
    fn complete_freezes_summary_fields() {
        let mut state = TimerState::new();
        state.start("b1", Some(42), t0());
        let event = state.complete_session(secs(75));
        assert!(matches!(
            event,
            Some(Event::SessionCompleted { elapsed_secs: 75, start_page: Some(42), .. })
        ));
        assert!(!state.is_running);
        assert!(state.start_time.is_none());
        assert_eq!(state.display_seconds, 75);
        assert_eq!(state.active_book.as_deref(), Some("b1"));
        assert!(state.is_awaiting_review());
        assert!(state.is_consistent());
    }

    #[test]
    fn complete_without_session_is_noop() {
        let mut state = TimerState::new();
        assert!(state.complete_session(t0()).is_none());
        assert!(state.completed_at.is_none());
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut state = TimerState::new();
        state.set_goal(Some(10));
        state.start("b1", Some(3), t0());
        state.enter_background(secs(5));
        state.update(secs(20));
        state.check_goal(secs(20));
        state.reset(secs(21));
        assert_eq!(state, TimerState::default());
    }

    #[test]
    fn reading_scenario() {
        let mut state = TimerState::new();
        state.start("B1", Some(42), t0());
        for s in 1..=90 {
            state.update(secs(s));
        }
        assert_eq!(state.display_seconds, 90);
        assert_eq!(state.start_page, Some(42));

        state.pause(secs(90));
        assert_eq!(state.paused_time, 90);
        assert!(!state.is_running);

        state.resume(secs(100));
        for s in 101..=130 {
            state.update(secs(s));
        }
        assert_eq!(state.display_seconds, 120);

        state.complete_session(secs(130));
        assert!(!state.is_running);
        assert_eq!(state.display_seconds, 120);

        state.reset(secs(131));
        assert_eq!(state, TimerState::default());
        assert!(state.active_book.is_none());
    }
}
