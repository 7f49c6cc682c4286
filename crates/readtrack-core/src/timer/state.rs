use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The single reading-timer slice of application state.
///
/// Only the transition methods in [`super::engine`] mutate it. `display_seconds`
/// is the one field a UI should read for elapsed time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    pub is_running: bool,
    /// Start of the current run segment. `None` whenever not running.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Whole seconds from finished run segments since the last reset.
    #[serde(default)]
    pub paused_time: u64,
    #[serde(default)]
    pub display_seconds: u64,
    #[serde(default)]
    pub last_active_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active_book: Option<String>,
    /// Page the book was on when the session began. First capture wins.
    #[serde(default)]
    pub start_page: Option<u32>,
    /// Optional target duration in seconds.
    #[serde(default)]
    pub goal_time: Option<u64>,
    #[serde(default)]
    pub goal_reached: bool,
    #[serde(default)]
    pub is_background_active: bool,
    #[serde(default)]
    pub last_background_timestamp: Option<DateTime<Utc>>,
    /// First start of this session, used as the saved record's start time.
    #[serde(default)]
    pub session_started_at: Option<DateTime<Utc>>,
    /// Set when the session is frozen for review.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TimerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session is attributed to a book, running or not.
    pub fn has_session(&self) -> bool {
        self.active_book.is_some()
    }

    /// Frozen by `complete_session` and waiting to be saved or abandoned.
    pub fn is_awaiting_review(&self) -> bool {
        self.completed_at.is_some() && !self.is_running
    }

    /// 0.0 .. 100.0 progress toward the goal, if one is set.
    pub fn goal_progress_pct(&self) -> Option<f64> {
        let goal = self.goal_time?;
        if goal == 0 {
            return Some(100.0);
        }
        Some((self.display_seconds as f64 / goal as f64 * 100.0).min(100.0))
    }

    /// Checks the structural invariants; used by tests and after rehydration.
    pub fn is_consistent(&self) -> bool {
        let running_has_start = self.is_running == self.start_time.is_some();
        let display_covers_paused = self.display_seconds >= self.paused_time;
        let book_when_needed =
            !(self.is_running || self.start_page.is_some()) || self.active_book.is_some();
        running_has_start && display_covers_paused && book_when_needed
    }
}
