use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every timer transition that changes something produces an Event.
/// The CLI prints them; listeners subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        book_id: String,
        start_page: Option<u32>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        book_id: Option<String>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        book_id: Option<String>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// The host application was suspended while the timer was running.
    BackgroundEntered {
        at: DateTime<Utc>,
    },
    /// Elapsed time rebuilt from one wall-clock delta after suspension.
    ForegroundResynced {
        elapsed_secs: u64,
        away_secs: u64,
        at: DateTime<Utc>,
    },
    GoalReached {
        book_id: Option<String>,
        goal_secs: u64,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        book_id: String,
        elapsed_secs: u64,
        start_page: Option<u32>,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        is_running: bool,
        book_id: Option<String>,
        elapsed_secs: u64,
        goal_secs: Option<u64>,
        goal_reached: bool,
        goal_progress_pct: Option<f64>,
        at: DateTime<Utc>,
    },
}
