//! Reading statistics aggregated from the session log.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::library::ReadingSession;

/// Totals for one book.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookTotals {
    pub sessions: u32,
    pub seconds: u64,
    pub pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingStats {
    pub total_sessions: u32,
    pub total_seconds: u64,
    /// Sum of pages read over sessions where both ends are known.
    pub total_pages: u32,
    pub today_sessions: u32,
    pub today_seconds: u64,
    /// Keyed by book id.
    pub per_book: BTreeMap<String, BookTotals>,
}

impl ReadingStats {
    /// Aggregate `sessions`. A session counts toward `today` when it ended
    /// on that UTC date.
    pub fn from_sessions(sessions: &[ReadingSession], today: NaiveDate) -> Self {
        let mut stats = Self::default();
        for session in sessions {
            let pages = session.pages_read().unwrap_or(0);
            stats.total_sessions += 1;
            stats.total_seconds += session.duration_secs;
            stats.total_pages += pages;

            if session.ended_at.date_naive() == today {
                stats.today_sessions += 1;
                stats.today_seconds += session.duration_secs;
            }

            let book = stats.per_book.entry(session.book_id.clone()).or_default();
            book.sessions += 1;
            book.seconds += session.duration_secs;
            book.pages += pages;
        }
        stats
    }

    pub fn total_minutes(&self) -> u64 {
        self.total_seconds / 60
    }

    /// Average pages per hour over all sessions, if any time was logged.
    pub fn pages_per_hour(&self) -> Option<f64> {
        if self.total_seconds == 0 {
            return None;
        }
        Some(self.total_pages as f64 * 3_600.0 / self.total_seconds as f64)
    }
}
