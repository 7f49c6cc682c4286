use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One finished reading session. Immutable once appended to a session store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingSession {
    pub id: String,
    pub book_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    #[serde(default)]
    pub start_page: Option<u32>,
    #[serde(default)]
    pub end_page: Option<u32>,
    pub completed: bool,
}

impl ReadingSession {
    /// Pages covered, when both ends are known and the reader moved forward.
    pub fn pages_read(&self) -> Option<u32> {
        match (self.start_page, self.end_page) {
            (Some(start), Some(end)) if end >= start => Some(end - start),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start_page: Option<u32>, end_page: Option<u32>) -> ReadingSession {
        ReadingSession {
            id: "s1".into(),
            book_id: "b1".into(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_secs: 600,
            start_page,
            end_page,
            completed: true,
        }
    }

    #[test]
    fn pages_read_requires_both_ends() {
        assert_eq!(session(Some(42), Some(60)).pages_read(), Some(18));
        assert_eq!(session(Some(42), None).pages_read(), None);
        assert_eq!(session(Some(60), Some(42)).pages_read(), None);
    }
}
