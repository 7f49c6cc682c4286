//! Versioned application snapshot.
//!
//! Timer state, the book library and the session log are serialized together
//! as one JSON document under [`SNAPSHOT_KEY`]. A snapshot that cannot be
//! read never blocks startup: the caller gets the zeroed default and a
//! warning in the log.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::database::Database;
use crate::error::{CoreError, DatabaseError};
use crate::library::{Book, ReadingSession};
use crate::timer::TimerState;

pub const SNAPSHOT_KEY: &str = "app_snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub timer: TimerState,
    #[serde(default)]
    pub books: Vec<Book>,
    #[serde(default)]
    pub sessions: Vec<ReadingSession>,
}

impl Default for AppSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timer: TimerState::default(),
            books: Vec::new(),
            sessions: Vec::new(),
        }
    }
}

impl AppSnapshot {
    /// Parse a stored document, upgrading older layouts.
    ///
    /// # Errors
    /// Returns an error for malformed JSON or a version newer than this build.
    pub fn decode(json: &str) -> Result<Self, CoreError> {
        let mut snapshot: AppSnapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(DatabaseError::SnapshotVersion {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            }
            .into());
        }
        // Version 0 predates the field; its layout is otherwise identical.
        snapshot.version = SNAPSHOT_VERSION;
        if !snapshot.timer.is_consistent() {
            warn!("stored timer state is inconsistent; resetting timer");
            snapshot.timer = TimerState::default();
        }
        Ok(snapshot)
    }

    pub fn encode(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load from `db`, falling back to the default snapshot on any failure.
    pub fn load_or_default(db: &Database) -> Self {
        match db.kv_get(SNAPSHOT_KEY) {
            Ok(Some(json)) => Self::decode(&json).unwrap_or_else(|err| {
                warn!("discarding unreadable snapshot: {err}");
                Self::default()
            }),
            Ok(None) => Self::default(),
            Err(err) => {
                warn!("could not read snapshot: {err}");
                Self::default()
            }
        }
    }

    pub fn save(&self, db: &Database) -> Result<(), CoreError> {
        db.kv_set(SNAPSHOT_KEY, &self.encode()?)?;
        Ok(())
    }
}
