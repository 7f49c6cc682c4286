//! Core error types for readtrack-core.
//!
//! Only one failure is meant to reach the reader during normal use: the
//! status transition at the start of session completion. Everything else is
//! either an idempotent no-op in the engine or a logged best-effort step.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for readtrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Timer session errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Book library errors
    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    /// Session completion errors
    #[error("{0}")]
    Completion(#[from] CompletionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored snapshot was written by a newer build
    #[error("Snapshot version {found} is newer than supported version {supported}")]
    SnapshotVersion { found: u32, supported: u32 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Could not resolve the data directory
    #[error("Could not resolve data directory: {0}")]
    DataDir(String),
}

/// Errors raised by the reading timer's guarded operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("No reading session is open")]
    NoActiveSession,

    /// A session for another book is open; it must be finished or abandoned first.
    #[error("A session for book '{active}' is open; finish or abandon it before starting '{requested}'")]
    SessionInProgress { active: String, requested: String },

    #[error("The reading session is still running; finish it before saving")]
    StillRunning,
}

/// Book library errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("Page {page} is beyond the book's {total} pages")]
    InvalidPage { page: u32, total: u32 },

    #[error("Unknown book status: {0}")]
    InvalidStatus(String),

    #[error("Book title must not be empty")]
    EmptyTitle,
}

/// Failure of the blocking step of session completion.
#[derive(Error, Debug)]
pub enum CompletionError {
    /// The display text is what the reader sees.
    #[error("Could not mark book as completed, please try again")]
    StatusTransition {
        book_id: String,
        #[source]
        source: Box<CoreError>,
    },
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseBusy
                    || err.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::InvalidValue {
            key: "<file>".into(),
            message: err.to_string(),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
