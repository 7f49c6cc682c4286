//! # Readtrack Core Library
//!
//! This library provides the core logic for readtrack, a reading-session
//! timer for a personal book library. All operations are available through
//! the standalone `readtrack` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A wall-clock-based state machine. Elapsed time is always
//!   recomputed from timestamps, so missed ticks or a suspended process never
//!   lose time
//! - **Background Scheduler**: [`ReadingTimer`] drives the engine from a
//!   cancellable periodic source and resyncs once on return to the foreground
//! - **Completion Coordinator**: Runs the "finish reading" sequence against
//!   the book library and the notifier
//! - **Storage**: SQLite-backed application snapshot and TOML configuration
//!
//! ## Key Components
//!
//! - [`TimerState`]: Core timer state machine
//! - [`ReadingTimer`]: Tick driver and lifecycle bridge
//! - [`SessionCoordinator`]: Session start, completion and save
//! - [`AppStore`]: Library, session log and timer persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod library;
pub mod notify;
pub mod ports;
pub mod stats;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CompletionSummary, SessionCoordinator};
pub use error::{CompletionError, ConfigError, CoreError, DatabaseError, LibraryError, TimerError};
pub use events::Event;
pub use library::{Book, BookStatus, NewBook, ReadingSession};
pub use notify::{goal_alerts, ConsoleNotifier, GoalAlerts, GoalListener, LogNotifier};
pub use ports::{BookRepository, Notifier, SessionStore};
pub use stats::{BookTotals, ReadingStats};
pub use storage::{AppStore, Config, Database};
pub use timer::{
    AppLifecycle, ManualScheduler, PeriodicScheduler, ReadingTimer, TimerListener, TimerState,
    TokioScheduler, DEFAULT_TICK_INTERVAL,
};
