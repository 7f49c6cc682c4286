mod controller;
mod engine;
mod scheduler;
mod state;

pub use controller::{AppLifecycle, ReadingTimer, TimerListener, DEFAULT_TICK_INTERVAL};
pub use scheduler::{ManualScheduler, PeriodicScheduler, TickCallback, TokioScheduler};
pub use state::TimerState;
