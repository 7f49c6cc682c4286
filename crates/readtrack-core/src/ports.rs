//! Collaborators the reading timer depends on.
//!
//! The completion coordinator only talks to these traits. `AppStore`
//! implements the repository and the session store; notifiers live in
//! [`crate::notify`].

use async_trait::async_trait;

use crate::error::Result;
use crate::library::{Book, BookStatus, ReadingSession};
use crate::timer::TimerState;

/// Book lookups and progress updates.
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn get_book(&self, id: &str) -> Result<Option<Book>>;

    async fn set_status(&self, id: &str, status: BookStatus) -> Result<()>;

    async fn set_current_page(&self, id: &str, page: u32) -> Result<()>;

    async fn set_total_pages(&self, id: &str, pages: u32) -> Result<()>;
}

/// Shows a message to the reader. Callers treat failures as best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Append-only log of finished sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append `session` and store `timer` as the current timer state in one
    /// atomic write, so a saved session can never be recorded twice.
    async fn append(&self, session: ReadingSession, timer: &TimerState) -> Result<()>;
}
