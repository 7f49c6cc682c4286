//! Reading session orchestration.
//!
//! `SessionCoordinator` runs the side-effecting parts of a session around the
//! [`ReadingTimer`]: starting a book, the "finish reading" sequence, and the
//! follow-up save.
//!
//! ## Completion policy
//!
//! ```text
//! 1. book status -> completed   awaited; failure aborts, timer keeps running
//! 2. page fields                best-effort  \  issued together after 1
//! 3. goal notification          best-effort  /
//! 4. timer.complete()           freezes elapsed time for review
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{CompletionError, LibraryError, Result, TimerError};
use crate::events::Event;
use crate::library::{BookStatus, ReadingSession};
use crate::ports::{BookRepository, Notifier, SessionStore};
use crate::timer::{ReadingTimer, TimerState};

const DEFAULT_GOAL_TITLE: &str = "Goal reached";

/// What `complete_reading_session` did beyond the status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSummary {
    pub book_id: String,
    pub elapsed_secs: u64,
    pub start_page: Option<u32>,
    pub pages_updated: bool,
    pub notified: bool,
    pub event: Option<Event>,
}

pub struct SessionCoordinator {
    timer: ReadingTimer,
    books: Arc<dyn BookRepository>,
    notifier: Arc<dyn Notifier>,
    sessions: Arc<dyn SessionStore>,
    goal_title: String,
}

impl SessionCoordinator {
    pub fn new(
        timer: ReadingTimer,
        books: Arc<dyn BookRepository>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            timer,
            books,
            notifier,
            sessions,
            goal_title: DEFAULT_GOAL_TITLE.to_string(),
        }
    }

    pub fn with_goal_title(mut self, title: impl Into<String>) -> Self {
        self.goal_title = title.into();
        self
    }

    pub fn timer(&self) -> &ReadingTimer {
        &self.timer
    }

    /// Start timing a library book from its current page.
    ///
    /// A book still on the wish list moves to `Reading`; that bookkeeping is
    /// best-effort and never blocks the timer.
    pub async fn start_reading(&self, book_id: &str, goal_secs: Option<u64>) -> Result<Option<Event>> {
        let book = self
            .books
            .get_book(book_id)
            .await?
            .ok_or_else(|| LibraryError::BookNotFound(book_id.to_string()))?;

        let event = self.timer.start(&book.id, book.current_page)?;
        if goal_secs.is_some() {
            self.timer.set_goal(goal_secs);
        }

        if book.status == BookStatus::WantToRead {
            if let Err(err) = self.books.set_status(&book.id, BookStatus::Reading).await {
                warn!(book_id, "could not mark book as reading: {err}");
            }
        }
        Ok(event)
    }

    /// The "finish reading" sequence. Only the status change can fail the
    /// operation; see the module docs for ordering.
    ///
    /// `book_id` must be the book the open session is timing.
    pub async fn complete_reading_session(
        &self,
        book_id: &str,
        book_title: &str,
        current_page: Option<u32>,
        total_pages: Option<u32>,
    ) -> Result<CompletionSummary> {
        match self.timer.state().active_book {
            None => return Err(TimerError::NoActiveSession.into()),
            Some(active) if active != book_id => {
                return Err(TimerError::SessionInProgress {
                    active,
                    requested: book_id.to_string(),
                }
                .into())
            }
            Some(_) => {}
        }

        if let Err(err) = self.books.set_status(book_id, BookStatus::Completed).await {
            warn!(book_id, "status transition failed, session left open: {err}");
            return Err(CompletionError::StatusTransition {
                book_id: book_id.to_string(),
                source: Box::new(err),
            }
            .into());
        }
        info!(book_id, "book marked completed");

        let pages = async {
            let mut ok = true;
            if let Some(total) = total_pages {
                if let Err(err) = self.books.set_total_pages(book_id, total).await {
                    warn!(book_id, total, "total page update failed: {err}");
                    ok = false;
                }
            }
            if let Some(page) = current_page {
                if let Err(err) = self.books.set_current_page(book_id, page).await {
                    warn!(book_id, page, "current page update failed: {err}");
                    ok = false;
                }
            }
            ok && (current_page.is_some() || total_pages.is_some())
        };
        let body = format!("You finished reading {book_title}");
        let notify = async {
            match self.notifier.notify(&self.goal_title, &body).await {
                Ok(()) => true,
                Err(err) => {
                    warn!(book_id, "goal notification failed: {err}");
                    false
                }
            }
        };
        let (pages_updated, notified) = tokio::join!(pages, notify);

        let event = self.timer.complete();
        let state = self.timer.state();
        Ok(CompletionSummary {
            book_id: book_id.to_string(),
            elapsed_secs: state.display_seconds,
            start_page: state.start_page,
            pages_updated,
            notified,
            event,
        })
    }

    /// Persist the frozen session and clear the timer.
    ///
    /// `end_page` defaults to the book's current page. The session and the
    /// cleared timer are stored in one write; if it fails the timer is left
    /// untouched so the save can be retried.
    pub async fn save_session(&self, end_page: Option<u32>) -> Result<ReadingSession> {
        let state = self.timer.state();
        let book_id = state.active_book.clone().ok_or(TimerError::NoActiveSession)?;
        if state.is_running {
            return Err(TimerError::StillRunning.into());
        }

        let end_page = match end_page {
            Some(page) => Some(page),
            None => self
                .books
                .get_book(&book_id)
                .await
                .unwrap_or_else(|err| {
                    warn!(book_id = %book_id, "could not read book for end page: {err}");
                    None
                })
                .and_then(|b| b.current_page),
        };

        let ended_at = state.completed_at.unwrap_or_else(|| self.timer.now());
        let started_at = state
            .session_started_at
            .unwrap_or(ended_at - chrono::Duration::seconds(state.display_seconds as i64));
        let session = ReadingSession {
            id: Uuid::new_v4().to_string(),
            book_id,
            started_at,
            ended_at,
            duration_secs: state.display_seconds,
            start_page: state.start_page,
            end_page,
            completed: true,
        };

        self.sessions
            .append(session.clone(), &TimerState::default())
            .await?;
        info!(
            book_id = %session.book_id,
            duration_secs = session.duration_secs,
            "reading session saved"
        );
        self.timer.reset();
        Ok(session)
    }

    /// Drop the open session without recording it.
    pub fn abandon(&self) -> Option<Event> {
        self.timer.reset()
    }
}
