//! The central application store.
//!
//! `AppStore` owns the database and the in-memory [`AppSnapshot`]. Every
//! mutation re-reads the stored snapshot inside a write transaction, applies
//! the change, and writes it back before it becomes visible. Other processes
//! sharing the file therefore never lose their writes, and a failed write
//! leaves the previous state in place.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use super::database::Database;
use super::snapshot::AppSnapshot;
use crate::clock::{Clock, SystemClock};
use crate::error::{LibraryError, Result, TimerError};
use crate::library::{check_page, Book, BookStatus, NewBook, ReadingSession};
use crate::ports::{BookRepository, SessionStore};
use crate::timer::TimerState;

pub struct AppStore {
    db: Mutex<Database>,
    snapshot: Mutex<AppSnapshot>,
    clock: Arc<dyn Clock>,
}

impl AppStore {
    /// Open the store in the default data directory and rehydrate it.
    pub fn open() -> Result<Self> {
        Ok(Self::from_database(Database::open()?))
    }

    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self::from_database(Database::open_at(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_memory()?))
    }

    pub fn from_database(db: Database) -> Self {
        let snapshot = AppSnapshot::load_or_default(&db);
        debug!(
            books = snapshot.books.len(),
            sessions = snapshot.sessions.len(),
            "store rehydrated"
        );
        Self {
            db: Mutex::new(db),
            snapshot: Mutex::new(snapshot),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> AppSnapshot {
        self.read().clone()
    }

    pub fn timer_state(&self) -> TimerState {
        self.read().timer.clone()
    }

    pub fn list_books(&self) -> Vec<Book> {
        self.read().books.clone()
    }

    pub fn book(&self, id: &str) -> Option<Book> {
        self.read().books.iter().find(|b| b.id == id).cloned()
    }

    pub fn sessions(&self) -> Vec<ReadingSession> {
        self.read().sessions.clone()
    }

    pub fn sessions_for(&self, book_id: &str) -> Vec<ReadingSession> {
        self.read()
            .sessions
            .iter()
            .filter(|s| s.book_id == book_id)
            .cloned()
            .collect()
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn save_timer(&self, timer: &TimerState) -> Result<()> {
        self.mutate(|snapshot| {
            snapshot.timer = timer.clone();
            Ok(())
        })
    }

    /// Store `next` only if the stored timer still equals `expected` (or
    /// already equals `next`). Returns false, leaving the stored timer alone,
    /// when another writer changed it in between.
    pub fn save_timer_if_unchanged(&self, expected: &TimerState, next: &TimerState) -> Result<bool> {
        self.mutate(|snapshot| {
            if snapshot.timer == *next {
                return Ok(true);
            }
            if snapshot.timer != *expected {
                return Ok(false);
            }
            snapshot.timer = next.clone();
            Ok(true)
        })
    }

    pub fn add_book(&self, new_book: NewBook) -> Result<Book> {
        let book = new_book.into_book(Uuid::new_v4().to_string(), self.clock.now())?;
        self.mutate(|snapshot| {
            snapshot.books.push(book.clone());
            Ok(())
        })?;
        Ok(book)
    }

    /// Remove a book and its session history. A book with an open reading
    /// session cannot be removed.
    pub fn remove_book(&self, id: &str) -> Result<Book> {
        self.mutate(|snapshot| {
            if snapshot.timer.active_book.as_deref() == Some(id) {
                return Err(TimerError::SessionInProgress {
                    active: id.to_string(),
                    requested: id.to_string(),
                }
                .into());
            }
            let pos = snapshot
                .books
                .iter()
                .position(|b| b.id == id)
                .ok_or_else(|| LibraryError::BookNotFound(id.to_string()))?;
            snapshot.sessions.retain(|s| s.book_id != id);
            Ok(snapshot.books.remove(pos))
        })
    }

    pub fn update_book<F>(&self, id: &str, apply: F) -> Result<Book>
    where
        F: FnOnce(&mut Book) -> Result<()>,
    {
        let now = self.clock.now();
        self.mutate(|snapshot| {
            let book = snapshot
                .books
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| LibraryError::BookNotFound(id.to_string()))?;
            apply(book)?;
            book.updated_at = now;
            Ok(book.clone())
        })
    }

    /// Append a finished session and store `timer` in the same write.
    pub fn append_session(&self, session: ReadingSession, timer: &TimerState) -> Result<()> {
        self.mutate(|snapshot| {
            snapshot.sessions.push(session);
            snapshot.timer = timer.clone();
            Ok(())
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn read(&self) -> MutexGuard<'_, AppSnapshot> {
        self.snapshot.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn mutate<T, F>(&self, apply: F) -> Result<T>
    where
        F: FnOnce(&mut AppSnapshot) -> Result<T>,
    {
        let mut current = self.read();
        let db = self.db.lock().unwrap_or_else(|p| p.into_inner());
        let tx = db.write_transaction()?;
        let mut next = AppSnapshot::load_or_default(&db);
        let out = apply(&mut next)?;
        next.save(&db)?;
        tx.commit()?;
        *current = next;
        Ok(out)
    }
}

#[async_trait]
impl BookRepository for AppStore {
    async fn get_book(&self, id: &str) -> Result<Option<Book>> {
        Ok(self.book(id))
    }

    async fn set_status(&self, id: &str, status: BookStatus) -> Result<()> {
        self.update_book(id, |book| {
            book.status = status;
            if status == BookStatus::Completed {
                if let Some(total) = book.total_pages {
                    book.current_page = Some(total);
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    async fn set_current_page(&self, id: &str, page: u32) -> Result<()> {
        self.update_book(id, |book| {
            check_page(Some(page), book.total_pages)?;
            book.current_page = Some(page);
            Ok(())
        })?;
        Ok(())
    }

    async fn set_total_pages(&self, id: &str, pages: u32) -> Result<()> {
        self.update_book(id, |book| {
            check_page(book.current_page, Some(pages))?;
            book.total_pages = Some(pages);
            Ok(())
        })?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for AppStore {
    async fn append(&self, session: ReadingSession, timer: &TimerState) -> Result<()> {
        self.append_session(session, timer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use chrono::Utc;

    fn dune() -> NewBook {
        NewBook {
            title: "Dune".into(),
            author: Some("Frank Herbert".into()),
            current_page: Some(10),
            total_pages: Some(412),
        }
    }

    #[tokio::test]
    async fn book_updates_write_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let id = {
            let store = AppStore::open_at(&path).unwrap();
            let book = store.add_book(dune()).unwrap();
            store.set_current_page(&book.id, 120).await.unwrap();
            store.set_status(&book.id, BookStatus::Reading).await.unwrap();
            book.id
        };

        let reopened = AppStore::open_at(&path).unwrap();
        let book = reopened.get_book(&id).await.unwrap().unwrap();
        assert_eq!(book.current_page, Some(120));
        assert_eq!(book.status, BookStatus::Reading);
    }

    #[tokio::test]
    async fn page_beyond_total_is_rejected_and_not_applied() {
        let store = AppStore::in_memory().unwrap();
        let book = store.add_book(dune()).unwrap();
        let err = store.set_current_page(&book.id, 500).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Library(LibraryError::InvalidPage { page: 500, total: 412 })
        ));
        assert_eq!(store.book(&book.id).unwrap().current_page, Some(10));
    }

    #[tokio::test]
    async fn completing_moves_page_to_end() {
        let store = AppStore::in_memory().unwrap();
        let book = store.add_book(dune()).unwrap();
        store.set_status(&book.id, BookStatus::Completed).await.unwrap();
        assert_eq!(store.book(&book.id).unwrap().current_page, Some(412));
    }

    #[tokio::test]
    async fn unknown_book_is_not_found() {
        let store = AppStore::in_memory().unwrap();
        let err = store.set_status("nope", BookStatus::Completed).await.unwrap_err();
        assert!(matches!(err, CoreError::Library(LibraryError::BookNotFound(_))));
    }

    #[test]
    fn cannot_remove_book_with_open_session() {
        let store = AppStore::in_memory().unwrap();
        let book = store.add_book(dune()).unwrap();
        let mut timer = TimerState::new();
        timer.start(&book.id, Some(10), Utc::now());
        store.save_timer(&timer).unwrap();

        assert!(store.remove_book(&book.id).is_err());
        assert!(store.book(&book.id).is_some());
    }

    fn finished_session(book_id: &str) -> ReadingSession {
        ReadingSession {
            id: "s1".into(),
            book_id: book_id.into(),
            started_at: Utc::now(),
            ended_at: Utc::now(),
            duration_secs: 60,
            start_page: None,
            end_page: None,
            completed: true,
        }
    }

    #[tokio::test]
    async fn remove_book_drops_its_sessions() {
        let store = AppStore::in_memory().unwrap();
        let book = store.add_book(dune()).unwrap();
        store
            .append(finished_session(&book.id), &TimerState::default())
            .await
            .unwrap();
        store.remove_book(&book.id).unwrap();
        assert!(store.sessions().is_empty());
        assert!(store.list_books().is_empty());
    }

    #[tokio::test]
    async fn append_clears_timer_in_the_same_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let store = AppStore::open_at(&path).unwrap();
        let book = store.add_book(dune()).unwrap();
        let mut frozen = TimerState::new();
        frozen.start(&book.id, Some(10), Utc::now());
        frozen.complete_session(Utc::now());
        store.save_timer(&frozen).unwrap();

        store
            .append(finished_session(&book.id), &TimerState::default())
            .await
            .unwrap();

        let reopened = AppStore::open_at(&path).unwrap();
        assert_eq!(reopened.sessions().len(), 1);
        assert_eq!(reopened.timer_state(), TimerState::default());
    }

    #[test]
    fn writers_sharing_a_file_keep_each_others_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let watcher = AppStore::open_at(&path).unwrap();
        let other = AppStore::open_at(&path).unwrap();

        other.add_book(dune()).unwrap();
        watcher.save_timer(&TimerState::new()).unwrap();
        watcher.add_book(NewBook::new("Emma")).unwrap();

        let reopened = AppStore::open_at(&path).unwrap();
        assert_eq!(reopened.list_books().len(), 2);
        assert_eq!(watcher.list_books().len(), 2);
    }

    #[test]
    fn conditional_timer_save_yields_to_other_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let watcher = AppStore::open_at(&path).unwrap();
        let other = AppStore::open_at(&path).unwrap();

        let mut running = TimerState::new();
        running.start("b1", None, Utc::now());
        watcher.save_timer(&running).unwrap();

        let mut paused = running.clone();
        paused.pause(Utc::now());
        other.save_timer(&paused).unwrap();

        let mut ticked = running.clone();
        ticked.update(Utc::now());
        assert!(!watcher.save_timer_if_unchanged(&running, &ticked).unwrap());
        assert_eq!(AppStore::open_at(&path).unwrap().timer_state(), paused);

        assert!(watcher.save_timer_if_unchanged(&paused, &TimerState::new()).unwrap());
        assert_eq!(AppStore::open_at(&path).unwrap().timer_state(), TimerState::new());
    }

    #[test]
    fn timer_state_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let mut timer = TimerState::new();
        timer.start("b1", Some(5), Utc::now());
        AppStore::open_at(&path).unwrap().save_timer(&timer).unwrap();
        assert_eq!(AppStore::open_at(&path).unwrap().timer_state(), timer);
    }
}
