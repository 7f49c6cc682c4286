//! Integration tests for a full reading session: library, timer, completion
//! and the persisted snapshot.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use readtrack_core::{
    AppStore, BookStatus, Event, LogNotifier, ManualClock, ManualScheduler, NewBook,
    ReadingStats, ReadingTimer, SessionCoordinator, TimerState, DEFAULT_TICK_INTERVAL,
};

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 14, 20, 30, 0).unwrap(),
    ))
}

#[tokio::test]
async fn test_full_reading_session_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("readtrack.db");
    let clock = clock();
    let source = Arc::new(ManualScheduler::new());

    let store = Arc::new(AppStore::open_at(&db_path).unwrap().with_clock(clock.clone()));
    let book = store
        .add_book(NewBook {
            title: "The Left Hand of Darkness".into(),
            author: Some("Ursula K. Le Guin".into()),
            current_page: Some(42),
            total_pages: Some(304),
        })
        .unwrap();

    let timer = ReadingTimer::new(
        store.timer_state(),
        clock.clone(),
        source.clone(),
        DEFAULT_TICK_INTERVAL,
    );
    let coordinator = SessionCoordinator::new(
        timer.clone(),
        store.clone(),
        Arc::new(LogNotifier),
        store.clone(),
    );

    coordinator.start_reading(&book.id, Some(60)).await.unwrap();
    for _ in 0..90 {
        clock.advance_secs(1);
        source.fire();
    }
    // A pause in the middle does not count.
    timer.pause();
    clock.advance_secs(600);
    timer.resume().unwrap();
    for _ in 0..30 {
        clock.advance_secs(1);
        source.fire();
    }
    assert_eq!(timer.state().display_seconds, 120);
    assert!(timer.state().goal_reached);
    store.save_timer(&timer.state()).unwrap();

    let summary = coordinator
        .complete_reading_session(&book.id, &book.title, Some(88), None)
        .await
        .unwrap();
    assert_eq!(summary.elapsed_secs, 120);
    assert!(matches!(summary.event, Some(Event::SessionCompleted { .. })));

    let saved = coordinator.save_session(None).await.unwrap();
    store.save_timer(&timer.state()).unwrap();
    assert_eq!(saved.end_page, Some(88));
    assert_eq!(saved.pages_read(), Some(46));

    // Everything survives a reopen.
    let reopened = AppStore::open_at(&db_path).unwrap();
    assert_eq!(reopened.timer_state(), TimerState::default());
    assert_eq!(reopened.book(&book.id).unwrap().status, BookStatus::Completed);
    let sessions = reopened.sessions_for(&book.id);
    assert_eq!(sessions.len(), 1);

    let stats = ReadingStats::from_sessions(&sessions, clock_today());
    assert_eq!(stats.total_seconds, 120);
    assert_eq!(stats.total_pages, 46);
}

fn clock_today() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
}

#[test]
fn test_running_session_survives_process_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("readtrack.db");
    let clock = clock();

    {
        let store = AppStore::open_at(&db_path).unwrap();
        let timer = ReadingTimer::new(
            TimerState::new(),
            clock.clone(),
            Arc::new(ManualScheduler::new()),
            DEFAULT_TICK_INTERVAL,
        );
        timer.start("book-1", Some(7)).unwrap();
        clock.advance_secs(25);
        timer.tick();
        timer.enter_background();
        store.save_timer(&timer.state()).unwrap();
    }

    // The process was gone for five minutes.
    clock.advance_secs(300);

    let store = AppStore::open_at(&db_path).unwrap();
    let source = Arc::new(ManualScheduler::new());
    let timer = ReadingTimer::new(
        store.timer_state(),
        clock.clone(),
        source.clone(),
        DEFAULT_TICK_INTERVAL,
    );
    let events = timer.attach();

    assert!(events
        .iter()
        .any(|e| matches!(e, Event::ForegroundResynced { elapsed_secs: 325, .. })));
    let state = timer.state();
    assert_eq!(state.display_seconds, 325);
    assert!(!state.is_background_active);
    assert!(timer.is_ticking());
    assert_eq!(state.start_page, Some(7));
}
