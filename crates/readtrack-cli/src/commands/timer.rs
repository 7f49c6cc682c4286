use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Subcommand;
use readtrack_core::{
    goal_alerts, AppStore, Config, ConsoleNotifier, Event, GoalAlerts, ManualScheduler, Notifier,
    PeriodicScheduler, ReadingTimer, SessionCoordinator, SystemClock, TimerError, TimerListener,
    TimerState, TokioScheduler,
};
use tracing::info;

use super::{print_json, runtime, CliResult};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start timing a book from its current page
    Start {
        /// Book ID
        book_id: String,
        /// Reading goal in minutes (defaults to timer.default_goal_minutes)
        #[arg(long)]
        goal_minutes: Option<u32>,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Print current timer state as JSON
    Status,
    /// Record that the host app went to the background
    Background,
    /// Return to the foreground and resync elapsed time
    Foreground,
    /// Abandon the open session without saving it
    Reset,
    /// Finish reading: mark the book completed and freeze the session
    Finish {
        /// Page reached
        #[arg(long)]
        page: Option<u32>,
        /// Corrected total page count
        #[arg(long)]
        total_pages: Option<u32>,
    },
    /// Save the finished session to the log and clear the timer
    Save {
        /// Last page read (defaults to the book's current page)
        #[arg(long)]
        end_page: Option<u32>,
    },
    /// Run the timer live, printing each tick until interrupted
    Watch {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

/// Collects events raised outside the command's own return value.
#[derive(Default)]
struct EventSink {
    events: Mutex<Vec<Event>>,
}

impl EventSink {
    fn drain(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

impl TimerListener for EventSink {
    fn on_event(&self, event: &Event) {
        if matches!(event, Event::GoalReached { .. }) {
            self.events
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .push(event.clone());
        }
    }
}

/// Prints every event and tick as one compact JSON line.
struct LinePrinter;

impl TimerListener for LinePrinter {
    fn on_event(&self, event: &Event) {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{line}");
        }
    }

    fn on_tick(&self, state: &TimerState) {
        let line = serde_json::json!({
            "type": "Tick",
            "book_id": state.active_book,
            "elapsed_secs": state.display_seconds,
            "goal_progress_pct": state.goal_progress_pct(),
        });
        println!("{line}");
    }
}

struct TimerSession {
    store: Arc<AppStore>,
    config: Config,
    timer: ReadingTimer,
    coordinator: SessionCoordinator,
    /// Timer state as last read from or written to the store.
    baseline: TimerState,
}

impl TimerSession {
    /// Open the store and wire the timer, coordinator and goal alerts.
    fn open(
        source: Arc<dyn PeriodicScheduler>,
    ) -> Result<(Self, GoalAlerts), Box<dyn std::error::Error>> {
        let config = Config::load_or_default();
        let store = Arc::new(AppStore::open()?);
        let baseline = store.timer_state();
        let timer = ReadingTimer::new(
            baseline.clone(),
            Arc::new(SystemClock),
            source,
            config.tick_interval(),
        );
        let notifier: Arc<dyn Notifier> =
            Arc::new(ConsoleNotifier::new(config.notifications.enabled));
        let (listener, alerts) =
            goal_alerts(notifier.clone(), config.notifications.goal_title.clone());
        timer.add_listener(Arc::new(listener));
        let coordinator =
            SessionCoordinator::new(timer.clone(), store.clone(), notifier, store.clone())
                .with_goal_title(config.notifications.goal_title.clone());
        let session = Self {
            store,
            config,
            timer,
            coordinator,
            baseline,
        };
        Ok((session, alerts))
    }

    /// Write the timer back unless another command changed it since it was
    /// read.
    fn persist(&mut self) -> Result<bool, Box<dyn std::error::Error>> {
        let next = self.timer.state();
        let saved = self.store.save_timer_if_unchanged(&self.baseline, &next)?;
        if saved {
            self.baseline = next;
        }
        Ok(saved)
    }

    fn print_or_snapshot(&self, event: Option<Event>) -> CliResult {
        match event {
            Some(event) => print_json(&event),
            None => print_json(&self.timer.snapshot()),
        }
    }
}

pub fn run(action: TimerAction) -> CliResult {
    let rt = runtime()?;
    let (mut session, mut alerts) = TimerSession::open(Arc::new(ManualScheduler::new()))?;
    let sink = Arc::new(EventSink::default());
    session.timer.add_listener(sink.clone());
    // Bring a running session up to date before applying the command.
    session.timer.tick();

    match action {
        TimerAction::Start {
            book_id,
            goal_minutes,
        } => {
            let goal = goal_minutes
                .map(|m| u64::from(m) * 60)
                .or_else(|| session.config.default_goal_secs());
            let event = rt.block_on(session.coordinator.start_reading(&book_id, goal))?;
            session.print_or_snapshot(event)?;
        }
        TimerAction::Pause => session.print_or_snapshot(session.timer.pause())?,
        TimerAction::Resume => session.print_or_snapshot(session.timer.resume()?)?,
        TimerAction::Status => print_json(&session.timer.snapshot())?,
        TimerAction::Background => session.print_or_snapshot(session.timer.enter_background())?,
        TimerAction::Foreground => {
            let events = session.timer.enter_foreground();
            if events.is_empty() {
                print_json(&session.timer.snapshot())?;
            } else {
                print_json(&events)?;
            }
        }
        TimerAction::Reset => session.print_or_snapshot(session.coordinator.abandon())?,
        TimerAction::Finish { page, total_pages } => {
            let book_id = session
                .timer
                .state()
                .active_book
                .ok_or(TimerError::NoActiveSession)?;
            let title = session
                .store
                .book(&book_id)
                .map(|b| b.title)
                .unwrap_or_else(|| book_id.clone());
            let summary = rt.block_on(session.coordinator.complete_reading_session(
                &book_id,
                &title,
                page,
                total_pages,
            ))?;
            print_json(&summary)?;
        }
        TimerAction::Save { end_page } => {
            let saved = rt.block_on(session.coordinator.save_session(end_page))?;
            print_json(&saved)?;
        }
        TimerAction::Watch { seconds } => {
            drop(session);
            drop(rt);
            return watch(seconds);
        }
    }

    for event in sink.drain() {
        print_json(&event)?;
    }
    rt.block_on(alerts.deliver_pending());
    if !session.persist()? {
        return Err("the timer was changed by another readtrack command; run this one again".into());
    }
    Ok(())
}

fn watch(seconds: Option<u64>) -> CliResult {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()?;

    rt.block_on(watch_session(seconds))
}

async fn watch_session(seconds: Option<u64>) -> CliResult {
    let (mut session, alerts) = TimerSession::open(Arc::new(TokioScheduler::new()))?;
    session.timer.add_listener(Arc::new(LinePrinter));
    let alert_task = tokio::spawn(alerts.run());
    session.timer.attach();
    if !session.timer.state().is_running {
        alert_task.abort();
        return Err(TimerError::NoActiveSession.into());
    }
    session.persist()?;
    info!("watching reading timer");

    let limit = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = limit => {}
        _ = tokio::signal::ctrl_c() => {}
    }

    session.timer.tick();
    if !session.persist()? {
        info!("timer changed by another command during watch; keeping that change");
    }
    alert_task.abort();
    Ok(())
}
