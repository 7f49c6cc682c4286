use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::Event;
use crate::ports::Notifier;
use crate::timer::TimerListener;

/// Sends notifications to the tracing log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!(title, body, "notification");
        Ok(())
    }
}

/// Prints a one-line notification to stderr, keeping stdout for JSON output.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleNotifier {
    enabled: bool,
}

impl ConsoleNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let mut out = std::io::stderr().lock();
        writeln!(out, "[{title}] {body}")?;
        Ok(())
    }
}

/// Timer listener that queues goal crossings for [`GoalAlerts`].
///
/// Listeners are synchronous and notifiers are async, so the crossing is
/// handed over a channel. The engine latches the goal, so each session
/// queues at most one alert.
pub struct GoalListener {
    tx: mpsc::UnboundedSender<Event>,
}

impl TimerListener for GoalListener {
    fn on_event(&self, event: &Event) {
        if matches!(event, Event::GoalReached { .. }) && self.tx.send(event.clone()).is_err() {
            debug!("goal alert dropped, receiver closed");
        }
    }
}

/// Delivers queued goal crossings to a [`Notifier`].
pub struct GoalAlerts {
    rx: mpsc::UnboundedReceiver<Event>,
    notifier: Arc<dyn Notifier>,
    title: String,
}

/// Pair a listener for the timer with the alerts that drain it.
pub fn goal_alerts(notifier: Arc<dyn Notifier>, title: impl Into<String>) -> (GoalListener, GoalAlerts) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        GoalListener { tx },
        GoalAlerts {
            rx,
            notifier,
            title: title.into(),
        },
    )
}

impl GoalAlerts {
    /// Deliver everything queued so far. Returns how many alerts were sent.
    pub async fn deliver_pending(&mut self) -> usize {
        let mut sent = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.deliver(&event).await {
                sent += 1;
            }
        }
        sent
    }

    /// Deliver alerts as they arrive until every listener is gone.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            self.deliver(&event).await;
        }
    }

    async fn deliver(&self, event: &Event) -> bool {
        let Event::GoalReached {
            book_id, goal_secs, ..
        } = event
        else {
            return false;
        };
        let minutes = goal_secs / 60;
        let body = match book_id {
            Some(book) => format!("You read {book} for your {minutes} minute goal"),
            None => format!("You reached your {minutes} minute reading goal"),
        };
        match self.notifier.notify(&self.title, &body).await {
            Ok(()) => true,
            Err(err) => {
                warn!("goal notification failed: {err}");
                false
            }
        }
    }
}
