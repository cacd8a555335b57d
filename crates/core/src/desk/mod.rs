//! The desk: a single task owning the order board and notification state.
//!
//! All mutations go through [`DeskHandle`] commands and are applied by the
//! [`DeskRunner`] one at a time, so a transition is never observed half-done.
//! A scheduler tick recomputes packaging countdowns and adherence for every
//! tracked order.

mod handle;
mod runner;
mod sync;
mod types;

pub use handle::DeskHandle;
pub use runner::DeskRunner;
pub use types::{DeskCommand, DeskError, DeskEvent, DeskSnapshot, IngestOutcome, PopupView};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::config::Config;
use crate::journal::OrderJournal;
use crate::merchant_api::OrderApi;
use crate::notify::{AlertSink, NotificationCenter};
use runner::RunnerParts;

/// Collaborators of the desk runner.
pub struct DeskDeps {
    pub alert: Box<dyn AlertSink>,
    pub api: Option<Arc<dyn OrderApi>>,
    pub journal: Option<Arc<dyn OrderJournal>>,
}

impl DeskDeps {
    pub fn new(alert: Box<dyn AlertSink>) -> Self {
        Self {
            alert,
            api: None,
            journal: None,
        }
    }

    pub fn with_api(mut self, api: Arc<dyn OrderApi>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_journal(mut self, journal: Arc<dyn OrderJournal>) -> Self {
        self.journal = Some(journal);
        self
    }
}

/// Create a complete desk
///
/// Returns:
/// - `DeskHandle` - for sending commands and subscribing to events (clone this to share across tasks)
/// - `DeskRunner` - spawn this as a background task with `tokio::spawn(runner.run())`
pub fn create_desk(config: &Config, deps: DeskDeps) -> (DeskHandle, DeskRunner) {
    let (tx, rx) = mpsc::channel(config.desk.command_buffer);
    let (events, _) = broadcast::channel(config.desk.event_buffer);

    let handle = DeskHandle::new(tx, events.clone());
    let runner = DeskRunner::new(RunnerParts {
        rx,
        events,
        notify: NotificationCenter::new(deps.alert),
        sla: config.sla.clone(),
        tick_interval: Duration::from_millis(config.desk.tick_interval_ms),
        api: deps.api,
        journal: deps.journal,
        hydrate_from_api: config
            .merchant_api
            .as_ref()
            .is_some_and(|api| api.hydrate_on_start),
    });
    (handle, runner)
}
