//! Ordered delivery of status changes to the merchant API.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use super::DeskEvent;
use crate::merchant_api::{status_wire_value, OrderApi};
use crate::metrics::{MERCHANT_API_DURATION, SYNC_FAILURES};
use crate::order::OrderPhase;

struct SyncJob {
    order_id: String,
    status: Option<OrderPhase>,
}

/// Sending side, held by the runner.
pub(super) struct SyncQueue {
    tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncQueue {
    /// Queue a status change behind every earlier one.
    pub(super) fn push(&self, order_id: String, status: Option<OrderPhase>) {
        if self.tx.send(SyncJob { order_id, status }).is_err() {
            warn!("Sync worker gone, status change not recorded upstream");
        }
    }
}

/// Single task draining the queue one update at a time, so the backend sees
/// an order's transitions in the order they happened.
pub(super) struct SyncWorker {
    api: Arc<dyn OrderApi>,
    rx: mpsc::UnboundedReceiver<SyncJob>,
    events: broadcast::Sender<DeskEvent>,
}

pub(super) fn sync_channel(
    api: Arc<dyn OrderApi>,
    events: broadcast::Sender<DeskEvent>,
) -> (SyncQueue, SyncWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncQueue { tx }, SyncWorker { api, rx, events })
}

impl SyncWorker {
    /// Run until the queue is dropped and drained.
    pub(super) async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            self.deliver(job).await;
        }
        debug!("Sync worker stopped");
    }

    async fn deliver(&self, job: SyncJob) {
        let SyncJob { order_id, status } = job;
        let started = Instant::now();
        let result = self.api.update_status(&order_id, status).await;
        let label = if result.is_ok() { "ok" } else { "error" };
        MERCHANT_API_DURATION
            .with_label_values(&["update_status", label])
            .observe(started.elapsed().as_secs_f64());

        if let Err(e) = result {
            let status = status_wire_value(status);
            warn!(order_id = %order_id, status, "Failed to sync order status: {}", e);
            SYNC_FAILURES.inc();
            let _ = self.events.send(DeskEvent::SyncFailed {
                order_id,
                status: status.to_string(),
                error: e.to_string(),
            });
        }
    }
}
