use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::sync::{sync_channel, SyncQueue, SyncWorker};
use super::{DeskCommand, DeskEvent, DeskSnapshot, IngestOutcome, PopupView};
use crate::config::SlaConfig;
use crate::ingest::InboundEvent;
use crate::journal::OrderJournal;
use crate::merchant_api::OrderApi;
use crate::metrics::{self, EVENTS_DROPPED, MERCHANT_API_DURATION, ORDERS_INGESTED, TRANSITIONS};
use crate::notify::{NoticeChange, NotificationCenter};
use crate::order::{NewOrder, Order, OrderBoard, OrderPhase, Transition, TransitionKind};
use crate::timer::compute_all;

/// Background task that owns the board and applies desk commands
pub struct DeskRunner {
    rx: mpsc::Receiver<DeskCommand>,
    events: broadcast::Sender<DeskEvent>,
    board: OrderBoard,
    notify: NotificationCenter,
    sla: SlaConfig,
    tick_interval: Duration,
    api: Option<Arc<dyn OrderApi>>,
    sync: Option<SyncQueue>,
    sync_worker: Option<SyncWorker>,
    journal: Option<Arc<dyn OrderJournal>>,
    hydrate_from_api: bool,
    timers_shown: bool,
}

pub(crate) struct RunnerParts {
    pub rx: mpsc::Receiver<DeskCommand>,
    pub events: broadcast::Sender<DeskEvent>,
    pub notify: NotificationCenter,
    pub sla: SlaConfig,
    pub tick_interval: Duration,
    pub api: Option<Arc<dyn OrderApi>>,
    pub journal: Option<Arc<dyn OrderJournal>>,
    pub hydrate_from_api: bool,
}

impl DeskRunner {
    pub(crate) fn new(parts: RunnerParts) -> Self {
        let (sync, sync_worker) = match &parts.api {
            Some(api) => {
                let (queue, worker) = sync_channel(Arc::clone(api), parts.events.clone());
                (Some(queue), Some(worker))
            }
            None => (None, None),
        };
        Self {
            rx: parts.rx,
            events: parts.events,
            board: OrderBoard::new(),
            notify: parts.notify,
            sla: parts.sla,
            tick_interval: parts.tick_interval,
            api: parts.api,
            sync,
            sync_worker,
            journal: parts.journal,
            hydrate_from_api: parts.hydrate_from_api,
            timers_shown: false,
        }
    }

    /// Run the desk, consuming commands until every handle is dropped
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Desk runner started");
        if let Some(worker) = self.sync_worker.take() {
            tokio::spawn(worker.run());
        }
        self.restore().await;

        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                _ = tick.tick() => self.on_tick(),
            }
        }

        self.notify.stop_ring();
        info!("Desk runner shutting down");
    }

    /// Restore from the journal, then pull anything new from the merchant API.
    async fn restore(&mut self) {
        if let Some(journal) = &self.journal {
            match journal.load_all() {
                Ok(orders) => {
                    let mut count = 0;
                    let mut pending = Vec::new();
                    for order in orders {
                        let id = order.id.clone();
                        let is_pending = order.status == OrderPhase::Pending;
                        if self.board.hydrate(order) {
                            count += 1;
                            if is_pending {
                                pending.push(id);
                            }
                        }
                    }
                    info!(count, pending = pending.len(), "Restored orders from journal");
                    self.notify_pending(&pending);
                }
                Err(e) => error!("Failed to load order journal: {}", e),
            }
        }

        if !self.hydrate_from_api {
            return;
        }
        let Some(api) = self.api.clone() else {
            return;
        };
        let started = Instant::now();
        match api.fetch_orders().await {
            Ok(orders) => {
                MERCHANT_API_DURATION
                    .with_label_values(&["fetch_orders", "ok"])
                    .observe(started.elapsed().as_secs_f64());
                let count = self.hydrate(orders);
                info!(count, backend = api.name(), "Hydrated orders from merchant API");
            }
            Err(e) => {
                MERCHANT_API_DURATION
                    .with_label_values(&["fetch_orders", "error"])
                    .observe(started.elapsed().as_secs_f64());
                warn!("Failed to fetch orders from merchant API: {}", e);
            }
        }
        metrics::observe_board(self.board.store());
    }

    fn handle(&mut self, command: DeskCommand) {
        let now = Utc::now();
        match command {
            DeskCommand::Ingest { event, reply } => {
                let _ = reply.send(self.ingest(event));
            }
            DeskCommand::AddIncoming { order, reply } => {
                let _ = reply.send(self.add_incoming(order));
            }
            DeskCommand::Accept { id, reply } => {
                let t = self.board.accept_order(&id, now);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::Reject { id, reply } => {
                let t = self.board.reject_order(&id);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::MarkPacked { id, reply } => {
                let t = self.board.mark_order_packed(&id, now);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::MarkInTransit { id, reply } => {
                let t = self.board.mark_order_in_transit(&id, now);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::Complete { id, reply } => {
                let t = self.board.complete_order(&id, now);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::Return { id, from, reply } => {
                let t = self.board.return_order(&id, from, now);
                let _ = reply.send(self.apply(t));
            }
            DeskCommand::StopRing { reply } => {
                let stopped = self.notify.stop_ring();
                if stopped {
                    self.emit(DeskEvent::RingChanged { ringing: false });
                }
                let _ = reply.send(stopped);
            }
            DeskCommand::PopupAccept { reply } => {
                let result = self.popup_action(|board, id| board.accept_order(id, now));
                let _ = reply.send(result);
            }
            DeskCommand::PopupReject { reply } => {
                let result = self.popup_action(|board, id| board.reject_order(id));
                let _ = reply.send(result);
            }
            DeskCommand::MarkSeen { reply } => {
                let changed = self.notify.mark_seen();
                if changed {
                    self.emit(DeskEvent::UnreadChanged { unread: 0 });
                }
                let _ = reply.send(changed);
            }
            DeskCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            DeskCommand::Hydrate { orders, reply } => {
                let count = self.hydrate(orders);
                metrics::observe_board(self.board.store());
                let _ = reply.send(count);
            }
        }
    }

    fn ingest(&mut self, event: InboundEvent) -> IngestOutcome {
        match event {
            InboundEvent::NewOrder(order) => match self.add_incoming(order) {
                Some(order) => IngestOutcome::Added(order),
                None => IngestOutcome::Duplicate,
            },
            InboundEvent::StatusUpdate { id, status } => {
                if !self.board.store().contains(&id) {
                    warn!(order_id = %id, "Status update for unknown order dropped");
                    EVENTS_DROPPED.with_label_values(&["unknown_order"]).inc();
                    return IngestOutcome::UnknownOrder;
                }
                let t = self.board.reconcile(&id, status, Utc::now());
                match self.apply(t) {
                    Some(order) => IngestOutcome::Reconciled(order),
                    None => {
                        debug!(order_id = %id, "Status update matches current phase");
                        IngestOutcome::Unchanged
                    }
                }
            }
        }
    }

    fn add_incoming(&mut self, new: NewOrder) -> Option<Order> {
        let id = new.id.clone();
        let Some(order) = self.board.add_incoming_order(new) else {
            warn!(order_id = %id, "Duplicate order dropped");
            EVENTS_DROPPED.with_label_values(&["duplicate"]).inc();
            return None;
        };

        info!(order_id = %order.id, customer = %order.customer_name, "New order received");
        ORDERS_INGESTED.inc();
        metrics::observe_board(self.board.store());
        self.journal_upsert(&order);

        let change = self.notify.on_incoming(&order.id);
        self.emit(DeskEvent::OrderAdded {
            order: order.clone(),
        });
        self.emit_notice(change);
        self.emit(DeskEvent::UnreadChanged {
            unread: self.notify.state().unread,
        });
        Some(order)
    }

    /// Run a transition on the order shown in the popup.
    fn popup_action(
        &mut self,
        op: impl FnOnce(&mut OrderBoard, &str) -> Option<Transition>,
    ) -> Option<Order> {
        let id = self.notify.popup_current()?.to_string();
        let t = op(&mut self.board, &id);
        if t.is_none() {
            // Displayed order already left pending; drop it from the queue.
            let pending_empty = self.board.store().bucket(OrderPhase::Pending).is_empty();
            let change = self.notify.on_left_pending(&id, pending_empty);
            self.emit_notice(change);
        }
        self.apply(t)
    }

    /// Side effects of an applied transition. Returns the moved order.
    fn apply(&mut self, transition: Option<Transition>) -> Option<Order> {
        let t = transition?;
        info!(
            order_id = %t.order.id,
            kind = t.kind.as_str(),
            from = t.from.as_str(),
            to = t.to.map(|p| p.as_str()).unwrap_or("removed"),
            "Order transition"
        );
        TRANSITIONS.with_label_values(&[t.kind.as_str()]).inc();
        metrics::observe_board(self.board.store());

        match t.to {
            Some(_) => self.journal_upsert(&t.order),
            None => self.journal_remove(&t.order.id),
        }

        if t.from == OrderPhase::Pending {
            let pending_empty = self.board.store().bucket(OrderPhase::Pending).is_empty();
            let change = self.notify.on_left_pending(&t.order.id, pending_empty);
            self.emit_notice(change);
        }

        match t.to {
            Some(to) => self.emit(DeskEvent::OrderMoved {
                kind: t.kind,
                from: t.from,
                to,
                order: t.order.clone(),
            }),
            None => self.emit(DeskEvent::OrderRemoved {
                kind: t.kind,
                from: t.from,
                order_id: t.order.id.clone(),
            }),
        }

        if t.to == Some(OrderPhase::Pending) && t.from != OrderPhase::Pending {
            self.notify_pending(std::slice::from_ref(&t.order.id));
        }

        if t.from.is_timed() || t.to.is_some_and(|p| p.is_timed()) {
            self.emit_timers();
        }

        // Server-originated changes are already recorded upstream.
        if t.kind != TransitionKind::Reconcile {
            if let Some(sync) = &self.sync {
                sync.push(t.order.id.clone(), t.to);
            }
        }

        Some(t.order)
    }

    fn hydrate(&mut self, orders: Vec<Order>) -> usize {
        let mut count = 0;
        let mut pending = Vec::new();
        for order in orders {
            if self.board.store().contains(&order.id) {
                continue;
            }
            self.journal_upsert(&order);
            let id = order.id.clone();
            let is_pending = order.status == OrderPhase::Pending;
            if self.board.hydrate(order) {
                count += 1;
                if is_pending {
                    pending.push(id);
                }
            }
        }
        if count > 0 {
            self.emit(DeskEvent::Hydrated { count });
        }
        self.notify_pending(&pending);
        count
    }

    /// Ring and queue orders that sit in pending without having arrived as new.
    fn notify_pending(&mut self, ids: &[String]) {
        let change = self.notify.on_pending_restored(ids.iter().map(String::as_str));
        self.emit_notice(change);
    }

    fn on_tick(&mut self) {
        self.emit_timers();
    }

    /// Broadcast current timers. An empty set is sent once, to clear the view.
    fn emit_timers(&mut self) {
        let timers = compute_all(self.board.store().timed(), Utc::now(), &self.sla);
        if timers.is_empty() && !self.timers_shown {
            return;
        }
        self.timers_shown = !timers.is_empty();
        self.emit(DeskEvent::Timers { timers });
    }

    fn emit_notice(&self, change: NoticeChange) {
        if change.ring {
            self.emit(DeskEvent::RingChanged {
                ringing: self.notify.is_ringing(),
            });
        }
        if change.popup {
            let state = self.notify.state();
            self.emit(DeskEvent::PopupChanged {
                current: state.popup_current,
                queued: state.popup_queued,
            });
        }
    }

    fn emit(&self, event: DeskEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> DeskSnapshot {
        let store = self.board.store();
        let now = Utc::now();
        let notice = self.notify.state();
        let [pending, packaging, packed, in_transit, completed, returned] =
            DeskSnapshot::buckets_from(store);

        DeskSnapshot {
            pending,
            packaging,
            packed,
            in_transit,
            completed,
            returned,
            ringing: notice.ringing,
            popup: PopupView {
                current: notice
                    .popup_current
                    .as_deref()
                    .and_then(|id| store.get(id))
                    .cloned(),
                queued: notice.popup_queued,
            },
            unread: notice.unread,
            timers: compute_all(store.timed(), now, &self.sla),
            taken_at: now,
        }
    }

    fn journal_upsert(&self, order: &Order) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.upsert(order) {
                error!(order_id = %order.id, "Failed to journal order: {}", e);
            }
        }
    }

    fn journal_remove(&self, order_id: &str) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.remove(order_id) {
                error!(order_id, "Failed to remove order from journal: {}", e);
            }
        }
    }
}
