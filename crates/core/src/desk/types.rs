use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::ingest::InboundEvent;
use crate::order::{NewOrder, Order, OrderPhase, PhaseStore, ReturnSource, TransitionKind};
use crate::timer::OrderTimers;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeskError {
    #[error("Desk runner is not running")]
    Closed,
}

type Reply<T> = oneshot::Sender<T>;

/// Commands processed by the desk runner, in arrival order.
#[derive(Debug)]
pub enum DeskCommand {
    Ingest {
        event: InboundEvent,
        reply: Reply<IngestOutcome>,
    },
    AddIncoming {
        order: NewOrder,
        reply: Reply<Option<Order>>,
    },
    Accept {
        id: String,
        reply: Reply<Option<Order>>,
    },
    Reject {
        id: String,
        reply: Reply<Option<Order>>,
    },
    MarkPacked {
        id: String,
        reply: Reply<Option<Order>>,
    },
    MarkInTransit {
        id: String,
        reply: Reply<Option<Order>>,
    },
    Complete {
        id: String,
        reply: Reply<Option<Order>>,
    },
    Return {
        id: String,
        from: ReturnSource,
        reply: Reply<Option<Order>>,
    },
    StopRing {
        reply: Reply<bool>,
    },
    PopupAccept {
        reply: Reply<Option<Order>>,
    },
    PopupReject {
        reply: Reply<Option<Order>>,
    },
    MarkSeen {
        reply: Reply<bool>,
    },
    Snapshot {
        reply: Reply<DeskSnapshot>,
    },
    Hydrate {
        orders: Vec<Order>,
        reply: Reply<usize>,
    },
}

/// What the desk did with an inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// New order placed in pending.
    Added(Order),
    /// Server status applied; the order moved or left the board.
    Reconciled(Order),
    /// Creation event for an id already on the board.
    Duplicate,
    /// Update for an id not on the board.
    UnknownOrder,
    /// Update to the status the order already has.
    Unchanged,
}

/// Events broadcast to subscribers (the WebSocket feed).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeskEvent {
    OrderAdded {
        order: Order,
    },
    OrderMoved {
        kind: TransitionKind,
        from: OrderPhase,
        to: OrderPhase,
        order: Order,
    },
    OrderRemoved {
        kind: TransitionKind,
        from: OrderPhase,
        order_id: String,
    },
    RingChanged {
        ringing: bool,
    },
    PopupChanged {
        current: Option<String>,
        queued: usize,
    },
    UnreadChanged {
        unread: u64,
    },
    Timers {
        timers: Vec<OrderTimers>,
    },
    Hydrated {
        count: usize,
    },
    /// A transition was applied locally but the merchant API did not record it.
    SyncFailed {
        order_id: String,
        status: String,
        error: String,
    },
}

impl DeskEvent {
    /// Get the event type as a string (for metrics labels)
    pub fn event_type(&self) -> &'static str {
        match self {
            DeskEvent::OrderAdded { .. } => "order_added",
            DeskEvent::OrderMoved { .. } => "order_moved",
            DeskEvent::OrderRemoved { .. } => "order_removed",
            DeskEvent::RingChanged { .. } => "ring_changed",
            DeskEvent::PopupChanged { .. } => "popup_changed",
            DeskEvent::UnreadChanged { .. } => "unread_changed",
            DeskEvent::Timers { .. } => "timers",
            DeskEvent::Hydrated { .. } => "hydrated",
            DeskEvent::SyncFailed { .. } => "sync_failed",
        }
    }
}

/// Popup portion of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopupView {
    pub current: Option<Order>,
    pub queued: usize,
}

/// Full read model of the desk at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeskSnapshot {
    pub pending: Vec<Order>,
    pub packaging: Vec<Order>,
    pub packed: Vec<Order>,
    pub in_transit: Vec<Order>,
    pub completed: Vec<Order>,
    pub returned: Vec<Order>,
    pub ringing: bool,
    pub popup: PopupView,
    pub unread: u64,
    pub timers: Vec<OrderTimers>,
    pub taken_at: DateTime<Utc>,
}

impl DeskSnapshot {
    pub(crate) fn buckets_from(store: &PhaseStore) -> [Vec<Order>; 6] {
        OrderPhase::ALL.map(|phase| store.bucket(phase).to_vec())
    }

    /// Orders of one phase.
    pub fn bucket(&self, phase: OrderPhase) -> &[Order] {
        match phase {
            OrderPhase::Pending => &self.pending,
            OrderPhase::Packaging => &self.packaging,
            OrderPhase::Packed => &self.packed,
            OrderPhase::InTransit => &self.in_transit,
            OrderPhase::Completed => &self.completed,
            OrderPhase::Returned => &self.returned,
        }
    }

    /// Find an order in any bucket.
    pub fn find(&self, id: &str) -> Option<&Order> {
        OrderPhase::ALL
            .into_iter()
            .flat_map(|phase| self.bucket(phase))
            .find(|o| o.id == id)
    }
}
