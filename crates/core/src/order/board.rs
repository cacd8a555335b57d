//! Transition engine: the typed operations that move orders between phases.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{NewOrder, Order, OrderPhase, PhaseStore, ReturnSource};

/// Which operation produced a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Accept,
    Reject,
    Pack,
    Transit,
    Complete,
    Return,
    /// Server-originated status change.
    Reconcile,
}

impl TransitionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionKind::Accept => "accept",
            TransitionKind::Reject => "reject",
            TransitionKind::Pack => "pack",
            TransitionKind::Transit => "transit",
            TransitionKind::Complete => "complete",
            TransitionKind::Return => "return",
            TransitionKind::Reconcile => "reconcile",
        }
    }
}

/// An applied transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub kind: TransitionKind,
    pub from: OrderPhase,
    /// Destination phase; `None` when the order left the board.
    pub to: Option<OrderPhase>,
    /// The order after the transition (or as it was when removed).
    pub order: Order,
}

/// Status reported by the server on an order-update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Phase(OrderPhase),
    /// Rejected or cancelled upstream: the order leaves the board.
    Cancelled,
}

/// The order board: phase store plus the transition engine.
///
/// Every operation either applies completely or not at all. Operations on an
/// order that is not in the expected source bucket return `None`, which makes
/// repeated invocations (double clicks, duplicate events) harmless.
#[derive(Debug, Default, Clone)]
pub struct OrderBoard {
    store: PhaseStore,
}

impl OrderBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the buckets.
    pub fn store(&self) -> &PhaseStore {
        &self.store
    }

    /// Add an order arriving from the channel to `pending`.
    ///
    /// Returns `None` if an order with the same id is already on the board.
    pub fn add_incoming_order(&mut self, new: NewOrder) -> Option<Order> {
        let order = Order::pending(new);
        let copy = order.clone();
        self.store.insert(order).then_some(copy)
    }

    /// Place an order fetched from the merchant API into the bucket of its status.
    ///
    /// Stamps are taken as-is. Returns false if the id is already on the board.
    pub fn hydrate(&mut self, order: Order) -> bool {
        self.store.insert(order)
    }

    /// pending → packaging, stamping `accepted_at`.
    pub fn accept_order(&mut self, id: &str, at: DateTime<Utc>) -> Option<Transition> {
        self.step(
            TransitionKind::Accept,
            id,
            OrderPhase::Pending,
            OrderPhase::Packaging,
            at,
        )
    }

    /// pending → removed. No timestamp is recorded.
    pub fn reject_order(&mut self, id: &str) -> Option<Transition> {
        if self.store.phase_of(id) != Some(OrderPhase::Pending) {
            return None;
        }
        let order = self.store.remove(id)?;
        Some(Transition {
            kind: TransitionKind::Reject,
            from: OrderPhase::Pending,
            to: None,
            order,
        })
    }

    /// packaging → packed, stamping `packed_at`.
    pub fn mark_order_packed(&mut self, id: &str, at: DateTime<Utc>) -> Option<Transition> {
        self.step(
            TransitionKind::Pack,
            id,
            OrderPhase::Packaging,
            OrderPhase::Packed,
            at,
        )
    }

    /// packed → in-transit, stamping `transit_at`.
    pub fn mark_order_in_transit(&mut self, id: &str, at: DateTime<Utc>) -> Option<Transition> {
        self.step(
            TransitionKind::Transit,
            id,
            OrderPhase::Packed,
            OrderPhase::InTransit,
            at,
        )
    }

    /// in-transit → completed, stamping `completed_at`.
    pub fn complete_order(&mut self, id: &str, at: DateTime<Utc>) -> Option<Transition> {
        self.step(
            TransitionKind::Complete,
            id,
            OrderPhase::InTransit,
            OrderPhase::Completed,
            at,
        )
    }

    /// in-transit or completed → returned, stamping `returned_at`.
    pub fn return_order(
        &mut self,
        id: &str,
        from: ReturnSource,
        at: DateTime<Utc>,
    ) -> Option<Transition> {
        self.step(
            TransitionKind::Return,
            id,
            from.phase(),
            OrderPhase::Returned,
            at,
        )
    }

    /// Apply a server-originated status change.
    ///
    /// Unknown ids and updates to the current status are no-ops. A destination
    /// stamp already present from an earlier visit is preserved.
    pub fn reconcile(
        &mut self,
        id: &str,
        status: ServerStatus,
        at: DateTime<Utc>,
    ) -> Option<Transition> {
        let current = self.store.phase_of(id)?;
        match status {
            ServerStatus::Cancelled => {
                let order = self.store.remove(id)?;
                Some(Transition {
                    kind: TransitionKind::Reconcile,
                    from: current,
                    to: None,
                    order,
                })
            }
            ServerStatus::Phase(target) if target == current => None,
            ServerStatus::Phase(target) => {
                self.step(TransitionKind::Reconcile, id, current, target, at)
            }
        }
    }

    fn step(
        &mut self,
        kind: TransitionKind,
        id: &str,
        from: OrderPhase,
        to: OrderPhase,
        at: DateTime<Utc>,
    ) -> Option<Transition> {
        let order = self.store.transfer(id, from, to, at)?.clone();
        Some(Transition {
            kind,
            from,
            to: Some(to),
            order,
        })
    }
}
