//! Ordered per-phase buckets holding the orders on the board.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{Order, OrderPhase};

/// Six ordered buckets, one per [`OrderPhase`].
///
/// An id index keeps every order in exactly one bucket and makes lookups
/// cheap. Mutation is crate-private: the [`OrderBoard`](super::OrderBoard)
/// is the only writer.
#[derive(Debug, Default, Clone)]
pub struct PhaseStore {
    buckets: [Vec<Order>; 6],
    index: HashMap<String, OrderPhase>,
}

impl PhaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders in `phase`, in insertion order.
    pub fn bucket(&self, phase: OrderPhase) -> &[Order] {
        &self.buckets[phase.index()]
    }

    /// Look an order up by id, whatever its phase.
    pub fn get(&self, id: &str) -> Option<&Order> {
        let phase = self.index.get(id)?;
        self.bucket(*phase).iter().find(|o| o.id == id)
    }

    /// Phase the order is currently in.
    pub fn phase_of(&self, id: &str) -> Option<OrderPhase> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Total orders across all buckets.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Orders watched by the timer subsystem (packaging, then packed).
    pub fn timed(&self) -> impl Iterator<Item = &Order> {
        self.bucket(OrderPhase::Packaging)
            .iter()
            .chain(self.bucket(OrderPhase::Packed).iter())
    }

    /// Append an order to the bucket named by its status.
    ///
    /// Returns false (and drops the order) if the id is already on the board.
    pub(crate) fn insert(&mut self, order: Order) -> bool {
        if self.index.contains_key(&order.id) {
            return false;
        }
        self.index.insert(order.id.clone(), order.status);
        self.buckets[order.status.index()].push(order);
        true
    }

    /// Remove an order from the board, whatever its phase.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Order> {
        let phase = self.index.remove(id)?;
        let bucket = &mut self.buckets[phase.index()];
        let pos = bucket.iter().position(|o| o.id == id)?;
        Some(bucket.remove(pos))
    }

    /// Move an order from `from` to `to`, stamping the entry time of `to`.
    ///
    /// No-op (returns `None`) unless the order currently sits in `from`.
    pub(crate) fn transfer(
        &mut self,
        id: &str,
        from: OrderPhase,
        to: OrderPhase,
        at: DateTime<Utc>,
    ) -> Option<&Order> {
        if self.phase_of(id) != Some(from) {
            return None;
        }
        let source = &mut self.buckets[from.index()];
        let pos = source.iter().position(|o| o.id == id)?;
        let mut order = source.remove(pos);
        order.enter(to, at);
        self.index.insert(order.id.clone(), to);
        let dest = &mut self.buckets[to.index()];
        dest.push(order);
        dest.last()
    }
}
