use tokio::sync::{broadcast, mpsc, oneshot};

use super::{DeskCommand, DeskError, DeskEvent, DeskSnapshot, IngestOutcome};
use crate::ingest::InboundEvent;
use crate::order::{NewOrder, Order, ReturnSource};

/// Handle for driving the desk
///
/// This is cheaply cloneable and can be shared across tasks.
/// Commands are sent through an async channel and applied by the DeskRunner
/// one at a time.
#[derive(Clone)]
pub struct DeskHandle {
    tx: mpsc::Sender<DeskCommand>,
    events: broadcast::Sender<DeskEvent>,
}

impl DeskHandle {
    pub(crate) fn new(tx: mpsc::Sender<DeskCommand>, events: broadcast::Sender<DeskEvent>) -> Self {
        Self { tx, events }
    }

    /// Subscribe to desk events.
    pub fn subscribe(&self) -> broadcast::Receiver<DeskEvent> {
        self.events.subscribe()
    }

    /// Whether the runner has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> DeskCommand,
    ) -> Result<T, DeskError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| DeskError::Closed)?;
        rx.await.map_err(|_| DeskError::Closed)
    }

    /// Apply a decoded channel event.
    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome, DeskError> {
        self.request(|reply| DeskCommand::Ingest { event, reply })
            .await
    }

    /// Add an order to pending and ring. `None` if the id is already on the board.
    pub async fn add_incoming(&self, order: NewOrder) -> Result<Option<Order>, DeskError> {
        self.request(|reply| DeskCommand::AddIncoming { order, reply })
            .await
    }

    pub async fn accept(&self, id: &str) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::Accept { id, reply }).await
    }

    /// Reject a pending order. Returns the discarded order.
    pub async fn reject(&self, id: &str) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::Reject { id, reply }).await
    }

    pub async fn mark_packed(&self, id: &str) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::MarkPacked { id, reply })
            .await
    }

    pub async fn mark_in_transit(&self, id: &str) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::MarkInTransit { id, reply })
            .await
    }

    pub async fn complete(&self, id: &str) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::Complete { id, reply })
            .await
    }

    pub async fn return_order(
        &self,
        id: &str,
        from: ReturnSource,
    ) -> Result<Option<Order>, DeskError> {
        let id = id.to_string();
        self.request(|reply| DeskCommand::Return { id, from, reply })
            .await
    }

    /// Silence the ring. Returns true if it was ringing.
    pub async fn stop_ring(&self) -> Result<bool, DeskError> {
        self.request(|reply| DeskCommand::StopRing { reply }).await
    }

    /// Accept the order shown in the popup.
    pub async fn popup_accept(&self) -> Result<Option<Order>, DeskError> {
        self.request(|reply| DeskCommand::PopupAccept { reply })
            .await
    }

    /// Reject the order shown in the popup.
    pub async fn popup_reject(&self) -> Result<Option<Order>, DeskError> {
        self.request(|reply| DeskCommand::PopupReject { reply })
            .await
    }

    /// Reset the unread counter.
    pub async fn mark_seen(&self) -> Result<bool, DeskError> {
        self.request(|reply| DeskCommand::MarkSeen { reply }).await
    }

    pub async fn snapshot(&self) -> Result<DeskSnapshot, DeskError> {
        self.request(|reply| DeskCommand::Snapshot { reply }).await
    }

    /// Place fetched orders on the board. Returns how many were new.
    pub async fn hydrate(&self, orders: Vec<Order>) -> Result<usize, DeskError> {
        self.request(|reply| DeskCommand::Hydrate { orders, reply })
            .await
    }
}
