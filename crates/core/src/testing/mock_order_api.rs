//! Mock merchant API for testing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::merchant_api::{status_wire_value, OrderApi, OrderApiError};
use crate::order::{Order, OrderPhase};

/// A recorded status update for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedUpdate {
    pub order_id: String,
    /// Wire value sent, e.g. "accepted" or "rejected".
    pub status: String,
}

/// Mock implementation of the OrderApi trait.
///
/// # Example
///
/// ```rust,ignore
/// use orderdesk_core::testing::{MockOrderApi, fixtures};
///
/// let api = MockOrderApi::new();
/// api.set_orders(vec![fixtures::pending_order("o-1")]).await;
/// api.set_next_error(OrderApiError::Timeout).await;
///
/// // ... drive the desk ...
///
/// let updates = api.recorded_updates().await;
/// assert_eq!(updates[0].status, "accepted");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockOrderApi {
    orders: Arc<RwLock<Vec<Order>>>,
    updates: Arc<RwLock<Vec<RecordedUpdate>>>,
    /// If set, the next call fails with this error.
    next_error: Arc<RwLock<Option<OrderApiError>>>,
    /// Artificial latency of `update_status`, keyed by wire status.
    delays: Arc<RwLock<HashMap<String, Duration>>>,
}

impl MockOrderApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders returned by `fetch_orders`.
    pub async fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.write().await = orders;
    }

    /// Make the next call fail.
    pub async fn set_next_error(&self, error: OrderApiError) {
        *self.next_error.write().await = Some(error);
    }

    /// Hold every update carrying `status` for `delay` before recording it.
    pub async fn set_update_delay(&self, status: &str, delay: Duration) {
        self.delays.write().await.insert(status.to_string(), delay);
    }

    /// Updates received so far, in arrival order.
    pub async fn recorded_updates(&self) -> Vec<RecordedUpdate> {
        self.updates.read().await.clone()
    }

    async fn take_error(&self) -> Result<(), OrderApiError> {
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderApi for MockOrderApi {
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderApiError> {
        self.take_error().await?;
        Ok(self.orders.read().await.clone())
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: Option<OrderPhase>,
    ) -> Result<(), OrderApiError> {
        let status = status_wire_value(status);
        let delay = self.delays.read().await.get(status).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.updates.write().await.push(RecordedUpdate {
            order_id: order_id.to_string(),
            status: status.to_string(),
        });
        self.take_error().await
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
