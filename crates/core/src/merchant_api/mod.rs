//! REST collaborator that records order decisions upstream.

mod http;

pub use http::HttpOrderApi;

use async_trait::async_trait;
use thiserror::Error;

use crate::order::{Order, OrderPhase};

#[derive(Debug, Error)]
pub enum OrderApiError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("API error (HTTP {status}): {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Merchant order endpoints of the upstream backend.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// All orders the backend knows for this merchant.
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderApiError>;

    /// Record a status decision. `None` records a rejection.
    async fn update_status(
        &self,
        order_id: &str,
        status: Option<OrderPhase>,
    ) -> Result<(), OrderApiError>;

    /// Name of this backend
    fn name(&self) -> &'static str;
}

/// Wire value sent for a status decision.
pub fn status_wire_value(status: Option<OrderPhase>) -> &'static str {
    match status {
        Some(phase) => phase.as_str(),
        None => "rejected",
    }
}
