//! reqwest-backed merchant API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::MerchantApiConfig;
use crate::metrics::EVENTS_DROPPED;
use crate::order::{Order, OrderPhase};

use super::{status_wire_value, OrderApi, OrderApiError};

/// HTTP client for the merchant order endpoints.
pub struct HttpOrderApi {
    client: Client,
    config: MerchantApiConfig,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Vec<Value>,
}

impl OrdersResponse {
    /// Decode each order on its own; malformed entries are logged and skipped.
    fn into_orders(self) -> Vec<Order> {
        self.orders
            .into_iter()
            .filter_map(|raw| {
                let id = raw.get("id").and_then(Value::as_str).map(str::to_string);
                match serde_json::from_value::<Order>(raw) {
                    Ok(order) => Some(order),
                    Err(e) => {
                        warn!(order_id = ?id, error = %e, "Skipping unreadable order from merchant API");
                        EVENTS_DROPPED.with_label_values(&["invalid_order"]).inc();
                        None
                    }
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateStatusBody<'a> {
    order_id: &'a str,
    status: &'a str,
}

impl HttpOrderApi {
    /// Create a new client.
    pub fn new(config: MerchantApiConfig) -> Result<Self, OrderApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| OrderApiError::ConnectionFailed(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    fn map_send_error(e: reqwest::Error) -> OrderApiError {
        if e.is_timeout() {
            OrderApiError::Timeout
        } else if e.is_connect() {
            OrderApiError::ConnectionFailed(e.to_string())
        } else {
            OrderApiError::InvalidResponse(e.to_string())
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, OrderApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(OrderApiError::Http {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    async fn fetch_orders(&self) -> Result<Vec<Order>, OrderApiError> {
        let url = format!("{}/merchant/getOrders", self.base_url());
        debug!("Fetching merchant orders from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        let response = Self::check_status(response).await?;

        let body: OrdersResponse = response
            .json()
            .await
            .map_err(|e| OrderApiError::InvalidResponse(e.to_string()))?;
        Ok(body.into_orders())
    }

    async fn update_status(
        &self,
        order_id: &str,
        status: Option<OrderPhase>,
    ) -> Result<(), OrderApiError> {
        let url = format!("{}/merchant/updateOrderStatus", self.base_url());
        let body = UpdateStatusBody {
            order_id,
            status: status_wire_value(status),
        };
        debug!("Recording status {} for order {}", body.status, order_id);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;
        Self::check_status(response).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
