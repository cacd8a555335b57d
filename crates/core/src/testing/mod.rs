//! Testing utilities and mock implementations.
//!
//! Mocks stand in for the audio device and the merchant backend so the desk
//! can be driven end to end without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use orderdesk_core::testing::{fixtures, MockAlertSink, MockOrderApi};
//!
//! let sink = MockAlertSink::new();
//! let api = MockOrderApi::new();
//!
//! let deps = DeskDeps::new(Box::new(sink.clone())).with_api(Arc::new(api.clone()));
//! let (desk, runner) = create_desk(&config, deps);
//! ```

mod mock_alert_sink;
mod mock_order_api;

pub use mock_alert_sink::{AlertCall, MockAlertSink};
pub use mock_order_api::{MockOrderApi, RecordedUpdate};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Duration, Utc};

    use crate::config::{
        AlertConfig, Config, DatabaseConfig, DeskConfig, IngestConfig, MerchantConfig,
        ServerConfig, SlaConfig,
    };
    use crate::order::{NewOrder, Order, OrderPhase};

    /// Create an incoming order with reasonable defaults.
    pub fn new_order(id: &str) -> NewOrder {
        NewOrder {
            id: id.to_string(),
            customer_name: format!("Customer {}", id),
            items: vec!["Masala Dosa".to_string(), "Filter Coffee".to_string()],
            total: 180.0,
            timestamp: Utc::now(),
        }
    }

    /// A freshly ingested pending order.
    pub fn pending_order(id: &str) -> Order {
        Order::pending(new_order(id))
    }

    /// An order that walked the normal path up to `phase`, accepted at
    /// `accepted_at` with one minute between later steps.
    ///
    /// `Returned` goes through in-transit.
    pub fn order_in(id: &str, phase: OrderPhase, accepted_at: DateTime<Utc>) -> Order {
        let mut order = pending_order(id);
        if phase == OrderPhase::Pending {
            return order;
        }
        let path = [
            OrderPhase::Packaging,
            OrderPhase::Packed,
            OrderPhase::InTransit,
            OrderPhase::Completed,
        ];
        let mut at = accepted_at;
        for step in path {
            if phase == OrderPhase::Returned && step == OrderPhase::Completed {
                break;
            }
            order.enter(step, at);
            if step == phase {
                return order;
            }
            at += Duration::minutes(1);
        }
        order.enter(OrderPhase::Returned, at);
        order
    }

    /// A config suitable for driving a desk in tests.
    ///
    /// The tick is long so timer events do not interleave with assertions.
    pub fn test_config() -> Config {
        Config {
            merchant: MerchantConfig {
                id: "merchant-test".to_string(),
            },
            server: ServerConfig::default(),
            ingest: IngestConfig::default(),
            merchant_api: None,
            sla: SlaConfig::default(),
            desk: DeskConfig {
                tick_interval_ms: 60_000,
                ..DeskConfig::default()
            },
            database: DatabaseConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}
