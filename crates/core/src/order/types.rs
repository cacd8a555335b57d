//! Core order data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of an order. Each phase is backed by one bucket of the
/// [`PhaseStore`](super::PhaseStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPhase {
    /// Waiting for the merchant to accept or reject.
    #[serde(rename = "pending")]
    Pending,
    /// Accepted; the packaging countdown is running.
    #[serde(rename = "packaging", alias = "accepted")]
    Packaging,
    /// Packed and waiting for pickup.
    #[serde(rename = "packed")]
    Packed,
    /// Handed over to delivery.
    #[serde(rename = "in-transit", alias = "in_transit", alias = "transit")]
    InTransit,
    /// Delivered. May still be returned.
    #[serde(rename = "completed")]
    Completed,
    /// Returned (terminal).
    #[serde(rename = "returned")]
    Returned,
}

impl OrderPhase {
    /// Every phase, in lifecycle order. Also the bucket display order.
    pub const ALL: [OrderPhase; 6] = [
        OrderPhase::Pending,
        OrderPhase::Packaging,
        OrderPhase::Packed,
        OrderPhase::InTransit,
        OrderPhase::Completed,
        OrderPhase::Returned,
    ];

    /// Wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPhase::Pending => "pending",
            OrderPhase::Packaging => "packaging",
            OrderPhase::Packed => "packed",
            OrderPhase::InTransit => "in-transit",
            OrderPhase::Completed => "completed",
            OrderPhase::Returned => "returned",
        }
    }

    /// Position of the phase in [`OrderPhase::ALL`].
    pub(crate) fn index(&self) -> usize {
        match self {
            OrderPhase::Pending => 0,
            OrderPhase::Packaging => 1,
            OrderPhase::Packed => 2,
            OrderPhase::InTransit => 3,
            OrderPhase::Completed => 4,
            OrderPhase::Returned => 5,
        }
    }

    /// Phases whose orders are tracked by the timer subsystem.
    pub fn is_timed(&self) -> bool {
        matches!(self, OrderPhase::Packaging | OrderPhase::Packed)
    }

    /// Returns true if no further transition leaves this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderPhase::Returned)
    }
}

impl fmt::Display for OrderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string names no known phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownPhase(pub String);

impl FromStr for OrderPhase {
    type Err = UnknownPhase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(OrderPhase::Pending),
            "accepted" | "packaging" => Ok(OrderPhase::Packaging),
            "packed" => Ok(OrderPhase::Packed),
            "in-transit" | "in_transit" | "transit" => Ok(OrderPhase::InTransit),
            "completed" => Ok(OrderPhase::Completed),
            "returned" => Ok(OrderPhase::Returned),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

/// Bucket an order is returned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnSource {
    Transit,
    Completed,
}

impl ReturnSource {
    /// The phase whose bucket the order is taken from.
    pub fn phase(&self) -> OrderPhase {
        match self {
            ReturnSource::Transit => OrderPhase::InTransit,
            ReturnSource::Completed => OrderPhase::Completed,
        }
    }
}

/// An order as placed by a customer, before it enters the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub id: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
}

/// An order on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Unique id assigned upstream; the join key for every operation.
    pub id: String,
    pub customer_name: String,
    pub items: Vec<String>,
    pub total: f64,
    /// When the customer placed the order.
    pub timestamp: DateTime<Utc>,
    pub status: OrderPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a pending order from an incoming one.
    pub fn pending(new: NewOrder) -> Self {
        Self {
            id: new.id,
            customer_name: new.customer_name,
            items: new.items,
            total: new.total,
            timestamp: new.timestamp,
            status: OrderPhase::Pending,
            accepted_at: None,
            packed_at: None,
            transit_at: None,
            completed_at: None,
            returned_at: None,
        }
    }

    /// Entry timestamp of `phase`, if the order has been there.
    pub fn entered_at(&self, phase: OrderPhase) -> Option<DateTime<Utc>> {
        match phase {
            OrderPhase::Pending => Some(self.timestamp),
            OrderPhase::Packaging => self.accepted_at,
            OrderPhase::Packed => self.packed_at,
            OrderPhase::InTransit => self.transit_at,
            OrderPhase::Completed => self.completed_at,
            OrderPhase::Returned => self.returned_at,
        }
    }

    /// Set `status` and stamp the phase entry time. An already-set stamp is kept.
    pub(crate) fn enter(&mut self, phase: OrderPhase, at: DateTime<Utc>) {
        self.status = phase;
        let slot = match phase {
            OrderPhase::Pending => return,
            OrderPhase::Packaging => &mut self.accepted_at,
            OrderPhase::Packed => &mut self.packed_at,
            OrderPhase::InTransit => &mut self.transit_at,
            OrderPhase::Completed => &mut self.completed_at,
            OrderPhase::Returned => &mut self.returned_at,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_order(id: &str) -> NewOrder {
        NewOrder {
            id: id.to_string(),
            customer_name: "Asha".to_string(),
            items: vec!["Burger".to_string(), "Fries".to_string()],
            total: 240.0,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_phase_wire_names() {
        for phase in OrderPhase::ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase.as_str()));
            assert_eq!(phase.as_str().parse::<OrderPhase>().unwrap(), phase);
        }
    }

    #[test]
    fn test_accepted_is_alias_for_packaging() {
        let phase: OrderPhase = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(phase, OrderPhase::Packaging);
        assert_eq!("Accepted".parse::<OrderPhase>().unwrap(), OrderPhase::Packaging);
    }

    #[test]
    fn test_unknown_phase() {
        let err = "shipped".parse::<OrderPhase>().unwrap_err();
        assert_eq!(err.to_string(), "unknown order status: shipped");
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, phase) in OrderPhase::ALL.iter().enumerate() {
            assert_eq!(phase.index(), i);
        }
    }

    #[test]
    fn test_pending_order_has_no_stamps() {
        let order = Order::pending(new_order("o-1"));
        assert_eq!(order.status, OrderPhase::Pending);
        assert!(order.accepted_at.is_none());
        assert_eq!(order.entered_at(OrderPhase::Pending), Some(order.timestamp));
    }

    #[test]
    fn test_enter_stamps_once() {
        let mut order = Order::pending(new_order("o-1"));
        let first = Utc::now();
        order.enter(OrderPhase::Packaging, first);
        order.enter(OrderPhase::Packaging, first + Duration::minutes(5));
        assert_eq!(order.status, OrderPhase::Packaging);
        assert_eq!(order.accepted_at, Some(first));
    }

    #[test]
    fn test_order_camel_case_wire_format() {
        let mut order = Order::pending(new_order("o-1"));
        order.enter(OrderPhase::InTransit, Utc::now());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["customerName"], "Asha");
        assert_eq!(json["status"], "in-transit");
        assert!(json.get("transitAt").is_some());
        assert!(json.get("acceptedAt").is_none());
    }
}
