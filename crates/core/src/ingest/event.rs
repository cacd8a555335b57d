//! Decoding of frames received on the order channel.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::order::{NewOrder, OrderPhase, ServerStatus};

/// Event name of an order-creation frame.
pub const NEW_ORDER_EVENT: &str = "newOrder";
/// Event name of an order-update frame.
pub const STATUS_UPDATE_EVENT: &str = "orderStatusUpdate";
/// Event name sent by the console to register with the channel.
pub const REGISTER_EVENT: &str = "registerMerchant";

/// A decoded inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// A customer placed an order.
    NewOrder(NewOrder),
    /// The server changed the status of an order.
    StatusUpdate { id: String, status: ServerStatus },
}

impl InboundEvent {
    pub fn order_id(&self) -> &str {
        match self {
            InboundEvent::NewOrder(order) => &order.id,
            InboundEvent::StatusUpdate { id, .. } => id,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("event has no order id")]
    MissingId,

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("unknown order status: {0}")]
    UnknownStatus(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

impl DecodeError {
    /// Short label used as a metric dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::InvalidJson(_) => "invalid_json",
            DecodeError::MissingId => "missing_id",
            DecodeError::MissingField(_) => "missing_field",
            DecodeError::InvalidField { .. } => "invalid_field",
            DecodeError::UnknownStatus(_) => "unknown_status",
            DecodeError::UnknownEvent(_) => "unknown_event",
            DecodeError::MalformedPacket(_) => "malformed_packet",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewOrder {
    #[serde(default, alias = "_id", alias = "orderId")]
    id: Option<Value>,
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    items: Option<Vec<String>>,
    #[serde(default)]
    total: Option<f64>,
    #[serde(default)]
    timestamp: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawStatusUpdate {
    #[serde(default, alias = "_id", alias = "orderId")]
    id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
}

/// Decode one `{"event", "data"}` text frame of a bare JSON channel.
pub fn decode_frame(text: &str) -> Result<InboundEvent, DecodeError> {
    let frame: Frame =
        serde_json::from_str(text).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    decode_event(&frame.event, frame.data)
}

/// Decode a named event and its payload, whatever framing carried it.
pub fn decode_event(name: &str, data: Value) -> Result<InboundEvent, DecodeError> {
    match name {
        NEW_ORDER_EVENT => decode_new_order(data, Utc::now()).map(InboundEvent::NewOrder),
        STATUS_UPDATE_EVENT => decode_status_update(data),
        other => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}

/// Decode the payload of an order-creation event.
///
/// `received_at` stands in for a missing creation timestamp.
pub fn decode_new_order(data: Value, received_at: DateTime<Utc>) -> Result<NewOrder, DecodeError> {
    let raw: RawNewOrder =
        serde_json::from_value(data).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let id = order_id(raw.id)?;
    let customer_name = raw
        .customer_name
        .filter(|name| !name.trim().is_empty())
        .ok_or(DecodeError::MissingField("customerName"))?;
    let total = raw.total.ok_or(DecodeError::MissingField("total"))?;
    if !total.is_finite() || total < 0.0 {
        return Err(DecodeError::InvalidField {
            field: "total",
            reason: format!("{} is not a non-negative amount", total),
        });
    }
    let timestamp = match raw.timestamp {
        Some(value) => parse_timestamp(&value)?,
        None => received_at,
    };

    Ok(NewOrder {
        id,
        customer_name,
        items: raw.items.unwrap_or_default(),
        total,
        timestamp,
    })
}

fn decode_status_update(data: Value) -> Result<InboundEvent, DecodeError> {
    let raw: RawStatusUpdate =
        serde_json::from_value(data).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;

    let id = order_id(raw.id)?;
    let status = raw.status.ok_or(DecodeError::MissingField("status"))?;
    Ok(InboundEvent::StatusUpdate {
        id,
        status: parse_server_status(&status)?,
    })
}

/// Map a server status string to a board status.
pub fn parse_server_status(status: &str) -> Result<ServerStatus, DecodeError> {
    match status.trim().to_ascii_lowercase().as_str() {
        "rejected" | "cancelled" | "canceled" => Ok(ServerStatus::Cancelled),
        other => other
            .parse::<OrderPhase>()
            .map(ServerStatus::Phase)
            .map_err(|_| DecodeError::UnknownStatus(status.to_string())),
    }
}

/// Build the registration frame sent after connecting to a bare JSON channel.
pub fn register_frame(merchant_id: &str) -> String {
    serde_json::json!({ "event": REGISTER_EVENT, "data": merchant_id }).to_string()
}

/// Ids arrive as strings or numbers; anything else, or blank, is missing.
fn order_id(value: Option<Value>) -> Result<String, DecodeError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(DecodeError::MissingId),
    }
}

/// RFC 3339 strings or epoch milliseconds.
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    let invalid = |reason: String| DecodeError::InvalidField {
        field: "timestamp",
        reason,
    };
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid(e.to_string())),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| invalid(format!("{} is not epoch milliseconds", n))),
        other => Err(invalid(format!("unexpected value {}", other))),
    }
}
