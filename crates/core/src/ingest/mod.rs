//! Inbound order channel: frame decoding, socket.io packets and the
//! online/offline subscriber.

mod event;
mod socket;
pub mod socketio;

pub use event::{
    decode_event, decode_frame, decode_new_order, parse_server_status, register_frame,
    DecodeError, InboundEvent, NEW_ORDER_EVENT, REGISTER_EVENT, STATUS_UPDATE_EVENT,
};
pub use socket::{IngestController, IngestError, IngestStatus, LinkState};

use chrono::Utc;
use uuid::Uuid;

use crate::order::NewOrder;

/// Fabricate a demo order, as the dashboard's "simulate" button does.
pub fn simulated_order() -> NewOrder {
    let id = Uuid::new_v4();
    let bytes = id.as_bytes();
    let customer = bytes[0] % 100;
    let total = 100 + u16::from_be_bytes([bytes[1], bytes[2]]) % 500;

    NewOrder {
        id: format!("order-{}", id.simple()),
        customer_name: format!("Customer {}", customer),
        items: vec!["Burger".to_string(), "Fries".to_string()],
        total: f64::from(total),
        timestamp: Utc::now(),
    }
}
