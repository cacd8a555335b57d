//! Engine.IO v4 / Socket.IO v5 text packets over a WebSocket transport.
//!
//! Only what a subscribing client needs: the handshake, ping/pong, namespace
//! connect and disconnect, and JSON events. Binary attachments and acks are
//! ignored.

use serde_json::Value;

use super::event::{DecodeError, REGISTER_EVENT};

/// Engine.IO protocol revision sent in the `EIO` query parameter.
pub const ENGINE_IO_VERSION: &str = "4";
/// Default mount path of a socket.io server.
pub const SOCKET_IO_PATH: &str = "/socket.io/";
/// Socket.IO CONNECT for the default namespace.
pub const CONNECT_PACKET: &str = "40";
/// Engine.IO PONG, the answer to a server ping.
pub const PONG_PACKET: &str = "3";

/// A decoded text packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake (`0{"sid":..}`).
    Open,
    /// Engine.IO close (`1`).
    Close,
    /// Engine.IO ping (`2`).
    Ping,
    /// Namespace connection accepted (`40`).
    Connected,
    /// Namespace disconnected by the server (`41`).
    Disconnected,
    /// Event (`42["name", data]`). `data` is the first argument, or null.
    Event { name: String, data: Value },
    /// Namespace connection refused (`44`).
    ConnectError(String),
    /// Pongs, upgrades, noops, acks and binary packets.
    Ignored,
}

/// Parse one text frame.
pub fn parse_packet(text: &str) -> Result<Packet, DecodeError> {
    let mut chars = text.chars();
    match chars.next() {
        Some('0') => Ok(Packet::Open),
        Some('1') => Ok(Packet::Close),
        Some('2') => Ok(Packet::Ping),
        Some('3' | '5' | '6') => Ok(Packet::Ignored),
        Some('4') => parse_message(chars.as_str()),
        _ => Err(malformed(text)),
    }
}

fn parse_message(body: &str) -> Result<Packet, DecodeError> {
    let mut chars = body.chars();
    let kind = chars.next();
    let rest = strip_namespace(chars.as_str());
    match kind {
        Some('0') => Ok(Packet::Connected),
        Some('1') => Ok(Packet::Disconnected),
        Some('2') => parse_event(rest),
        Some('3' | '5' | '6') => Ok(Packet::Ignored),
        Some('4') => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| rest.to_string());
            Ok(Packet::ConnectError(message))
        }
        _ => Err(malformed(body)),
    }
}

/// Drop a `/namespace,` prefix; the console only uses the default namespace.
fn strip_namespace(rest: &str) -> &str {
    if rest.starts_with('/') {
        match rest.find(',') {
            Some(comma) => &rest[comma + 1..],
            None => "",
        }
    } else {
        rest
    }
}

fn parse_event(rest: &str) -> Result<Packet, DecodeError> {
    // An ack id may precede the argument array.
    let payload = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    let args: Vec<Value> =
        serde_json::from_str(payload).map_err(|e| DecodeError::InvalidJson(e.to_string()))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => return Err(malformed(rest)),
    };
    Ok(Packet::Event {
        name,
        data: args.next().unwrap_or(Value::Null),
    })
}

fn malformed(text: &str) -> DecodeError {
    DecodeError::MalformedPacket(text.chars().take(32).collect())
}

/// Encode an event for the default namespace.
pub fn event_packet(name: &str, data: &Value) -> String {
    format!("42{}", serde_json::json!([name, data]))
}

/// Registration event sent once the namespace is connected.
pub fn register_packet(merchant_id: &str) -> String {
    event_packet(REGISTER_EVENT, &Value::String(merchant_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_packets() {
        let open = r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;
        assert_eq!(parse_packet(open).unwrap(), Packet::Open);
        assert_eq!(parse_packet("1").unwrap(), Packet::Close);
        assert_eq!(parse_packet("2").unwrap(), Packet::Ping);
        assert_eq!(parse_packet("3").unwrap(), Packet::Ignored);
        assert_eq!(parse_packet("6").unwrap(), Packet::Ignored);
    }

    #[test]
    fn test_namespace_packets() {
        assert_eq!(parse_packet("40").unwrap(), Packet::Connected);
        assert_eq!(
            parse_packet(r#"40{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap(),
            Packet::Connected
        );
        assert_eq!(parse_packet("41").unwrap(), Packet::Disconnected);
        assert_eq!(
            parse_packet(r#"44{"message":"Not authorized"}"#).unwrap(),
            Packet::ConnectError("Not authorized".to_string())
        );
    }

    #[test]
    fn test_event_packet() {
        let packet = parse_packet(r#"42["newOrder",{"id":"o-1","total":5}]"#).unwrap();
        assert_eq!(
            packet,
            Packet::Event {
                name: "newOrder".to_string(),
                data: json!({ "id": "o-1", "total": 5 }),
            }
        );

        // Ack id and namespace prefixes are tolerated.
        let packet = parse_packet(r#"42/orders,7["orderStatusUpdate",{"id":"o-1"}]"#).unwrap();
        assert!(matches!(packet, Packet::Event { name, .. } if name == "orderStatusUpdate"));

        let bare = parse_packet(r#"42["merchantOnline"]"#).unwrap();
        assert_eq!(
            bare,
            Packet::Event {
                name: "merchantOnline".to_string(),
                data: Value::Null,
            }
        );
    }

    #[test]
    fn test_malformed_packets() {
        assert_eq!(parse_packet("").unwrap_err().reason(), "malformed_packet");
        assert_eq!(
            parse_packet(r#"{"event":"newOrder"}"#).unwrap_err().reason(),
            "malformed_packet"
        );
        assert_eq!(parse_packet("42[oops").unwrap_err().reason(), "invalid_json");
        assert_eq!(parse_packet("42[5]").unwrap_err().reason(), "malformed_packet");
        assert_eq!(parse_packet("49").unwrap_err().reason(), "malformed_packet");
    }

    #[test]
    fn test_register_packet() {
        assert_eq!(register_packet("m-42"), r#"42["registerMerchant","m-42"]"#);
    }
}
