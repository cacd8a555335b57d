//! WebSocket support for real-time dashboard updates.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use orderdesk_core::{DeskEvent, DeskSnapshot};

use crate::metrics::{WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL, WS_LAG_EVENTS, WS_MESSAGES_SENT};
use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// WebSocket message sent to clients.
///
/// Desk events are forwarded as-is; the server adds the initial snapshot
/// and a periodic heartbeat. Both share the `type` tag.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum WsMessage {
    Desk(DeskEvent),
    Server(ServerMessage),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full board state, sent once on connect.
    Snapshot { snapshot: DeskSnapshot },
    /// Server heartbeat (sent periodically to keep connection alive).
    Heartbeat { timestamp: i64 },
}

impl WsMessage {
    pub fn msg_type(&self) -> &'static str {
        match self {
            WsMessage::Desk(event) => event.event_type(),
            WsMessage::Server(ServerMessage::Snapshot { .. }) => "snapshot",
            WsMessage::Server(ServerMessage::Heartbeat { .. }) => "heartbeat",
        }
    }
}

/// WebSocket upgrade handler.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a single WebSocket connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so nothing falls between the two
    let mut rx = state.desk().subscribe();

    WS_CONNECTIONS_TOTAL.inc();
    WS_CONNECTIONS_ACTIVE.inc();

    info!("WebSocket client connected");

    let initial = match state.desk().snapshot().await {
        Ok(snapshot) => Some(WsMessage::Server(ServerMessage::Snapshot { snapshot })),
        Err(e) => {
            warn!("No snapshot for WebSocket client: {}", e);
            None
        }
    };

    let send_task = tokio::spawn(async move {
        if let Some(msg) = initial {
            if !send(&mut sender, &msg).await {
                return;
            }
        }

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            let msg = tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => WsMessage::Desk(event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("WebSocket client lagged, skipped {} messages", n);
                            WS_LAG_EVENTS.inc();
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Desk event channel closed");
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    WsMessage::Server(ServerMessage::Heartbeat {
                        timestamp: chrono::Utc::now().timestamp(),
                    })
                }
            };

            if !send(&mut sender, &msg).await {
                break;
            }
        }
    });

    // Handle incoming messages from client (ping/pong, close)
    while let Some(result) = receiver.next().await {
        match result {
            Ok(Message::Close(_)) => {
                debug!("WebSocket client requested close");
                break;
            }
            Ok(Message::Text(text)) => {
                debug!("Received text message: {}", text);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("WebSocket receive error: {}", e);
                break;
            }
        }
    }

    send_task.abort();
    WS_CONNECTIONS_ACTIVE.dec();
    info!("WebSocket client disconnected");
}

/// Serialize and send one message. Returns false once the client is gone.
async fn send<S>(sender: &mut S, msg: &WsMessage) -> bool
where
    S: futures::Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => {
            WS_MESSAGES_SENT.with_label_values(&[msg.msg_type()]).inc();
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("WebSocket send failed, client disconnected");
                return false;
            }
            true
        }
        Err(e) => {
            error!("Failed to serialize WsMessage: {}", e);
            true
        }
    }
}
