//! WebSocket subscriber for the order channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::event::{decode_event, decode_frame, register_frame, DecodeError, InboundEvent};
use super::socketio::{
    parse_packet, register_packet, Packet, CONNECT_PACKET, ENGINE_IO_VERSION, PONG_PACKET,
    SOCKET_IO_PATH,
};
use crate::config::{ChannelProtocol, IngestConfig};
use crate::desk::DeskHandle;
use crate::metrics::{EVENTS_DROPPED, INGEST_CONNECTED, INGEST_RECONNECTS};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No order channel URL configured")]
    NotConfigured,

    #[error("Invalid order channel URL: {0}")]
    InvalidUrl(String),
}

/// Connection state of the order channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    Offline,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
}

/// Current status of the subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct IngestStatus {
    /// Whether the merchant is online (subscriber started).
    pub online: bool,
    pub configured: bool,
    pub link: LinkState,
    pub frames_received: u64,
    pub frames_dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    dropped: AtomicU64,
}

/// Starts and stops the order channel subscription ("go online"/"go offline").
///
/// While online the subscriber reconnects with exponential backoff. Frames are
/// decoded here and handed to the desk; malformed ones are dropped.
pub struct IngestController {
    url: Option<String>,
    protocol: ChannelProtocol,
    merchant_id: String,
    reconnect_initial: Duration,
    reconnect_max: Duration,
    desk: DeskHandle,
    running: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
    state: Arc<RwLock<LinkState>>,
    counters: Arc<Counters>,
    shutdown_tx: broadcast::Sender<()>,
    link_tx: broadcast::Sender<LinkState>,
}

impl IngestController {
    pub fn new(config: &IngestConfig, merchant_id: &str, desk: DeskHandle) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (link_tx, _) = broadcast::channel(64);
        Self {
            url: config.url.clone(),
            protocol: config.protocol,
            merchant_id: merchant_id.to_string(),
            reconnect_initial: Duration::from_millis(config.reconnect_initial_ms),
            reconnect_max: Duration::from_millis(config.reconnect_max_ms),
            desk,
            running: Arc::new(AtomicBool::new(false)),
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(RwLock::new(LinkState::Offline)),
            counters: Arc::new(Counters::default()),
            shutdown_tx,
            link_tx,
        }
    }

    /// Every link state change from now on.
    pub fn subscribe_link(&self) -> broadcast::Receiver<LinkState> {
        self.link_tx.subscribe()
    }

    /// Whether a channel URL is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_online(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the subscription. Returns false if already online.
    pub async fn go_online(&self) -> Result<bool, IngestError> {
        let url = self.channel_url()?;
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Order channel already online");
            return Ok(false);
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write().await = LinkState::Connecting;
        let _ = self.link_tx.send(LinkState::Connecting);

        let link = Link {
            url,
            protocol: self.protocol,
            merchant_id: self.merchant_id.clone(),
            reconnect_initial: self.reconnect_initial,
            reconnect_max: self.reconnect_max,
            desk: self.desk.clone(),
            running: Arc::clone(&self.running),
            generation,
            current_generation: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
            link_tx: self.link_tx.clone(),
            counters: Arc::clone(&self.counters),
        };
        let shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(link.run(shutdown_rx));

        info!(
            merchant_id = %self.merchant_id,
            protocol = self.protocol.as_str(),
            "Merchant online"
        );
        Ok(true)
    }

    /// Stop the subscription. Returns false if already offline.
    pub async fn go_offline(&self) -> bool {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Order channel already offline");
            return false;
        }
        let _ = self.shutdown_tx.send(());
        *self.state.write().await = LinkState::Offline;
        let _ = self.link_tx.send(LinkState::Offline);
        INGEST_CONNECTED.set(0);
        info!(merchant_id = %self.merchant_id, "Merchant offline");
        true
    }

    pub async fn status(&self) -> IngestStatus {
        IngestStatus {
            online: self.is_online(),
            configured: self.is_configured(),
            link: *self.state.read().await,
            frames_received: self.counters.received.load(Ordering::Relaxed),
            frames_dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }

    /// Channel URL with the merchant id as query parameter.
    ///
    /// For socket.io the http(s) scheme becomes ws(s), a bare host gets the
    /// default `/socket.io/` path, and the Engine.IO parameters are added.
    fn channel_url(&self) -> Result<String, IngestError> {
        let raw = self.url.as_deref().ok_or(IngestError::NotConfigured)?;
        let mut url = Url::parse(raw).map_err(|e| IngestError::InvalidUrl(e.to_string()))?;

        if self.protocol == ChannelProtocol::SocketIo {
            let ws_scheme = match url.scheme() {
                "http" => Some("ws"),
                "https" => Some("wss"),
                _ => None,
            };
            if let Some(scheme) = ws_scheme {
                url.set_scheme(scheme).map_err(|_| {
                    IngestError::InvalidUrl(format!("cannot switch {} to {}", raw, scheme))
                })?;
            }
            if url.path().is_empty() || url.path() == "/" {
                url.set_path(SOCKET_IO_PATH);
            }
            url.query_pairs_mut()
                .append_pair("EIO", ENGINE_IO_VERSION)
                .append_pair("transport", "websocket");
        }

        url.query_pairs_mut()
            .append_pair("merchantId", &self.merchant_id);
        Ok(url.into())
    }
}

type ChannelStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How a connected session ended.
enum SessionEnd {
    Shutdown,
    Disconnected,
    DeskClosed,
}

/// What to do after handling one inbound frame.
enum Step {
    Continue,
    Reply(String),
    End(SessionEnd),
}

/// One online period: connect, pump frames, reconnect until told to stop.
struct Link {
    url: String,
    protocol: ChannelProtocol,
    merchant_id: String,
    reconnect_initial: Duration,
    reconnect_max: Duration,
    desk: DeskHandle,
    running: Arc<AtomicBool>,
    generation: u64,
    current_generation: Arc<AtomicU64>,
    state: Arc<RwLock<LinkState>>,
    link_tx: broadcast::Sender<LinkState>,
    counters: Arc<Counters>,
}

impl Link {
    async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        info!("Order channel loop started");
        let mut backoff = self.reconnect_initial;
        let mut attempt: u32 = 0;

        loop {
            let connected = tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    info!("Order channel connected");
                    attempt = 0;
                    backoff = self.reconnect_initial;
                    self.set_state(LinkState::Connected).await;
                    INGEST_CONNECTED.set(1);

                    let end = self.session(stream, &mut shutdown_rx).await;
                    INGEST_CONNECTED.set(0);
                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::DeskClosed => {
                            warn!("Desk stopped, closing order channel");
                            self.running.store(false, Ordering::SeqCst);
                            break;
                        }
                        SessionEnd::Disconnected => warn!("Order channel disconnected"),
                    }
                }
                Err(e) => warn!(attempt, "Failed to connect to order channel: {}", e),
            }

            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            attempt = attempt.saturating_add(1);
            INGEST_RECONNECTS.inc();
            self.set_state(LinkState::Reconnecting { attempt }).await;
            debug!(attempt, delay_ms = backoff.as_millis() as u64, "Reconnecting order channel");

            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = next_backoff(backoff, self.reconnect_max);
            self.set_state(LinkState::Connecting).await;
        }

        self.set_state(LinkState::Offline).await;
        info!("Order channel loop stopped");
    }

    async fn session(
        &self,
        stream: ChannelStream,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> SessionEnd {
        let (mut write, mut read) = stream.split();

        // socket.io registers once the namespace handshake completes.
        if self.protocol == ChannelProtocol::Json {
            if let Err(e) = write
                .send(Message::Text(register_frame(&self.merchant_id)))
                .await
            {
                warn!("Failed to register merchant on order channel: {}", e);
                return SessionEnd::Disconnected;
            }
        }

        loop {
            let message = tokio::select! {
                _ = shutdown_rx.recv() => {
                    let _ = write.send(Message::Close(None)).await;
                    return SessionEnd::Shutdown;
                }
                message = read.next() => message,
            };

            let text = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => return SessionEnd::Disconnected,
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    warn!("Order channel read error: {}", e);
                    return SessionEnd::Disconnected;
                }
            };

            let step = match self.protocol {
                ChannelProtocol::Json => self.on_event(decode_frame(&text)).await,
                ChannelProtocol::SocketIo => self.on_packet(&text).await,
            };
            match step {
                Step::Continue => {}
                Step::Reply(reply) => {
                    if let Err(e) = write.send(Message::Text(reply)).await {
                        warn!("Order channel write error: {}", e);
                        return SessionEnd::Disconnected;
                    }
                }
                Step::End(end) => {
                    if matches!(end, SessionEnd::DeskClosed) {
                        let _ = write.send(Message::Close(None)).await;
                    }
                    return end;
                }
            }
        }
    }

    /// Handle one socket.io packet: answer the handshake and pings, decode events.
    async fn on_packet(&self, text: &str) -> Step {
        match parse_packet(text) {
            Ok(Packet::Open) => {
                debug!("Engine.IO handshake received, connecting namespace");
                Step::Reply(CONNECT_PACKET.to_string())
            }
            Ok(Packet::Ping) => Step::Reply(PONG_PACKET.to_string()),
            Ok(Packet::Connected) => {
                info!(merchant_id = %self.merchant_id, "Registering merchant on order channel");
                Step::Reply(register_packet(&self.merchant_id))
            }
            Ok(Packet::Event { name, data }) => self.on_event(decode_event(&name, data)).await,
            Ok(Packet::Disconnected) | Ok(Packet::Close) => {
                Step::End(SessionEnd::Disconnected)
            }
            Ok(Packet::ConnectError(message)) => {
                warn!("Order channel refused the namespace: {}", message);
                Step::End(SessionEnd::Disconnected)
            }
            Ok(Packet::Ignored) => Step::Continue,
            Err(e) => self.on_event(Err(e)).await,
        }
    }

    /// Apply one decoded event, or count it as dropped.
    async fn on_event(&self, decoded: Result<InboundEvent, DecodeError>) -> Step {
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let event = match decoded {
            Ok(event) => event,
            Err(e) => {
                match &e {
                    DecodeError::UnknownEvent(name) => debug!(event = %name, "Ignoring event"),
                    _ => warn!("Dropping malformed order event: {}", e),
                }
                EVENTS_DROPPED.with_label_values(&[e.reason()]).inc();
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return Step::Continue;
            }
        };

        let order_id = event.order_id().to_string();
        match self.desk.ingest(event).await {
            Ok(outcome) => {
                debug!(order_id = %order_id, ?outcome, "Order event applied");
                Step::Continue
            }
            Err(_) => Step::End(SessionEnd::DeskClosed),
        }
    }

    async fn set_state(&self, state: LinkState) {
        // A newer online period owns the state.
        if self.current_generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        if !self.running.load(Ordering::SeqCst) && state != LinkState::Offline {
            return;
        }
        let mut current = self.state.write().await;
        if *current != state {
            *current = state;
            let _ = self.link_tx.send(state);
        }
    }
}

/// Double the delay, capped at `max`.
fn next_backoff(current: Duration, max: Duration) -> Duration {
    current.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desk::{create_desk, DeskDeps};
    use crate::testing::fixtures::test_config;
    use crate::testing::MockAlertSink;

    fn controller(url: Option<&str>) -> IngestController {
        controller_with(url, ChannelProtocol::Json)
    }

    fn controller_with(url: Option<&str>, protocol: ChannelProtocol) -> IngestController {
        let (desk, _runner) = create_desk(&test_config(), DeskDeps::new(Box::new(MockAlertSink::new())));
        let config = IngestConfig {
            url: url.map(String::from),
            protocol,
            ..IngestConfig::default()
        };
        IngestController::new(&config, "m-1", desk)
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let max = Duration::from_millis(3000);
        let mut delay = Duration::from_millis(500);
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(delay.as_millis());
            delay = next_backoff(delay, max);
        }
        assert_eq!(seen, vec![500, 1000, 2000, 3000, 3000]);
    }

    #[test]
    fn test_channel_url_carries_merchant_id() {
        let ctl = controller(Some("ws://localhost:5000/orders?v=2"));
        assert_eq!(
            ctl.channel_url().unwrap(),
            "ws://localhost:5000/orders?v=2&merchantId=m-1"
        );
    }

    #[test]
    fn test_socketio_url_from_http_base() {
        let ctl = controller_with(Some("http://localhost:5000"), ChannelProtocol::SocketIo);
        assert_eq!(
            ctl.channel_url().unwrap(),
            "ws://localhost:5000/socket.io/?EIO=4&transport=websocket&merchantId=m-1"
        );

        let ctl = controller_with(
            Some("https://orders.example.com/realtime/"),
            ChannelProtocol::SocketIo,
        );
        assert_eq!(
            ctl.channel_url().unwrap(),
            "wss://orders.example.com/realtime/?EIO=4&transport=websocket&merchantId=m-1"
        );
    }

    #[tokio::test]
    async fn test_go_online_without_url() {
        let ctl = controller(None);
        assert!(matches!(ctl.go_online().await, Err(IngestError::NotConfigured)));
        assert!(!ctl.is_online());
        assert_eq!(ctl.status().await.link, LinkState::Offline);
    }

    #[tokio::test]
    async fn test_online_toggle() {
        // Nothing listens on port 9; the loop keeps retrying until offline.
        let ctl = controller(Some("ws://127.0.0.1:9/orders"));

        assert!(ctl.go_online().await.unwrap());
        assert!(!ctl.go_online().await.unwrap());
        assert!(ctl.status().await.online);

        assert!(ctl.go_offline().await);
        assert!(!ctl.go_offline().await);
        let status = ctl.status().await;
        assert!(!status.online);
        assert_eq!(status.link, LinkState::Offline);
    }
}
