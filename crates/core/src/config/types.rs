use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub merchant: MerchantConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub merchant_api: Option<MerchantApiConfig>,
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub desk: DeskConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub alert: AlertConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// The merchant this console is serving.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MerchantConfig {
    /// Merchant id, sent to the order channel on registration.
    pub id: String,
}

/// Framing spoken on the order channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum ChannelProtocol {
    /// socket.io server (Engine.IO v4 over WebSocket).
    #[default]
    #[serde(rename = "socketio")]
    SocketIo,
    /// Bare WebSocket carrying `{"event", "data"}` JSON frames.
    #[serde(rename = "json")]
    Json,
}

impl ChannelProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelProtocol::SocketIo => "socketio",
            ChannelProtocol::Json => "json",
        }
    }
}

/// Inbound order channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    /// URL of the order channel, e.g. `http://host:5000` for a socket.io
    /// server. Without it the console stays offline.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub protocol: ChannelProtocol,
    /// Go online as soon as the server starts.
    #[serde(default)]
    pub auto_connect: bool,
    /// First reconnect delay (milliseconds), doubled after every failed attempt.
    #[serde(default = "default_reconnect_initial")]
    pub reconnect_initial_ms: u64,
    /// Upper bound for the reconnect delay (milliseconds).
    #[serde(default = "default_reconnect_max")]
    pub reconnect_max_ms: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: None,
            protocol: ChannelProtocol::default(),
            auto_connect: false,
            reconnect_initial_ms: default_reconnect_initial(),
            reconnect_max_ms: default_reconnect_max(),
        }
    }
}

fn default_reconnect_initial() -> u64 {
    500
}

fn default_reconnect_max() -> u64 {
    30_000
}

/// Merchant REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MerchantApiConfig {
    /// Base URL (e.g., "http://localhost:5000/api")
    pub base_url: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u32,
    /// Load existing orders from the API when the desk starts.
    #[serde(default)]
    pub hydrate_on_start: bool,
}

fn default_api_timeout() -> u32 {
    10
}

/// Packaging and adherence thresholds.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SlaConfig {
    /// Packaging window after acceptance (seconds).
    #[serde(default = "default_packaging_window")]
    pub packaging_window_secs: u64,
    /// Elapsed minutes still rated excellent (inclusive).
    #[serde(default = "default_excellent")]
    pub excellent_max_mins: u32,
    /// Elapsed minutes still rated good (inclusive).
    #[serde(default = "default_good")]
    pub good_max_mins: u32,
    /// Elapsed minutes still rated warning (inclusive). Anything above is critical.
    #[serde(default = "default_warning")]
    pub warning_max_mins: u32,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            packaging_window_secs: default_packaging_window(),
            excellent_max_mins: default_excellent(),
            good_max_mins: default_good(),
            warning_max_mins: default_warning(),
        }
    }
}

fn default_packaging_window() -> u64 {
    600 // 10 minutes
}

fn default_excellent() -> u32 {
    10
}

fn default_good() -> u32 {
    15
}

fn default_warning() -> u32 {
    20
}

/// Desk runner configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeskConfig {
    /// Scheduler tick for timer recomputation (milliseconds).
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// Capacity of the command channel.
    #[serde(default = "default_buffer")]
    pub command_buffer: usize,
    /// Capacity of the event broadcast channel.
    #[serde(default = "default_buffer")]
    pub event_buffer: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            command_buffer: default_buffer(),
            event_buffer: default_buffer(),
        }
    }
}

fn default_tick_interval() -> u64 {
    1000
}

fn default_buffer() -> usize {
    256
}

/// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite file for the order journal. No journal when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Ring alert configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertConfig {
    /// Sound file looped while ringing (requires the `audio` feature).
    #[serde(default)]
    pub sound_path: Option<PathBuf>,
}

/// Sanitized config for API responses
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub merchant_id: String,
    pub server: ServerConfig,
    pub ingest: SanitizedIngestConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_api: Option<SanitizedMerchantApiConfig>,
    pub sla: SlaConfig,
    pub tick_interval_ms: u64,
    pub journal_enabled: bool,
}

/// Ingest config without the channel URL (it may carry credentials).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedIngestConfig {
    pub url_configured: bool,
    pub protocol: ChannelProtocol,
    pub auto_connect: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMerchantApiConfig {
    pub base_url: String,
    pub timeout_secs: u32,
    pub hydrate_on_start: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            merchant_id: config.merchant.id.clone(),
            server: config.server.clone(),
            ingest: SanitizedIngestConfig {
                url_configured: config.ingest.url.is_some(),
                protocol: config.ingest.protocol,
                auto_connect: config.ingest.auto_connect,
            },
            merchant_api: config
                .merchant_api
                .as_ref()
                .map(|api| SanitizedMerchantApiConfig {
                    base_url: api.base_url.clone(),
                    timeout_secs: api.timeout_secs,
                    hydrate_on_start: api.hydrate_on_start,
                }),
            sla: config.sla.clone(),
            tick_interval_ms: config.desk.tick_interval_ms,
            journal_enabled: config.database.path.is_some(),
        }
    }
}
