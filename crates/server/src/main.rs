use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use orderdesk_core::{
    create_desk, load_config, validate_config, AlertSink, Config, DeskDeps, HttpOrderApi,
    IngestController, LogAlertSink, OrderApi, OrderJournal, SqliteOrderJournal,
};
use orderdesk_server::api::create_router;
use orderdesk_server::state::AppState;

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait for the desk runner to drain after the server stops.
const DESK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ORDERDESK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        merchant_id = %config.merchant.id,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );

    let alert = build_alert_sink(&config)?;
    info!("Using alert sink: {}", alert.name());

    let mut deps = DeskDeps::new(alert);

    if let Some(api_config) = &config.merchant_api {
        info!("Initializing merchant API client at {}", api_config.base_url);
        let api: Arc<dyn OrderApi> = Arc::new(
            HttpOrderApi::new(api_config.clone()).context("Failed to create merchant API client")?,
        );
        deps = deps.with_api(api);
    } else {
        info!("No merchant API configured, status changes stay local");
    }

    if let Some(path) = &config.database.path {
        let journal: Arc<dyn OrderJournal> = Arc::new(
            SqliteOrderJournal::new(path).context("Failed to open order journal")?,
        );
        info!("Order journal at {:?}", path);
        deps = deps.with_journal(journal);
    } else {
        info!("No database configured, orders are kept in memory only");
    }

    // Create the desk and spawn its runner
    let (desk, runner) = create_desk(&config, deps);
    let runner_handle = tokio::spawn(runner.run());
    info!("Desk runner started");

    // Order channel subscriber
    let ingest = Arc::new(IngestController::new(
        &config.ingest,
        &config.merchant.id,
        desk.clone(),
    ));
    if config.ingest.auto_connect {
        match ingest.go_online().await {
            Ok(_) => info!("Order channel auto-connect started"),
            Err(e) => warn!("Order channel auto-connect skipped: {}", e),
        }
    } else if ingest.is_configured() {
        info!("Order channel configured, staying offline until toggled");
    }

    let state = Arc::new(AppState::new(config.clone(), desk, Arc::clone(&ingest)));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    ingest.go_offline().await;
    drop(ingest);

    // The runner exits once every DeskHandle is gone.
    match tokio::time::timeout(DESK_DRAIN_TIMEOUT, runner_handle).await {
        Ok(_) => info!("Desk runner stopped"),
        Err(_) => warn!("Desk runner still busy after shutdown, exiting anyway"),
    }

    Ok(())
}

#[cfg(feature = "audio")]
fn build_alert_sink(config: &Config) -> Result<Box<dyn AlertSink>> {
    use orderdesk_core::notify::RodioAlertSink;

    match &config.alert.sound_path {
        Some(path) => {
            let sink =
                RodioAlertSink::new(path.clone()).context("Failed to load ring sound")?;
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(LogAlertSink)),
    }
}

#[cfg(not(feature = "audio"))]
fn build_alert_sink(config: &Config) -> Result<Box<dyn AlertSink>> {
    if config.alert.sound_path.is_some() {
        warn!("alert.sound_path is set but audio support is not compiled in");
    }
    Ok(Box::new(LogAlertSink))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
