use std::sync::Arc;

use chrono::{DateTime, Utc};
use orderdesk_core::{Config, DeskHandle, IngestController, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    desk: DeskHandle,
    ingest: Arc<IngestController>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, desk: DeskHandle, ingest: Arc<IngestController>) -> Self {
        Self {
            config,
            desk,
            ingest,
            started_at: Utc::now(),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn desk(&self) -> &DeskHandle {
        &self.desk
    }

    pub fn ingest(&self) -> &IngestController {
        self.ingest.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
