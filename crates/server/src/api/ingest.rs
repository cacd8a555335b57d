//! Online/offline toggle for the order channel.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use orderdesk_core::{IngestError, IngestStatus};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<IngestStatus> {
    Json(state.ingest().status().await)
}

/// Go online: subscribe to the order channel.
pub async fn go_online(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IngestStatus>, ApiError> {
    match state.ingest().go_online().await {
        Ok(_) => Ok(Json(state.ingest().status().await)),
        Err(e @ IngestError::NotConfigured) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ IngestError::InvalidUrl(_)) => {
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Go offline: drop the channel subscription.
pub async fn go_offline(State(state): State<Arc<AppState>>) -> Json<IngestStatus> {
    state.ingest().go_offline().await;
    Json(state.ingest().status().await)
}
