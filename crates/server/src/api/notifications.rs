//! Ring, popup and bell handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use orderdesk_core::{DeskError, Order};

use super::handlers::{api_error, desk_unavailable, ApiError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StopRingResponse {
    /// Whether the ring was active before the call.
    pub stopped: bool,
}

#[derive(Debug, Serialize)]
pub struct SeenResponse {
    pub cleared: bool,
}

pub async fn stop_ring(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StopRingResponse>, ApiError> {
    let stopped = state.desk().stop_ring().await.map_err(desk_unavailable)?;
    Ok(Json(StopRingResponse { stopped }))
}

pub async fn popup_accept(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Order>, ApiError> {
    popup_result(state.desk().popup_accept().await)
}

pub async fn popup_reject(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Order>, ApiError> {
    popup_result(state.desk().popup_reject().await)
}

pub async fn mark_seen(State(state): State<Arc<AppState>>) -> Result<Json<SeenResponse>, ApiError> {
    let cleared = state.desk().mark_seen().await.map_err(desk_unavailable)?;
    Ok(Json(SeenResponse { cleared }))
}

fn popup_result(result: Result<Option<Order>, DeskError>) -> Result<Json<Order>, ApiError> {
    match result {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(api_error(StatusCode::CONFLICT, "No order in popup")),
        Err(e) => Err(desk_unavailable(e)),
    }
}
