//! Order board API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use orderdesk_core::ingest::{decode_new_order, simulated_order};
use orderdesk_core::{DeskError, DeskSnapshot, NewOrder, Order, ReturnSource};

use super::handlers::{api_error, desk_unavailable, ApiError};
use crate::state::AppState;

/// Request body for returning an order
#[derive(Debug, Deserialize)]
pub struct ReturnOrderBody {
    /// Bucket the order is returned from
    pub from: ReturnSource,
}

/// Board snapshot: every bucket, ring and popup state, and timers.
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DeskSnapshot>, ApiError> {
    let snapshot = state.desk().snapshot().await.map_err(desk_unavailable)?;
    Ok(Json(snapshot))
}

/// Submit an order directly, with the same payload as the channel's creation event.
pub async fn create_incoming(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = decode_new_order(body, Utc::now())
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    add(&state, order).await
}

/// Fabricate a demo order and add it.
pub async fn simulate(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = simulated_order();
    info!(order_id = %order.id, "Simulating incoming order");
    add(&state, order).await
}

async fn add(state: &AppState, order: NewOrder) -> Result<(StatusCode, Json<Order>), ApiError> {
    let id = order.id.clone();
    match state.desk().add_incoming(order).await {
        Ok(Some(order)) => Ok((StatusCode::CREATED, Json(order))),
        Ok(None) => Err(api_error(
            StatusCode::CONFLICT,
            format!("Order {} already exists", id),
        )),
        Err(e) => Err(desk_unavailable(e)),
    }
}

pub async fn accept(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().accept(&id).await;
    moved(result, &id, "pending")
}

pub async fn reject(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().reject(&id).await;
    moved(result, &id, "pending")
}

pub async fn pack(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().mark_packed(&id).await;
    moved(result, &id, "packaging")
}

pub async fn transit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().mark_in_transit(&id).await;
    moved(result, &id, "packed")
}

pub async fn complete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().complete(&id).await;
    moved(result, &id, "in-transit")
}

pub async fn return_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ReturnOrderBody>,
) -> Result<Json<Order>, ApiError> {
    let result = state.desk().return_order(&id, body.from).await;
    moved(result, &id, body.from.phase().as_str())
}

/// Map a transition result: the moved order, or 409 when nothing moved.
fn moved(
    result: Result<Option<Order>, DeskError>,
    id: &str,
    expected: &str,
) -> Result<Json<Order>, ApiError> {
    match result {
        Ok(Some(order)) => Ok(Json(order)),
        Ok(None) => Err(api_error(
            StatusCode::CONFLICT,
            format!("Order {} is not {}", id, expected),
        )),
        Err(e) => Err(desk_unavailable(e)),
    }
}
