use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::metrics_middleware;
use super::{handlers, ingest, notifications, orders, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Order board
        .route("/orders", get(orders::list_orders))
        .route("/orders/incoming", post(orders::create_incoming))
        .route("/orders/simulate", post(orders::simulate))
        .route("/orders/{id}/accept", post(orders::accept))
        .route("/orders/{id}/reject", post(orders::reject))
        .route("/orders/{id}/pack", post(orders::pack))
        .route("/orders/{id}/transit", post(orders::transit))
        .route("/orders/{id}/complete", post(orders::complete))
        .route("/orders/{id}/return", post(orders::return_order))
        // Ring, popup and bell
        .route("/ring/stop", post(notifications::stop_ring))
        .route("/popup/accept", post(notifications::popup_accept))
        .route("/popup/reject", post(notifications::popup_reject))
        .route("/notifications/seen", post(notifications::mark_seen))
        // Order channel
        .route("/ingest", get(ingest::get_status))
        .route("/ingest/online", post(ingest::go_online))
        .route("/ingest/offline", post(ingest::go_offline))
        // Live dashboard updates
        .route("/ws", get(ws::ws_handler))
        .route_layer(middleware::from_fn(metrics_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
