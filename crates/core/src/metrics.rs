//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Ingest (frames decoded, dropped, reconnects)
//! - The order board (transitions, orders per phase)
//! - Merchant API sync

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts};

use crate::order::{OrderPhase, PhaseStore};

// =============================================================================
// Ingest Metrics
// =============================================================================

/// Orders added to the board from the channel or direct submission.
pub static ORDERS_INGESTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orderdesk_orders_ingested_total", "Total orders added to pending").unwrap()
});

/// Inbound events dropped by reason.
pub static EVENTS_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("orderdesk_events_dropped_total", "Inbound events dropped"),
        &["reason"], // "invalid_json", "missing_id", "duplicate", "unknown_order", ...
    )
    .unwrap()
});

/// Order channel reconnect attempts.
pub static INGEST_RECONNECTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderdesk_ingest_reconnects_total",
        "Order channel reconnect attempts",
    )
    .unwrap()
});

/// Order channel connected (1) or not (0).
pub static INGEST_CONNECTED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "orderdesk_ingest_connected",
        "Whether the order channel is connected",
    )
    .unwrap()
});

// =============================================================================
// Board Metrics
// =============================================================================

/// Applied transitions by operation.
pub static TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("orderdesk_transitions_total", "Applied order transitions"),
        &["kind"],
    )
    .unwrap()
});

/// Orders currently in each phase.
pub static ORDERS_BY_PHASE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("orderdesk_orders_by_phase", "Current order count by phase"),
        &["phase"],
    )
    .unwrap()
});

/// Orders with running timers (packaging or packed).
pub static TRACKED_ORDERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "orderdesk_tracked_orders",
        "Orders with an active packaging or adherence timer",
    )
    .unwrap()
});

// =============================================================================
// Merchant API Metrics
// =============================================================================

/// Status syncs that failed upstream.
pub static SYNC_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderdesk_sync_failures_total",
        "Order status updates the merchant API rejected or never received",
    )
    .unwrap()
});

/// Merchant API call duration in seconds.
pub static MERCHANT_API_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "orderdesk_merchant_api_duration_seconds",
            "Duration of merchant API calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["call", "result"],
    )
    .unwrap()
});

/// Refresh the per-phase gauges from the board.
pub fn observe_board(store: &PhaseStore) {
    for phase in OrderPhase::ALL {
        ORDERS_BY_PHASE
            .with_label_values(&[phase.as_str()])
            .set(store.bucket(phase).len() as i64);
    }
    TRACKED_ORDERS.set(store.timed().count() as i64);
}

/// All core metrics, for registration in the server registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Ingest
        Box::new(ORDERS_INGESTED.clone()),
        Box::new(EVENTS_DROPPED.clone()),
        Box::new(INGEST_RECONNECTS.clone()),
        Box::new(INGEST_CONNECTED.clone()),
        // Board
        Box::new(TRANSITIONS.clone()),
        Box::new(ORDERS_BY_PHASE.clone()),
        Box::new(TRACKED_ORDERS.clone()),
        // Merchant API
        Box::new(SYNC_FAILURES.clone()),
        Box::new(MERCHANT_API_DURATION.clone()),
    ]
}
