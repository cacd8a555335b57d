//! HTTP API tests for the order board, driven through an in-process router.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::TestFixture;
use orderdesk_core::testing::{AlertCall, MockOrderApi, RecordedUpdate};
use serde_json::{json, Value};

fn incoming(id: &str) -> Value {
    json!({
        "_id": id,
        "customerName": "Asha",
        "items": ["Paneer Roll", "Lassi"],
        "total": 240.0,
        "timestamp": "2026-03-01T12:00:00Z"
    })
}

fn ids(bucket: &Value) -> Vec<String> {
    bucket
        .as_array()
        .map(|orders| {
            orders
                .iter()
                .filter_map(|o| o["id"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

/// Status sync runs in the background; wait until `count` updates arrived.
async fn wait_for_updates(api: &MockOrderApi, count: usize) -> Vec<RecordedUpdate> {
    for _ in 0..100 {
        let updates = api.recorded_updates().await;
        if updates.len() >= count {
            return updates;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    api.recorded_updates().await
}

#[tokio::test]
async fn test_health_and_config() {
    let fixture = TestFixture::new().await;

    let health = fixture.get("/api/v1/health").await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "ok");
    assert_eq!(health.body["desk_running"], true);

    let config = fixture.get("/api/v1/config").await;
    assert_eq!(config.status, StatusCode::OK);
    assert_eq!(config.body["merchant_id"], "merchant-test");
    assert_eq!(config.body["ingest"]["url_configured"], false);
    assert!(config.body.get("merchant_api").is_none());
}

#[tokio::test]
async fn test_incoming_order_lands_in_pending_and_rings() {
    let fixture = TestFixture::new().await;

    let created = fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["id"], "o-1");
    assert_eq!(created.body["status"], "pending");
    assert_eq!(created.body["customerName"], "Asha");

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(board.status, StatusCode::OK);
    assert_eq!(ids(&board.body["pending"]), vec!["o-1"]);
    assert_eq!(board.body["ringing"], true);
    assert_eq!(board.body["unread"], 1);
    assert_eq!(board.body["popup"]["current"]["id"], "o-1");
    assert_eq!(fixture.alert.calls(), vec![AlertCall::Start]);
}

#[tokio::test]
async fn test_duplicate_incoming_is_conflict() {
    let fixture = TestFixture::new().await;

    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    let again = fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;

    assert_eq!(again.status, StatusCode::CONFLICT);
    assert!(again.body["error"].as_str().unwrap().contains("o-1"));

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["pending"]).len(), 1);
    assert_eq!(board.body["unread"], 1);
}

#[tokio::test]
async fn test_invalid_incoming_payloads_are_rejected() {
    let fixture = TestFixture::new().await;

    let no_customer = fixture
        .post(
            "/api/v1/orders/incoming",
            json!({ "_id": "o-1", "total": 10.0 }),
        )
        .await;
    assert_eq!(no_customer.status, StatusCode::BAD_REQUEST);
    assert!(no_customer.body["error"]
        .as_str()
        .unwrap()
        .contains("customerName"));

    let no_id = fixture
        .post(
            "/api/v1/orders/incoming",
            json!({ "customerName": "Asha", "total": 10.0 }),
        )
        .await;
    assert_eq!(no_id.status, StatusCode::BAD_REQUEST);

    let malformed = fixture.post_raw("/api/v1/orders/incoming", "{not json").await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    let board = fixture.get("/api/v1/orders").await;
    assert!(ids(&board.body["pending"]).is_empty());
}

#[tokio::test]
async fn test_full_lifecycle_through_the_api() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;

    let accepted = fixture.post_empty("/api/v1/orders/o-1/accept").await;
    assert_eq!(accepted.status, StatusCode::OK);
    assert_eq!(accepted.body["status"], "packaging");
    assert!(accepted.body["acceptedAt"].is_string());

    let packed = fixture.post_empty("/api/v1/orders/o-1/pack").await;
    assert_eq!(packed.body["status"], "packed");

    let transit = fixture.post_empty("/api/v1/orders/o-1/transit").await;
    assert_eq!(transit.body["status"], "in-transit");

    let completed = fixture.post_empty("/api/v1/orders/o-1/complete").await;
    assert_eq!(completed.status, StatusCode::OK);
    assert_eq!(completed.body["status"], "completed");

    let returned = fixture
        .post("/api/v1/orders/o-1/return", json!({ "from": "completed" }))
        .await;
    assert_eq!(returned.status, StatusCode::OK);
    assert_eq!(returned.body["status"], "returned");
    assert_eq!(returned.body["transitAt"], transit.body["transitAt"]);

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["returned"]), vec!["o-1"]);
    for bucket in ["pending", "packaging", "packed", "in_transit", "completed"] {
        assert!(ids(&board.body[bucket]).is_empty(), "{} not empty", bucket);
    }
    assert_eq!(board.body["ringing"], false);
}

#[tokio::test]
async fn test_accept_and_reject_sync_upstream() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    fixture.post("/api/v1/orders/incoming", incoming("o-2")).await;

    fixture.post_empty("/api/v1/orders/o-1/accept").await;
    let rejected = fixture.post_empty("/api/v1/orders/o-2/reject").await;
    assert_eq!(rejected.status, StatusCode::OK);
    assert_eq!(rejected.body["id"], "o-2");

    let mut updates = wait_for_updates(&fixture.api, 2).await;
    updates.sort_by(|a, b| a.order_id.cmp(&b.order_id));
    assert_eq!(
        updates,
        vec![
            RecordedUpdate {
                order_id: "o-1".to_string(),
                status: "packaging".to_string(),
            },
            RecordedUpdate {
                order_id: "o-2".to_string(),
                status: "rejected".to_string(),
            },
        ]
    );

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["packaging"]), vec!["o-1"]);
    assert!(ids(&board.body["pending"]).is_empty());
}

#[tokio::test]
async fn test_transitions_from_wrong_phase_are_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;

    let pack_pending = fixture.post_empty("/api/v1/orders/o-1/pack").await;
    assert_eq!(pack_pending.status, StatusCode::CONFLICT);
    assert_eq!(pack_pending.body["error"], "Order o-1 is not packaging");

    fixture.post_empty("/api/v1/orders/o-1/accept").await;
    let accept_twice = fixture.post_empty("/api/v1/orders/o-1/accept").await;
    assert_eq!(accept_twice.status, StatusCode::CONFLICT);

    let unknown = fixture.post_empty("/api/v1/orders/nope/complete").await;
    assert_eq!(unknown.status, StatusCode::CONFLICT);

    let wrong_return = fixture
        .post("/api/v1/orders/o-1/return", json!({ "from": "transit" }))
        .await;
    assert_eq!(wrong_return.status, StatusCode::CONFLICT);
    assert_eq!(wrong_return.body["error"], "Order o-1 is not in-transit");

    let bad_source = fixture
        .post("/api/v1/orders/o-1/return", json!({ "from": "pending" }))
        .await;
    assert!(bad_source.status.is_client_error());

    // Nothing moved
    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["packaging"]), vec!["o-1"]);
}

#[tokio::test]
async fn test_popup_accept_walks_the_queue() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    fixture.post("/api/v1/orders/incoming", incoming("o-2")).await;

    let first = fixture.post_empty("/api/v1/popup/accept").await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["id"], "o-1");
    assert_eq!(first.body["status"], "packaging");

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(board.body["popup"]["current"]["id"], "o-2");
    assert_eq!(board.body["ringing"], true);

    let second = fixture.post_empty("/api/v1/popup/reject").await;
    assert_eq!(second.body["id"], "o-2");

    let empty = fixture.post_empty("/api/v1/popup/accept").await;
    assert_eq!(empty.status, StatusCode::CONFLICT);
    assert_eq!(empty.body["error"], "No order in popup");

    // Pending drained, so the ring cleared on its own
    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(board.body["ringing"], false);
    assert!(board.body["popup"]["current"].is_null());
    assert_eq!(
        fixture.alert.calls(),
        vec![AlertCall::Start, AlertCall::Start, AlertCall::Stop]
    );
}

#[tokio::test]
async fn test_stop_ring_keeps_orders_pending() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;

    let stopped = fixture.post_empty("/api/v1/ring/stop").await;
    assert_eq!(stopped.status, StatusCode::OK);
    assert_eq!(stopped.body["stopped"], true);

    let again = fixture.post_empty("/api/v1/ring/stop").await;
    assert_eq!(again.body["stopped"], false);

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["pending"]), vec!["o-1"]);
    assert_eq!(board.body["ringing"], false);
    assert_eq!(board.body["popup"]["current"]["id"], "o-1");
}

#[tokio::test]
async fn test_mark_seen_resets_unread() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    fixture.post("/api/v1/orders/incoming", incoming("o-2")).await;

    let seen = fixture.post_empty("/api/v1/notifications/seen").await;
    assert_eq!(seen.status, StatusCode::OK);
    assert_eq!(seen.body["cleared"], true);

    let again = fixture.post_empty("/api/v1/notifications/seen").await;
    assert_eq!(again.body["cleared"], false);

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(board.body["unread"], 0);
    assert_eq!(ids(&board.body["pending"]).len(), 2);
}

#[tokio::test]
async fn test_simulate_creates_pending_order() {
    let fixture = TestFixture::new().await;

    let simulated = fixture.post_empty("/api/v1/orders/simulate").await;
    assert_eq!(simulated.status, StatusCode::CREATED);
    let id = simulated.body["id"].as_str().unwrap().to_string();
    assert!(id.starts_with("order-"));
    assert_eq!(simulated.body["status"], "pending");

    let board = fixture.get("/api/v1/orders").await;
    assert_eq!(ids(&board.body["pending"]), vec![id]);
}

#[tokio::test]
async fn test_ingest_toggle_without_channel_url() {
    let fixture = TestFixture::new().await;

    let status = fixture.get("/api/v1/ingest").await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.body["online"], false);
    assert_eq!(status.body["configured"], false);
    assert_eq!(status.body["link"]["state"], "offline");

    let online = fixture.post_empty("/api/v1/ingest/online").await;
    assert_eq!(online.status, StatusCode::BAD_REQUEST);
    assert!(online.body["error"].is_string());

    let offline = fixture.post_empty("/api/v1/ingest/offline").await;
    assert_eq!(offline.status, StatusCode::OK);
    assert_eq!(offline.body["online"], false);
}

#[tokio::test]
async fn test_metrics_endpoint_serves_text() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let metrics = fixture.get("/api/v1/metrics").await;
    assert_eq!(metrics.status, StatusCode::OK);
}

#[tokio::test]
async fn test_timers_reported_for_packaging_orders() {
    let fixture = TestFixture::new().await;
    fixture.post("/api/v1/orders/incoming", incoming("o-1")).await;
    fixture.post_empty("/api/v1/orders/o-1/accept").await;

    let board = fixture.get("/api/v1/orders").await;
    let timers = board.body["timers"].as_array().unwrap();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers[0]["order_id"], "o-1");
}
