//! Common test utilities for driving the HTTP API in-process.
//!
//! The fixture runs a real desk with mock collaborators, so requests go
//! through the same command path as production without audio or network.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use orderdesk_core::testing::{MockAlertSink, MockOrderApi};
use orderdesk_core::{create_desk, Config, DeskDeps, DeskHandle, IngestController, OrderApi};
use orderdesk_server::state::AppState;

/// Re-export fixtures for test convenience
pub use orderdesk_core::testing::fixtures;

/// Test fixture with a running desk behind the router.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_accept() {
///     let fixture = TestFixture::new().await;
///
///     fixture.post("/api/v1/orders/simulate", json!({})).await;
///     let board = fixture.get("/api/v1/orders").await;
///
///     assert_eq!(board.body["pending"].as_array().unwrap().len(), 1);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Desk handle shared with the router
    pub desk: DeskHandle,
    /// Mock merchant API - inspect synced status updates
    pub api: MockOrderApi,
    /// Mock alert sink - inspect ring start/stop
    pub alert: MockAlertSink,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with the default test config.
    pub async fn new() -> Self {
        Self::with_config(fixtures::test_config()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(config: Config) -> Self {
        let api = MockOrderApi::new();
        let alert = MockAlertSink::new();

        let deps = DeskDeps::new(Box::new(alert.clone()))
            .with_api(Arc::new(api.clone()) as Arc<dyn OrderApi>);
        let (desk, runner) = create_desk(&config, deps);
        tokio::spawn(runner.run());

        let ingest = Arc::new(IngestController::new(
            &config.ingest,
            &config.merchant.id,
            desk.clone(),
        ));

        let state = Arc::new(AppState::new(config, desk.clone(), ingest));
        let router = orderdesk_server::api::create_router(state);

        Self {
            router,
            desk,
            api,
            alert,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
