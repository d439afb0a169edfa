//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with a scripted packaging tool, so batches run without Python.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use exeforge_core::{
    testing::{MockIconConverter, MockPackager},
    BatchCoordinator, Config, CoordinatorConfig, JobRunner,
};
use exeforge_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use exeforge_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new();
///     let script = fixture.script("app.py");
///
///     let response = fixture.post("/api/v1/batches", json!({
///         "scripts": [script],
///     })).await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state, for direct access to the coordinator
    pub state: Arc<AppState>,
    /// Mock packaging tool - script runs per executable name
    pub packager: Arc<MockPackager>,
    /// Mock icon converter
    pub icons: Arc<MockIconConverter>,
    /// Temporary directory holding scripts and outputs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub fn new() -> Self {
        Self::with_batch_config(CoordinatorConfig::default())
    }

    /// Create a test fixture with a custom coordinator configuration.
    pub fn with_batch_config(batch: CoordinatorConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let packager = Arc::new(MockPackager::new());
        let icons = Arc::new(MockIconConverter::new());

        let mut config = Config::default();
        config.batch = batch.clone();
        config.logging.file = None;

        let runner = JobRunner::new(packager.clone(), icons.clone());
        let coordinator = BatchCoordinator::new(batch, runner);
        let state = Arc::new(AppState::new(config, coordinator));
        let router = create_router(Arc::clone(&state));

        Self {
            router,
            state,
            packager,
            icons,
            temp_dir,
        }
    }

    /// Writes a script into the fixture directory.
    pub fn script(&self, name: &str) -> PathBuf {
        fixtures::script(self.temp_dir.path(), name)
    }

    /// Waits until the current batch has completed.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.state.coordinator().wait_idle())
            .await
            .expect("batch did not complete in time");
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

    /// Send a GET request and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).to_string())
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

        self.send(request_builder.body(body).unwrap()).await
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
