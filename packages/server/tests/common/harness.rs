//! Test harness wiring the HTTP app to in-memory dependencies.
//!
//! Every test gets its own mocks, call log and preferences file, so tests
//! can run in parallel without sharing state.

use anyhow::{Context, Result};
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use server_core::domains::preferences::PreferenceStore;
use server_core::domains::providers::RetryPolicy;
use server_core::kernel::TestDependencies;
use server_core::server::{build_app, AxumAppState};
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tower::ServiceExt;

pub const TEST_ASSISTANT_ID: &str = "assistant-test";
pub const MULTIPART_BOUNDARY: &str = "----onboarding-test-boundary";

/// Test harness that manages test infrastructure.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let (status, body) = ctx.get("/health").await;
/// }
/// ```
pub struct TestHarness {
    pub deps: TestDependencies,
    pub state: AxumAppState,
    _preferences_dir: TempDir,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        // Preferences directory is removed on drop
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        Self::with_deps(TestDependencies::new()).await
    }

    /// Build a harness around pre-configured mocks (failure injection etc).
    pub async fn with_deps(deps: TestDependencies) -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let preferences_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let preferences =
            PreferenceStore::init(preferences_dir.path().join("preferences.json")).await?;

        let state = AxumAppState::new(
            deps.into_server_deps(),
            RetryPolicy::immediate(3),
            preferences,
            Some(TEST_ASSISTANT_ID.to_string()),
        );

        Ok(Self {
            deps,
            state,
            _preferences_dir: preferences_dir,
        })
    }

    pub fn app(&self) -> Router {
        build_app(self.state.clone(), &[])
    }

    /// Send a request and decode the JSON body (`Null` when empty).
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .app()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::GET, uri, None)).await
    }

    pub async fn get_authed(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::GET, uri, Some(token))).await
    }

    pub async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::POST, uri, None)).await
    }

    pub async fn post_authed(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::POST, uri, Some(token))).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(empty_request(Method::DELETE, uri, None)).await
    }

    pub async fn json(&self, method: Method, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send(request).await
    }

    /// Multipart upload with a single `file` field.
    pub async fn upload(
        &self,
        uri: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(multipart_body(file_name, content_type, data)))
            .expect("valid request");
        self.send(request).await
    }

    /// Create a wizard session and return its id.
    pub async fn create_session(&self) -> String {
        let (status, body) = self.post("/api/registrations").await;
        assert_eq!(status, StatusCode::CREATED, "create session: {}", body);
        body["id"].as_str().expect("session id").to_string()
    }
}

fn empty_request(method: Method, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).expect("valid request")
}

fn multipart_body(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: {c}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            f = file_name,
            c = content_type,
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}
