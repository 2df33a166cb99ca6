//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock network collaborators, backed by a real SQLite store in a
//! temporary directory.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use appetiser_core::{
    config::DatabaseConfig,
    create_artwork_system,
    testing::{MockContentWriter, MockSearchProvider, MockTransport},
    ArtworkConfig, ChangeNotifier, Config, SearchOrchestrator, SqliteTrackStore, StoreChange,
};
use appetiser_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use appetiser_core::testing::fixtures;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_search() {
///     let fixture = TestFixture::new().await;
///     fixture.provider.set_results(vec![fixtures::itunes_result(1, "Up")]).await;
///
///     let response = fixture.get("/api/v1/search?term=up").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Store backing the router, for direct assertions
    pub store: Arc<SqliteTrackStore>,
    /// Mock search provider - configure search results
    pub provider: Arc<MockSearchProvider>,
    /// Mock artwork transport - control fetch bodies, failures and delays
    pub transport: Arc<MockTransport>,
    /// In-memory artwork content
    pub content: Arc<MockContentWriter>,
    /// Change notifier shared with the router
    pub notifier: ChangeNotifier,
    /// Temporary directory for the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response whose body is not JSON
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture with default artwork settings.
    pub async fn new() -> Self {
        Self::with_artwork_config(ArtworkConfig::default()).await
    }

    /// Create a test fixture with custom artwork settings.
    pub async fn with_artwork_config(artwork_config: ArtworkConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            artwork: artwork_config,
            ..Default::default()
        };

        let store = Arc::new(SqliteTrackStore::new(&db_path).expect("Failed to create store"));
        let provider = Arc::new(MockSearchProvider::new());
        let transport = Arc::new(MockTransport::new());
        let content = Arc::new(MockContentWriter::new());
        let notifier = ChangeNotifier::new(config.artwork.notify_capacity);

        let (artwork, applier) = create_artwork_system(
            store.clone(),
            transport.clone(),
            content.clone(),
            notifier.clone(),
            &config.artwork,
        );
        tokio::spawn(applier.run());

        let orchestrator = SearchOrchestrator::new(
            store.clone(),
            provider.clone(),
            artwork.clone(),
            notifier.clone(),
        );

        let state = Arc::new(AppState::new(
            config,
            store.clone(),
            content.clone(),
            artwork,
            orchestrator,
            notifier.clone(),
        ));

        let router = create_router(state);

        Self {
            router,
            store,
            provider,
            transport,
            content,
            notifier,
            temp_dir,
        }
    }

    /// Wait until `count` artwork results (cached or failed) have been applied.
    ///
    /// Subscribe before triggering the search so no change is missed.
    pub async fn wait_for_artwork(
        rx: &mut tokio::sync::broadcast::Receiver<StoreChange>,
        count: usize,
    ) {
        let mut seen = 0;
        while seen < count {
            let change = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for artwork")
                .expect("notifier closed");
            if matches!(
                change,
                StoreChange::ArtworkCached { .. } | StoreChange::ArtworkFailed { .. }
            ) {
                seen += 1;
            }
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a PUT request with raw string body (for testing malformed JSON).
    pub async fn put_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("PUT")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let raw = self.send(request).await;
        TestResponse {
            status: raw.status,
            body: parse_json(&raw.bytes),
        }
    }

    /// Send a GET request and keep the body as bytes.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        let raw = self.send(request).await;

        TestResponse {
            status: raw.status,
            body: parse_json(&raw.bytes),
        }
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawResponse {
            status,
            content_type,
            bytes,
        }
    }
}

fn parse_json(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(bytes).unwrap_or(Value::Null)
    }
}
