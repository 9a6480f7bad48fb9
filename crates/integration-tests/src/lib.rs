//! Integration test helpers for Lotkeeper.
//!
//! # Running Tests
//!
//! ```bash
//! # In-process API tests (no database needed)
//! cargo test -p lotkeeper-integration-tests
//!
//! # Include the PostgreSQL store tests
//! LOTKEEPER_TEST_DATABASE_URL=postgres://localhost/lotkeeper_test \
//!     cargo test -p lotkeeper-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `batches_api` - Batch endpoints against the in-memory store
//! - `reports_api` - Report downloads
//! - `postgres_store` - `PgBatchStore` against a real database

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

use lotkeeper_server::db::{self, BatchStore, MemoryBatchStore};
use lotkeeper_server::routes;
use lotkeeper_server::state::AppState;

/// Environment variable naming the database used by store tests.
pub const TEST_DATABASE_URL_VAR: &str = "LOTKEEPER_TEST_DATABASE_URL";

/// The full application router driven in-process.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
}

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Parse the body as JSON.
    ///
    /// # Panics
    ///
    /// Panics if the body is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// A header value as text, if present.
    #[must_use]
    pub fn header(&self, name: header::HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// App over a fresh in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryBatchStore::new()))
    }

    /// App over the given store.
    #[must_use]
    pub fn with_store(store: Arc<dyn BatchStore>) -> Self {
        Self {
            router: routes::router(AppState::new(store)),
        }
    }

    /// Send a request, optionally with a raw body.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(&self, method: Method, uri: &str, body: Option<String>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        let request = builder
            .body(body.map_or_else(Body::empty, Body::from))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body.to_string())).await
    }

    pub async fn put_json(&self, uri: &str, body: &Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(body.to_string())).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }
}

/// Connect to the test database and apply migrations.
///
/// Returns `None` when [`TEST_DATABASE_URL_VAR`] is unset so callers can
/// skip.
///
/// # Panics
///
/// Panics if the variable is set but the database is unreachable or a
/// migration fails.
pub async fn test_pool() -> Option<PgPool> {
    let url = std::env::var(TEST_DATABASE_URL_VAR).ok()?;
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../server/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    Some(pool)
}
