//! Test application setup utilities
//!
//! Each test gets its own SQLite file and a router built exactly like the
//! production one, driven through `tower::ServiceExt::oneshot`. Requests
//! carry a Host header because tenant resolution is host-driven.

use std::sync::Arc;

use axum::{body::Body, http::Request, Router};
use tower::ServiceExt;
use uuid::Uuid;

use worklane_tenancy::{
    config::{AppConfig, AuthConfig, DatabaseConfig, LoggingConfig, ServerConfig, TenancyConfig},
    create_router, db,
    middleware::create_access_token,
    services::ScopedBroadcaster,
    AppState,
};

/// JWT secret used by all test tokens
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with an isolated SQLite database
    pub async fn new() -> Self {
        let config = test_config();
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = AppState {
            config,
            db,
            broadcast: Arc::new(ScopedBroadcaster::new()),
        };

        let router = create_router(state.clone());

        Self { router, state }
    }

    /// Create a bearer token for a principal
    pub fn token_for(&self, principal_id: Uuid) -> String {
        create_access_token(
            &principal_id,
            Some("test@example.com"),
            TEST_JWT_SECRET,
            1,
        )
        .expect("Failed to create test token")
    }

    /// Make a GET request
    pub async fn get(&self, uri: &str, host: &str, token: Option<&str>) -> TestResponse {
        self.request(build_request("GET", uri, host, token, None)).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(
        &self,
        uri: &str,
        host: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request(build_request("POST", uri, host, token, Some(body)))
            .await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json(
        &self,
        uri: &str,
        host: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> TestResponse {
        self.request(build_request("PUT", uri, host, token, Some(body)))
            .await
    }

    /// Make a DELETE request
    pub async fn delete(&self, uri: &str, host: &str, token: Option<&str>) -> TestResponse {
        self.request(build_request("DELETE", uri, host, token, None))
            .await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request");

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");

        TestResponse { status, body }
    }
}

fn build_request(
    method: &str,
    uri: &str,
    host: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header("Host", host);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: axum::http::StatusCode,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: axum::http::StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    pub fn assert_ok(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::OK)
    }

    pub fn assert_created(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::CREATED)
    }

    pub fn assert_unauthorized(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::UNAUTHORIZED)
    }

    pub fn assert_forbidden(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::FORBIDDEN)
    }

    pub fn assert_not_found(&self) -> &Self {
        self.assert_status(axum::http::StatusCode::NOT_FOUND)
    }
}

/// Create a test configuration with an isolated SQLite database file
pub fn test_config() -> AppConfig {
    let db_path = format!("/tmp/worklane_test_{}.db", Uuid::new_v4());

    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: format!("sqlite://{}", db_path),
            max_connections: 5,
        },
        auth: AuthConfig {
            jwt_secret: TEST_JWT_SECRET.to_string(),
            token_expiry_hours: 1,
        },
        logging: LoggingConfig::default(),
        tenancy: TenancyConfig {
            dev_token: "dev".to_string(),
            preview_suffixes: vec!["worklane.local".to_string()],
        },
    }
}
