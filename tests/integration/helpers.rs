//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use market_api::{AppState, build_router};
use market_auth::account::{Account, MemoryAccountDirectory};
use market_auth::session::{EndReason, MemorySessionLog, SessionListener};
use market_core::config::AppConfig;
use market_core::types::Role;

/// Signing secret shared by every test app.
pub const SECRET: &str = "integration-test-secret";

/// Password given to every test user.
pub const PASSWORD: &str = "correct horse battery";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// State behind the router
    pub state: AppState,
    /// Account directory the login handler reads
    pub accounts: MemoryAccountDirectory,
    /// Session log the handlers write
    pub session_log: Arc<MemorySessionLog>,
}

impl TestApp {
    /// Create a new test application issuing 10-minute credentials
    pub fn new() -> Self {
        Self::with_ttl(600)
    }

    /// Create a test application with the given credential lifetime
    pub fn with_ttl(ttl_seconds: u64) -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = SECRET.to_string();
        config.auth.token_ttl_seconds = ttl_seconds;

        let accounts = MemoryAccountDirectory::new();
        let session_log = Arc::new(MemorySessionLog::new());
        let state = AppState::new(config, Arc::new(accounts.clone()), session_log.clone());

        Self {
            router: build_router(state.clone()),
            state,
            accounts,
            session_log,
        }
    }

    /// Register an account that signs in with [`PASSWORD`]
    pub fn create_test_user(&self, email: &str, role: Role) -> Account {
        self.accounts
            .register(email, "Test User", role, PASSWORD, &self.state.password_hasher)
            .expect("Failed to register test user")
    }

    /// Login and return the issued credential
    pub async fn login(&self, email: &str) -> String {
        let body = serde_json::json!({
            "email": email,
            "password": PASSWORD,
        });

        let response = self
            .request("POST", "/api/auth/login", Some(body), None)
            .await;

        assert_eq!(
            response.status,
            StatusCode::OK,
            "Login failed: {:?}",
            response.body
        );

        response.body["data"]["token"]
            .as_str()
            .expect("No token in login response")
            .to_string()
    }

    /// Make an HTTP request to the test app with an optional bearer token
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let authorization = token.map(|t| format!("Bearer {t}"));
        send(
            &self.router,
            method,
            path,
            body,
            authorization.as_deref(),
        )
        .await
    }
}

/// Send a request to any router with a raw `Authorization` header value
pub async fn send(
    router: &Router,
    method: &str,
    path: &str,
    body: Option<Value>,
    authorization: Option<&str>,
) -> TestResponse {
    let body_str = body
        .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
        .unwrap_or_default();

    let mut req = Request::builder()
        .method(method)
        .uri(path)
        .header("Content-Type", "application/json");

    if let Some(value) = authorization {
        req = req.header("Authorization", value);
    }

    let req = req
        .body(Body::from(body_str))
        .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(req)
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

    TestResponse { status, body }
}

/// Swap the payload of `token` for the payload of `other`, keeping the
/// original header and signature.
pub fn splice_payload(token: &str, other: &str) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    let other_parts: Vec<&str> = other.split('.').collect();
    format!("{}.{}.{}", parts[0], other_parts[1], parts[2])
}

/// Test response with parsed body
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

/// Listener that records what the lifecycle asked for.
#[derive(Debug, Default)]
pub struct Recorder {
    pub warnings: Mutex<Vec<Duration>>,
    pub ended: Mutex<Vec<(Option<String>, EndReason)>>,
    pub redirects: Mutex<usize>,
}

impl Recorder {
    pub fn end_reasons(&self) -> Vec<EndReason> {
        self.ended.lock().unwrap().iter().map(|(_, r)| *r).collect()
    }

    pub fn redirect_count(&self) -> usize {
        *self.redirects.lock().unwrap()
    }
}

impl SessionListener for Recorder {
    fn expiry_warning(&self, remaining: Duration) {
        self.warnings.lock().unwrap().push(remaining);
    }

    fn session_ended(&self, token: Option<&str>, reason: EndReason) {
        self.ended
            .lock()
            .unwrap()
            .push((token.map(str::to_string), reason));
    }

    fn redirect_to_login(&self) {
        *self.redirects.lock().unwrap() += 1;
    }
}
