//! Integration tests for the authentication gate.

mod helpers;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use market_api::extractors::AuthUser;
use market_api::middleware::auth::require_auth;
use market_auth::jwt::{Claims, JwtEncoder};
use market_auth::session::SessionLog;
use market_core::config::AuthConfig;
use market_core::types::Role;

use helpers::{SECRET, TestApp, send, splice_payload};

/// A protected route that counts how often its handler runs.
fn counted_route(app: &TestApp) -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new()
        .route(
            "/counted",
            get(move |auth: AuthUser| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    auth.email.clone()
                }
            }),
        )
        .route_layer(from_fn_with_state(app.state.clone(), require_auth))
        .with_state(app.state.clone());
    (router, hits)
}

#[tokio::test]
async fn test_valid_credential_reaches_handler() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let token = app.login("al@example.com").await;
    let (router, hits) = counted_route(&app);

    let response = send(&router, "GET", "/counted", None, Some(&format!("Bearer {token}"))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, serde_json::json!("al@example.com"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_tampered_payload_rejected_before_handler() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    app.create_test_user("root@example.com", Role::Admin);
    let buyer = app.login("al@example.com").await;
    let admin = app.login("root@example.com").await;
    let (router, hits) = counted_route(&app);

    // Buyer's signature over the admin's claims.
    let tampered = splice_payload(&buyer, &admin);
    let response = send(
        &router,
        "GET",
        "/counted",
        None,
        Some(&format!("Bearer {tampered}")),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "invalid credential");
    assert_eq!(response.body["error"], "UNAUTHORIZED");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_foreign_secret_rejected() {
    let app = TestApp::new();
    let account = app.create_test_user("al@example.com", Role::Seller);
    let forged = JwtEncoder::new(&AuthConfig {
        jwt_secret: "someone-else".to_string(),
        token_ttl_seconds: 600,
        accounts: Vec::new(),
    })
    .issue(&account)
    .unwrap();

    let response = app
        .request("GET", "/api/auth/me", None, Some(&forged.token))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "invalid credential");
}

#[tokio::test]
async fn test_missing_header_rejected() {
    let app = TestApp::new();
    let (router, hits) = counted_route(&app);

    let response = send(&router, "GET", "/counted", None, None).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "missing credential");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_header_reported_as_missing() {
    let app = TestApp::new();
    let (router, hits) = counted_route(&app);

    for header in ["Token abc", "Bearer", "Basic dXNlcjpwYXNz"] {
        let response = send(&router, "GET", "/counted", None, Some(header)).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{header}");
        assert_eq!(response.body["message"], "missing credential", "{header}");
    }
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_expired_credential_rejected_without_leeway() {
    let app = TestApp::new();
    let now = Utc::now();
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "al@example.com".to_string(),
        name: "Al".to_string(),
        role: Role::Buyer,
        iat: (now - Duration::minutes(10)).timestamp(),
        exp: (now - Duration::seconds(1)).timestamp(),
        jti: Uuid::new_v4(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let response = app.request("GET", "/api/auth/me", None, Some(&token)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "invalid credential");
}

#[tokio::test]
async fn test_lapsed_credential_closes_its_log_record() {
    let app = TestApp::with_ttl(1);
    app.create_test_user("al@example.com", Role::Buyer);
    let token = app.login("al@example.com").await;

    tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

    let me = app.request("GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    let logout = app
        .request("POST", "/api/auth/logout", None, Some(&token))
        .await;
    assert_eq!(logout.status, StatusCode::UNAUTHORIZED);

    let record = app.session_log.find_by_token(&token).await.unwrap().unwrap();
    assert!(!record.is_active);
    let logout_time = record.logout_time.unwrap();
    assert!(logout_time >= record.login_time);
    assert!(logout_time <= Utc::now());
}

#[tokio::test]
async fn test_forged_expired_credential_leaves_log_alone() {
    let app = TestApp::new();
    let account = app.create_test_user("al@example.com", Role::Buyer);
    let token = app.login("al@example.com").await;

    let forged = JwtEncoder::new(&AuthConfig {
        jwt_secret: "someone-else".to_string(),
        token_ttl_seconds: 60,
        accounts: Vec::new(),
    })
    .issue_at(&account, Utc::now() - Duration::hours(1))
    .unwrap();

    let response = app
        .request("GET", "/api/auth/me", None, Some(&forged.token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.session_log.all().await.unwrap().len(), 1);
    assert!(app.session_log.find_by_token(&token).await.unwrap().unwrap().is_active);
}

#[tokio::test]
async fn test_gate_ignores_session_log_state() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let token = app.login("al@example.com").await;

    let logout = app
        .request("POST", "/api/auth/logout", None, Some(&token))
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    // Stateless: the credential stays valid until its own expiry.
    let me = app.request("GET", "/api/auth/me", None, Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn test_public_routes_not_gated() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["status"], "ok");
}
