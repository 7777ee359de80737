//! Integration tests for the login/logout flow and the session log.

mod helpers;

use axum::http::StatusCode;

use market_auth::session::SessionLog;
use market_core::types::Role;

use helpers::{PASSWORD, TestApp};

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new();
    let account = app.create_test_user("al@example.com", Role::Seller);

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "al@example.com",
                "password": PASSWORD,
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert!(data["token"].as_str().is_some());
    assert_eq!(data["expires_in"], 600);
    assert!(data["expires_at"].as_str().is_some());
    assert_eq!(data["user"]["id"], account.id.to_string());
    assert_eq!(data["user"]["role"], 2);
    assert!(data["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_invalid_password() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "al@example.com",
                "password": "wrongpassword",
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
    assert!(app.session_log.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_login_nonexistent_user() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "nobody@example.com",
                "password": PASSWORD,
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/auth/login",
            Some(serde_json::json!({
                "email": "not-an-email",
                "password": PASSWORD,
            })),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_opens_session_record() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);

    let token = app.login("al@example.com").await;

    let record = app
        .session_log
        .find_by_token(&token)
        .await
        .unwrap()
        .expect("login should be recorded");
    assert!(record.is_active);
    assert!(record.logout_time.is_none());
    assert_eq!(record.email, "al@example.com");
    assert_ne!(record.token, token);
}

#[tokio::test]
async fn test_me_returns_identity() {
    let app = TestApp::new();
    let account = app.create_test_user("al@example.com", Role::Admin);
    let token = app.login("al@example.com").await;

    let response = app.request("GET", "/api/auth/me", None, Some(&token)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["id"], account.id.to_string());
    assert_eq!(response.body["data"]["email"], "al@example.com");
    assert_eq!(response.body["data"]["role"], 1);
}

#[tokio::test]
async fn test_logout_closes_record_once() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let token = app.login("al@example.com").await;

    let first = app
        .request("POST", "/api/auth/logout", None, Some(&token))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    let closed = app
        .session_log
        .find_by_token(&token)
        .await
        .unwrap()
        .unwrap();
    assert!(!closed.is_active);
    let logout_time = closed.logout_time.expect("logout time stamped");

    let second = app
        .request("POST", "/api/auth/logout", None, Some(&token))
        .await;
    assert_eq!(second.status, StatusCode::OK);

    let records = app.session_log.all().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].logout_time, Some(logout_time));
}

#[tokio::test]
async fn test_concurrent_sessions_per_subject() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);

    let phone = app.login("al@example.com").await;
    let laptop = app.login("al@example.com").await;
    assert_ne!(phone, laptop);

    app.request("POST", "/api/auth/logout", None, Some(&phone))
        .await;

    let active = app.session_log.active_for("al@example.com").await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(app.session_log.all().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_logout_requires_credential() {
    let app = TestApp::new();
    let response = app.request("POST", "/api/auth/logout", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "missing credential");
}
