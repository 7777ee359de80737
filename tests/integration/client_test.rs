//! End-to-end tests: `SessionClient` against a running server.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use market_auth::session::{EndReason, MemorySessionStorage, SessionLifecycle, SessionLog};
use market_client::{ClientError, GuardDecision, RouteGuard, SessionClient};
use market_core::config::SessionConfig;
use market_core::error::SessionError;
use market_core::traits::{Clock, ManualClock, SystemClock};
use market_core::types::Role;

use helpers::{PASSWORD, Recorder, TestApp};

async fn spawn_server(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

struct TestClient {
    client: SessionClient,
    recorder: Arc<Recorder>,
    storage: Arc<MemorySessionStorage>,
}

fn client_with_clock(base_url: &str, clock: Arc<dyn Clock>) -> TestClient {
    let recorder = Arc::new(Recorder::default());
    let storage = Arc::new(MemorySessionStorage::new());
    let lifecycle = SessionLifecycle::new(
        clock,
        storage.clone(),
        recorder.clone(),
        &SessionConfig::default(),
    );
    TestClient {
        client: SessionClient::new(base_url, Arc::new(lifecycle)).unwrap(),
        recorder,
        storage,
    }
}

fn client(base_url: &str) -> TestClient {
    client_with_clock(base_url, Arc::new(SystemClock))
}

#[tokio::test]
async fn test_login_starts_local_session() {
    let app = TestApp::new();
    let account = app.create_test_user("al@example.com", Role::Seller);
    let base = spawn_server(&app).await;
    let tc = client(&base);

    let user = tc.client.login("al@example.com", PASSWORD).await.unwrap();

    assert_eq!(user.id, account.id);
    let lifecycle = tc.client.lifecycle();
    assert!(lifecycle.is_authenticated());
    assert_eq!(
        lifecycle.get_subject_data().unwrap()["role"],
        serde_json::json!(2)
    );

    let me = tc.client.me().await.unwrap();
    assert_eq!(me, user);

    let guard = RouteGuard::new(lifecycle.clone());
    assert_eq!(guard.check(Role::Seller), GuardDecision::Allow);
    assert_eq!(
        guard.check(Role::Admin),
        GuardDecision::Redirect("/seller".to_string())
    );
}

#[tokio::test]
async fn test_wrong_password_leaves_no_session() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let base = spawn_server(&app).await;
    let tc = client(&base);

    let err = tc
        .client
        .login("al@example.com", "wrong")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Session(SessionError::InvalidCredential { .. })
    ));
    assert!(tc.client.lifecycle().get_token().is_none());
}

#[tokio::test]
async fn test_server_rejection_tears_down_session() {
    let app = TestApp::new();
    let base = spawn_server(&app).await;
    let tc = client(&base);

    tc.client
        .lifecycle()
        .start_session("not-a-real-token", 600, serde_json::json!({}))
        .unwrap();

    let err = tc
        .client
        .get_json::<serde_json::Value>("/api/auth/me")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Session(SessionError::InvalidCredential { .. })
    ));
    assert!(tc.client.lifecycle().get_token().is_none());
    assert!(tc.storage.is_empty());
    assert_eq!(tc.recorder.end_reasons(), vec![EndReason::Rejected]);
    assert_eq!(tc.recorder.redirect_count(), 1);
}

#[tokio::test]
async fn test_logout_closes_server_record_and_local_session() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let base = spawn_server(&app).await;
    let tc = client(&base);

    tc.client.login("al@example.com", PASSWORD).await.unwrap();
    let token = tc.client.lifecycle().get_token().unwrap();

    tc.client.logout().await;

    assert!(!tc.client.lifecycle().is_authenticated());
    let record = app.session_log.find_by_token(&token).await.unwrap().unwrap();
    assert!(!record.is_active);
    assert_eq!(tc.recorder.end_reasons(), vec![EndReason::Logout]);

    let err = tc.client.me().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Session(SessionError::MissingCredential)
    ));
}

#[tokio::test]
async fn test_relogin_closes_superseded_credential() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let base = spawn_server(&app).await;
    let tc = client(&base);

    tc.client.login("al@example.com", PASSWORD).await.unwrap();
    let first = tc.client.lifecycle().get_token().unwrap();
    tc.client.login("al@example.com", PASSWORD).await.unwrap();
    let second = tc.client.lifecycle().get_token().unwrap();

    assert_ne!(first, second);
    assert_eq!(tc.recorder.end_reasons(), vec![EndReason::Replaced]);

    let old = app.session_log.find_by_token(&first).await.unwrap().unwrap();
    assert!(!old.is_active);
    let active = app.session_log.active_for("al@example.com").await.unwrap();
    assert_eq!(active.len(), 1);
}

#[tokio::test]
async fn test_local_expiry_blocks_requests() {
    let app = TestApp::new();
    app.create_test_user("al@example.com", Role::Buyer);
    let base = spawn_server(&app).await;
    let clock = ManualClock::new(1_700_000_000_000);
    let tc = client_with_clock(&base, Arc::new(clock.clone()));

    tc.client.login("al@example.com", PASSWORD).await.unwrap();
    clock.advance(Duration::from_secs(601));

    let err = tc.client.me().await.unwrap_err();

    assert!(matches!(
        err,
        ClientError::Session(SessionError::ExpiredLocally)
    ));
    assert!(tc.storage.is_empty());
    assert_eq!(tc.recorder.end_reasons(), vec![EndReason::Expired]);
}
