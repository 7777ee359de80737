//! HTTP session client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use market_auth::session::{EndReason, SessionLifecycle};
use market_core::error::SessionError;
use market_core::types::Role;

use crate::error::ClientError;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const LOGIN_PATH: &str = "/api/auth/login";
const LOGOUT_PATH: &str = "/api/auth/logout";
const ME_PATH: &str = "/api/auth/me";

/// Signed-in user as returned by the server and kept as subject data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account ID.
    pub id: Uuid,
    /// E-mail.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role level.
    pub role: Role,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    token: String,
    expires_in: u64,
    user: UserProfile,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Talks to the marketplace API on behalf of one local session.
///
/// Clone is cheap; clones share the connection pool and the lifecycle.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: Client,
    base_url: String,
    lifecycle: Arc<SessionLifecycle>,
}

impl SessionClient {
    /// Creates a client for the API at `base_url` (scheme, host, port).
    pub fn new(
        base_url: impl Into<String>,
        lifecycle: Arc<SessionLifecycle>,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lifecycle,
        })
    }

    /// The lifecycle this client drives.
    pub fn lifecycle(&self) -> &Arc<SessionLifecycle> {
        &self.lifecycle
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Signs in and starts a local session with the issued credential.
    ///
    /// A session already held for a different credential is replaced, and
    /// the server is told (best effort) that the old credential is done.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, ClientError> {
        let response = self
            .http
            .post(self.url(LOGIN_PATH))
            .json(&LoginRequest { email, password })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!(email = %email, "Login refused");
            return Err(SessionError::invalid("login refused").into());
        }
        let response = Self::check_response(response).await?;

        let body: Envelope<LoginBody> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("login body: {e}")))?;
        let LoginBody {
            token,
            expires_in,
            user,
        } = body.data;

        let previous = self.lifecycle.get_token().filter(|old| *old != token);
        let subject = serde_json::to_value(&user)
            .map_err(|e| ClientError::InvalidResponse(format!("user profile: {e}")))?;
        self.lifecycle.start_session(&token, expires_in, subject)?;

        if let Some(old) = previous {
            self.notify_logout(&old).await;
        }

        info!(account_id = %user.id, role = %user.role, expires_in, "Logged in");
        Ok(user)
    }

    /// GETs `path` with the session's bearer credential and returns the
    /// response's `data` payload.
    ///
    /// Fails without a request when there is no usable local session. A `401`
    /// from the server ends the local session.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let token = self
            .lifecycle
            .get_token()
            .ok_or(SessionError::MissingCredential)?;
        if !self.lifecycle.is_authenticated() {
            return Err(SessionError::ExpiredLocally.into());
        }

        let response = self
            .http
            .get(self.url(path))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!(path = %path, "Credential rejected by server, ending session");
            self.lifecycle.end_session_with(EndReason::Rejected);
            return Err(SessionError::invalid("rejected by server").into());
        }
        let response = Self::check_response(response).await?;

        let body: Envelope<T> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(format!("{path}: {e}")))?;
        Ok(body.data)
    }

    /// The identity the server derives from the current credential.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        self.get_json(ME_PATH).await
    }

    /// Tells the server the session is over, then ends it locally.
    ///
    /// The local teardown happens even if the server cannot be reached.
    pub async fn logout(&self) {
        if let Some(token) = self.lifecycle.get_token() {
            self.notify_logout(&token).await;
        }
        self.lifecycle.end_session();
    }

    async fn notify_logout(&self, token: &str) {
        let result = self
            .http
            .post(self.url(LOGOUT_PATH))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Server logout recorded");
            }
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Server logout refused");
            }
            Err(e) => {
                warn!(error = %e, "Server logout failed");
            }
        }
    }

    async fn check_response(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status, &body))
    }
}
