//! Authentication gate.
//!
//! Runs before every protected handler. The credential is re-validated on
//! each request regardless of what the client believes about its session.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tracing::{debug, info, warn};

use market_core::error::SessionError;

use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Rejects the request with `401` unless it carries a valid bearer credential.
///
/// On success the decoded identity is attached to the request as an
/// [`AuthUser`] extension and the downstream handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        debug!(path = %request.uri().path(), "No bearer credential presented");
        return Err(SessionError::MissingCredential.into());
    };

    let claims = match state.jwt_decoder.decode(&token) {
        Ok(claims) => claims,
        Err(e) => {
            if let SessionError::InvalidCredential { detail } = &e {
                warn!(path = %request.uri().path(), detail = %detail, "Credential rejected at gate");
            }
            close_lapsed(&state, &token).await;
            return Err(e.into());
        }
    };

    request.extensions_mut().insert(AuthUser { claims, token });
    Ok(next.run(request).await)
}

/// Closes the log record of a genuinely signed credential whose `exp` passed.
///
/// The record ends at the credential's expiry, not at the time it was seen.
async fn close_lapsed(state: &AppState, token: &str) {
    let Some(claims) = state.jwt_decoder.decode_lapsed(token) else {
        return;
    };
    let ended_at = claims.expires_at().unwrap_or_else(Utc::now);
    match state.session_log.record_logout(token, ended_at).await {
        Ok(true) => info!(email = %claims.email, "Session log record closed on expiry"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "Failed to close lapsed session log record"),
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
///
/// Any other shape, including an empty token, counts as absent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&headers("bearer abc")), Some("abc"));
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&headers("abc.def.ghi")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
