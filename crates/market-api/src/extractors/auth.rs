//! `AuthUser` extractor, the identity attached by the authentication gate.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use market_auth::jwt::Claims;
use market_core::error::SessionError;

use crate::error::ApiError;

/// Authenticated caller, available to handlers behind [`require_auth`].
///
/// [`require_auth`]: crate::middleware::auth::require_auth
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Verified claims.
    pub claims: Claims,
    /// The raw credential, used to close its session log record.
    pub token: String,
}

impl std::ops::Deref for AuthUser {
    type Target = Claims;
    fn deref(&self) -> &Self::Target {
        &self.claims
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // A handler mounted outside the gate sees no identity.
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| SessionError::MissingCredential.into())
    }
}
