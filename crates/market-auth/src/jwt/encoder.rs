//! Credential issuance with a configurable TTL.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use market_core::config::AuthConfig;
use market_core::error::AppError;

use crate::account::Account;

use super::claims::Claims;

/// Signs HS256 credentials.
#[derive(Clone)]
pub struct JwtEncoder {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// Credential lifetime in seconds.
    ttl_seconds: u64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

/// A freshly signed credential and its lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedCredential {
    /// The signed token.
    pub token: String,
    /// Lifetime in seconds, what the client feeds to its lifecycle manager.
    pub expires_in: u64,
    /// Absolute expiry embedded in the token.
    pub expires_at: DateTime<Utc>,
    /// The claims that were signed.
    pub claims: Claims,
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_seconds: config.token_ttl_seconds,
        }
    }

    /// The lifetime given to every issued credential.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issues a credential for the account, valid from now for the configured TTL.
    pub fn issue(&self, account: &Account) -> Result<IssuedCredential, AppError> {
        self.issue_at(account, Utc::now())
    }

    /// Issues a credential as if signed at `now`.
    pub fn issue_at(
        &self,
        account: &Account,
        now: DateTime<Utc>,
    ) -> Result<IssuedCredential, AppError> {
        let expires_at = now + Duration::seconds(self.ttl_seconds as i64);

        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode credential: {e}")))?;

        Ok(IssuedCredential {
            token,
            expires_in: self.ttl_seconds,
            expires_at,
            claims,
        })
    }
}
