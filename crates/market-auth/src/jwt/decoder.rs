//! Stateless credential validation.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::debug;

use market_core::config::AuthConfig;
use market_core::error::SessionError;

use super::claims::Claims;

/// Verifies credential signature and embedded expiry against the shared secret.
///
/// Holds nothing but the immutable key, so one instance is shared by every
/// request without locking.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Same checks with `exp` ignored, for recognising lapsed credentials.
    lapsed_validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // Server-side expiry is authoritative: no grace period.
        validation.leeway = 0;

        let mut lapsed_validation = validation.clone();
        lapsed_validation.validate_exp = false;

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            lapsed_validation,
        }
    }

    /// Claims of a genuinely signed credential whose `exp` has passed.
    ///
    /// `None` for forged, malformed, or still-valid credentials.
    pub fn decode_lapsed(&self, token: &str) -> Option<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.lapsed_validation)
            .ok()?
            .claims;
        (claims.exp <= Utc::now().timestamp()).then_some(claims)
    }

    /// Decodes and validates a credential.
    ///
    /// Every failure (bad signature, malformed token, lapsed `exp`) collapses
    /// into [`SessionError::InvalidCredential`]; the detail is kept for logs.
    pub fn decode(&self, token: &str) -> Result<Claims, SessionError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let detail = match e.kind() {
                    JwtErrorKind::ExpiredSignature => "credential has expired".to_string(),
                    JwtErrorKind::InvalidToken => "malformed credential".to_string(),
                    JwtErrorKind::InvalidSignature => "bad credential signature".to_string(),
                    _ => format!("credential validation failed: {e}"),
                };
                debug!(detail = %detail, "Credential rejected");
                SessionError::invalid(detail)
            })
    }
}
