//! Credential configuration.

use serde::{Deserialize, Serialize};

/// Placeholder secret; `AppConfig::validate` warns when it is still in use.
pub const DEFAULT_JWT_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

/// Credential issuance and verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared secret for HS256 signing and verification.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Lifetime of an issued credential in seconds.
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Accounts loaded into the in-memory directory at startup.
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_seconds: default_token_ttl(),
            accounts: Vec::new(),
        }
    }
}

/// An account provisioned from configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedAccount {
    /// Login e-mail.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Role level (1 = admin, 2 = seller, 3 = buyer).
    pub role: u8,
    /// Argon2id PHC string.
    pub password_hash: String,
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl() -> u64 {
    3600
}
