//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use market_auth::account::AccountDirectory;
use market_auth::jwt::{JwtDecoder, JwtEncoder};
use market_auth::password::PasswordHasher;
use market_auth::session::SessionLog;
use market_core::config::AppConfig;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Credential issuer
    pub jwt_encoder: Arc<JwtEncoder>,
    /// Stateless credential validator used by the gate
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Password hasher (Argon2)
    pub password_hasher: Arc<PasswordHasher>,
    /// Accounts that can sign in
    pub accounts: Arc<dyn AccountDirectory>,
    /// Durable session records
    pub session_log: Arc<dyn SessionLog>,
}

impl AppState {
    /// Builds the state, deriving the encoder and decoder from `config.auth`.
    pub fn new(
        config: AppConfig,
        accounts: Arc<dyn AccountDirectory>,
        session_log: Arc<dyn SessionLog>,
    ) -> Self {
        Self {
            jwt_encoder: Arc::new(JwtEncoder::new(&config.auth)),
            jwt_decoder: Arc::new(JwtDecoder::new(&config.auth)),
            password_hasher: Arc::new(PasswordHasher::new()),
            config: Arc::new(config),
            accounts,
            session_log,
        }
    }
}
