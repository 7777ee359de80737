//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section; every field has a default so an empty file is a valid config.

pub mod app;
pub mod auth;
pub mod logging;
pub mod session;

use serde::{Deserialize, Serialize};

pub use self::app::{CorsConfig, ServerConfig};
pub use self::auth::{AuthConfig, SeedAccount};
pub use self::logging::LoggingConfig;
pub use self::session::SessionConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged configuration
/// (default.toml + environment overlay + `MARKET__*` variables).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Credential issuance and verification settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session lifecycle and session log settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with the `config/{env}` overlay and then
    /// environment variables prefixed with `MARKET__` (e.g.
    /// `MARKET__AUTH__JWT_SECRET`).
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from("config", env)
    }

    /// Same as [`AppConfig::load`] but reading from an explicit directory.
    pub fn load_from(dir: &str, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name(&format!("{dir}/default")).required(false))
            .add_source(config::File::with_name(&format!("{dir}/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("MARKET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the session subsystem cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(AppError::configuration("auth.jwt_secret cannot be empty"));
        }
        if self.auth.token_ttl_seconds == 0 {
            return Err(AppError::configuration(
                "auth.token_ttl_seconds must be positive",
            ));
        }
        if self.session.check_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.check_interval_seconds must be positive",
            ));
        }
        if self.session.sweep_interval_seconds == 0 {
            return Err(AppError::configuration(
                "session.sweep_interval_seconds must be positive",
            ));
        }
        if self.auth.jwt_secret == auth::DEFAULT_JWT_SECRET {
            tracing::warn!("auth.jwt_secret is the built-in default; set MARKET__AUTH__JWT_SECRET");
        }
        Ok(())
    }
}
