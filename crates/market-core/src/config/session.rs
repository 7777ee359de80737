//! Session lifecycle and session log configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Period of the client-side re-validation check in seconds.
    #[serde(default = "default_check_interval")]
    pub check_interval_seconds: u64,
    /// Remaining lifetime at or below which a check emits an expiry warning.
    #[serde(default = "default_warning_window")]
    pub warning_window_seconds: u64,
    /// Period of the server-side sweep closing expired log records, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// JSON file backing the session log. In-memory when unset.
    #[serde(default)]
    pub log_path: Option<String>,
}

impl SessionConfig {
    /// The check period as a [`Duration`].
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }

    /// The sweep period as a [`Duration`].
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    /// The warning window as a [`Duration`].
    pub fn warning_window(&self) -> Duration {
        Duration::from_secs(self.warning_window_seconds)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: default_check_interval(),
            warning_window_seconds: default_warning_window(),
            sweep_interval_seconds: default_sweep_interval(),
            log_path: None,
        }
    }
}

fn default_check_interval() -> u64 {
    60
}

fn default_warning_window() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    60
}
