//! Side effects requested by the lifecycle manager.

use std::time::Duration;

use tracing::{info, warn};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The user logged out.
    Logout,
    /// A check found the expiry in the past.
    Expired,
    /// The one-shot hard-expiry timer fired.
    Deadline,
    /// Stored session values were missing or unparsable.
    CorruptState,
    /// The server rejected the credential.
    Rejected,
    /// A new login replaced this session.
    Replaced,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logout => write!(f, "logout"),
            Self::Expired => write!(f, "expired"),
            Self::Deadline => write!(f, "deadline"),
            Self::CorruptState => write!(f, "corrupt_state"),
            Self::Rejected => write!(f, "rejected"),
            Self::Replaced => write!(f, "replaced"),
        }
    }
}

/// Receives the lifecycle manager's notifications.
///
/// Called outside the manager's lock; implementations may call back into
/// the manager. None of the methods may block.
pub trait SessionListener: Send + Sync + std::fmt::Debug + 'static {
    /// The session has `remaining` time left and is inside the warning window.
    fn expiry_warning(&self, remaining: Duration) {
        let _ = remaining;
    }

    /// The session holding `token` ended. Called once per session.
    fn session_ended(&self, token: Option<&str>, reason: EndReason) {
        let _ = (token, reason);
    }

    /// Send the user to the re-authentication entry point. Safe to repeat.
    fn redirect_to_login(&self) {}
}

/// Listener that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl SessionListener for TracingListener {
    fn expiry_warning(&self, remaining: Duration) {
        warn!(
            remaining_seconds = remaining.as_secs(),
            "Session expires soon"
        );
    }

    fn session_ended(&self, _token: Option<&str>, reason: EndReason) {
        info!(reason = %reason, "Session ended");
    }

    fn redirect_to_login(&self) {
        info!("Redirecting to login");
    }
}
