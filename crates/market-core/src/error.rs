//! Unified application error types.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the `?` operator. Authentication failures are first
//! classified as a [`SessionError`] and then converted.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No valid credential was presented.
    Unauthorized,
    /// Input validation failed.
    Validation,
    /// Local or durable storage failed.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

/// Failure taxonomy of the session subsystem.
///
/// The two credential variants are produced by the authentication gate and
/// surface to callers as `401`. The two local variants never leave the
/// lifecycle manager: they are logged and resolved by tearing the session down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No bearer credential was presented.
    #[error("missing credential")]
    MissingCredential,
    /// The credential failed signature, format, or expiry verification.
    #[error("invalid credential")]
    InvalidCredential {
        /// Why verification failed. Logged, never returned to the caller.
        detail: String,
    },
    /// The client-side timer found the session past its expiry.
    #[error("session expired")]
    ExpiredLocally,
    /// The stored expiry was missing or could not be parsed.
    #[error("corrupt local session state: {0}")]
    CorruptLocalState(String),
}

impl SessionError {
    /// Builds an [`SessionError::InvalidCredential`] with a diagnostic detail.
    pub fn invalid(detail: impl Into<String>) -> Self {
        Self::InvalidCredential {
            detail: detail.into(),
        }
    }

    /// The message shown to the end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "please log in",
            Self::InvalidCredential { .. } => "session invalid, please log in again",
            Self::ExpiredLocally | Self::CorruptLocalState(_) => {
                "session expired, please log in again"
            }
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        // Only the taxonomy label crosses the boundary; the detail stays in logs.
        let message = match &err {
            SessionError::MissingCredential => "missing credential",
            SessionError::InvalidCredential { .. } => "invalid credential",
            SessionError::ExpiredLocally | SessionError::CorruptLocalState(_) => "session expired",
        };
        Self::with_source(ErrorKind::Unauthorized, message, err)
    }
}
