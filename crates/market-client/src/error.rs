//! Client-side error type.

use thiserror::Error;

use market_core::error::{AppError, SessionError};

/// Longest response body kept in an error message.
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Errors returned by [`SessionClient`](crate::SessionClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable local session, or the server rejected the credential.
    ///
    /// Displays the text shown to the end user; the cause keeps the detail.
    #[error("{}", .0.user_message())]
    Session(#[from] SessionError),

    /// The server answered with a non-success status other than `401`.
    #[error("Server returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The request never completed.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Local session storage failed.
    #[error(transparent)]
    Local(#[from] AppError),
}

impl ClientError {
    /// Builds a [`ClientError::Status`] with a bounded body.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let body = if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        };
        Self::Status {
            status: status.as_u16(),
            body,
        }
    }

    /// Whether the error means the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}
