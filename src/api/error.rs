use thiserror::Error;

use super::transport::TransportError;

/// Failures surfaced by the request executor.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No session token was stored; the user has been sent to the entry point.
    #[error("Not signed in")]
    AuthenticationRequired,

    /// The server rejected the token (401); the store was cleared and the
    /// user has been sent to the entry point.
    #[error("Session expired")]
    SessionExpired,

    /// Any other non-success status. `detail` is the server's message when it
    /// sent one.
    #[error("{detail}")]
    RequestFailed { status: u16, detail: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ApiError {
    /// Whether this failure ended the session.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::AuthenticationRequired | ApiError::SessionExpired)
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::RequestFailed { status, .. } => Some(*status),
            ApiError::SessionExpired => Some(401),
            _ => None,
        }
    }
}
