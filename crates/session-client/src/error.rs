//! Session error types.

use thiserror::Error;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The server could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The stored token was rejected. The session has been cleared.
    #[error("Session is no longer valid")]
    SessionInvalid,

    /// No token is stored.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Reading or writing the persisted session failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The server answered with a body we could not read.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SessionError::Decode(err.to_string())
        } else {
            SessionError::Network(err.to_string())
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
