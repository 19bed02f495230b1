//! Error types for session operations
//!
//! This module defines the failures that can occur while loading, saving
//! and regenerating sessions.

use thiserror::Error;

/// Session error types.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session exists for the presented token
    #[error("Session not found")]
    NotFound,

    /// The session outlived its idle lifetime
    #[error("Session has expired")]
    Expired,

    /// The session was invalidated by a security action
    #[error("Session invalidated")]
    Invalidated,

    /// The presented CSRF token does not match the session
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    /// Session storage failure
    #[error("Session store error: {0}")]
    Store(String),

    /// Session payload could not be encoded or decoded
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, SessionError::Store(_) | SessionError::Serialization(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            SessionError::NotFound | SessionError::Expired | SessionError::Invalidated => 401,
            SessionError::CsrfMismatch => 419,
            SessionError::Store(_) | SessionError::Serialization(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            SessionError::NotFound => "SESSION_NOT_FOUND",
            SessionError::Expired => "SESSION_EXPIRED",
            SessionError::Invalidated => "SESSION_INVALIDATED",
            SessionError::CsrfMismatch => "CSRF_MISMATCH",
            SessionError::Store(_) => "SESSION_STORE_ERROR",
            SessionError::Serialization(_) => "SESSION_SERIALIZATION_ERROR",
        }
    }
}
