//! Error types for the edge tenant cache

use thiserror::Error;

/// Edge cache errors.
///
/// These never reach a render directly: a failed lookup resolves to "no
/// tenant" and the render fails closed.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Backend returned an error response.
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the backend.
        message: String,
    },

    /// Backend response could not be decoded.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Backend rejected the API key.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Invalid edge configuration.
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig {
        /// Configuration key.
        key: String,
        /// Error message.
        message: String,
    },
}

/// Result type for edge cache operations.
pub type EdgeResult<T> = Result<T, EdgeError>;

impl EdgeError {
    /// Check if the failure is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            EdgeError::RequestFailed(e) => e.is_timeout() || e.is_connect(),
            EdgeError::ApiError { status, .. } => *status >= 500 || *status == 429,
            EdgeError::InvalidResponse(_)
            | EdgeError::AuthenticationFailed
            | EdgeError::InvalidConfig { .. } => false,
        }
    }
}
