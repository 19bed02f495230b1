//! Error types for configuration contributors

use thiserror::Error;

/// Contributor error types.
///
/// A missing required key is not an error: the contributor reports
/// [`Applied::Skipped`](crate::Applied::Skipped) instead. A contributor error
/// never aborts a request. The pipeline logs it, resets
/// the failing contributor and carries on under process defaults.
#[derive(Debug, Error)]
pub enum ContributorError {
    /// A key is present but cannot be used
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// Offending config key
        key: String,
        /// Why the value was rejected
        message: String,
    },

    /// The runtime refused the rebind
    #[error("Rebind failed: {0}")]
    Rebind(String),
}

/// Result type for contributor operations.
pub type ContributorResult<T> = Result<T, ContributorError>;

impl ContributorError {
    /// Build an invalid value error.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        ContributorError::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Get error code for logs and reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            ContributorError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ContributorError::Rebind(_) => "CONFIG_REBIND_FAILED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_value_message() {
        let err = ContributorError::invalid("db_host", "contains whitespace");
        assert_eq!(err.to_string(), "Invalid value for db_host: contains whitespace");
        assert_eq!(err.error_code(), "CONFIG_INVALID_VALUE");
    }

    #[test]
    fn test_rebind_error_code() {
        let err = ContributorError::Rebind("pool closed".to_string());
        assert_eq!(err.error_code(), "CONFIG_REBIND_FAILED");
        assert_eq!(err.to_string(), "Rebind failed: pool closed");
    }
}
