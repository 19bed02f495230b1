//! Error types for tenant resolution
//!
//! This module defines the failures that can occur while resolving the
//! tenant for a request and while enforcing tenant scoping on records.

use thiserror::Error;

use crate::tenant::TenantId;

/// Tenant error types.
///
/// Not-found and mismatch failures are authorization-style: they surface as
/// 403 responses, never as server errors.
#[derive(Debug, Error)]
pub enum TenantError {
    /// No tenant is registered for the domain
    #[error("No tenant found for domain: {0}")]
    NotFound(String),

    /// The request carried no usable host or domain
    #[error("Request has no host to resolve a tenant from")]
    MissingHost,

    /// A tenant-scoped record belongs to another tenant than the active one
    #[error("Tenant mismatch: record belongs to tenant {record}, active tenant is {active}")]
    Mismatch {
        /// Tenant key stored on the record
        record: TenantId,
        /// Tenant held by the active context
        active: TenantId,
    },

    /// A tenant-scoped operation ran without an active tenant or bypass
    #[error("No active tenant for a tenant-scoped operation")]
    NoActiveTenant,

    /// A second tenant already owns the domain
    #[error("Domain already registered: {0}")]
    DuplicateDomain(String),

    /// The tenant is deactivated
    #[error("Tenant is inactive: {0}")]
    Inactive(String),

    /// Storage backend failure
    #[error("Repository error: {0}")]
    Repository(String),
}

/// Result type for tenant operations.
pub type TenantResult<T> = Result<T, TenantError>;

impl TenantError {
    /// Check if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        matches!(self, TenantError::Repository(_))
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TenantError::NotFound(_)
            | TenantError::Mismatch { .. }
            | TenantError::NoActiveTenant
            | TenantError::Inactive(_) => 403,

            TenantError::MissingHost => 400,
            TenantError::DuplicateDomain(_) => 409,
            TenantError::Repository(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            TenantError::NotFound(_) => "TENANT_NOT_FOUND",
            TenantError::MissingHost => "MISSING_HOST",
            TenantError::Mismatch { .. } => "TENANT_MISMATCH",
            TenantError::NoActiveTenant => "NO_ACTIVE_TENANT",
            TenantError::DuplicateDomain(_) => "DUPLICATE_DOMAIN",
            TenantError::Inactive(_) => "TENANT_INACTIVE",
            TenantError::Repository(_) => "REPOSITORY_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_authorization_style() {
        let err = TenantError::NotFound("acme.app".to_string());
        assert_eq!(err.status_code(), 403);
        assert!(!err.is_server_error());
        assert_eq!(err.error_code(), "TENANT_NOT_FOUND");
    }

    #[test]
    fn test_mismatch_message() {
        let err = TenantError::Mismatch {
            record: 7,
            active: 9,
        };
        assert_eq!(err.status_code(), 403);
        assert!(err.to_string().contains("tenant 7"));
    }
}
