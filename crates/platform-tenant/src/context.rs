//! Request-scoped tenant context
//!
//! This module provides the TenantContext type that holds the tenant
//! resolved for the current request. A context is created per request and
//! passed down the handler chain explicitly; nothing here is global.

use std::sync::Arc;

use crate::error::{TenantError, TenantResult};
use crate::tenant::{Tenant, TenantId, TenantScoped};

/// Single-slot holder for the request's active tenant.
///
/// The slot holds at most one tenant. A bypass flag turns tenant scoping off
/// for system and internal calls.
///
/// # Use Cases
///
/// - Scoping record access to the resolved tenant
/// - Naming the XSRF cookie after the active tenant
/// - Internal jobs that operate across tenants (bypass)
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use platform_tenant::{Tenant, TenantContext};
///
/// let mut ctx = TenantContext::new();
/// assert!(!ctx.has());
///
/// ctx.set(Arc::new(Tenant::new(9, "Acme", "acme.app")));
/// assert_eq!(ctx.tenant_id(), Some(9));
///
/// ctx.clear();
/// assert!(ctx.get().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct TenantContext {
    tenant: Option<Arc<Tenant>>,
    bypassed: bool,
}

impl TenantContext {
    /// Creates an empty context with scoping enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context holding the given tenant.
    pub fn for_tenant(tenant: Arc<Tenant>) -> Self {
        Self {
            tenant: Some(tenant),
            bypassed: false,
        }
    }

    /// Creates a context for system calls with scoping disabled.
    pub fn system() -> Self {
        Self {
            tenant: None,
            bypassed: true,
        }
    }

    /// Set the active tenant, replacing any previous one.
    pub fn set(&mut self, tenant: Arc<Tenant>) {
        self.tenant = Some(tenant);
    }

    /// The active tenant.
    pub fn get(&self) -> Option<&Arc<Tenant>> {
        self.tenant.as_ref()
    }

    /// Check if a tenant is active.
    pub fn has(&self) -> bool {
        self.tenant.is_some()
    }

    /// Internal id of the active tenant.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant.as_ref().map(|tenant| tenant.id)
    }

    /// Public id of the active tenant.
    pub fn public_id(&self) -> Option<&str> {
        self.tenant.as_ref().map(|tenant| tenant.public_id.as_str())
    }

    /// Enable or disable the scoping bypass.
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    /// Check if tenant scoping is bypassed.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Empty the slot and re-enable scoping. Called at request end.
    pub fn clear(&mut self) {
        self.tenant = None;
        self.bypassed = false;
    }

    /// Verify that a record keyed to `record_tenant` may be touched.
    ///
    /// A disagreement is always an error; it is never corrected silently.
    pub fn ensure_owns(&self, record_tenant: TenantId) -> TenantResult<()> {
        if self.bypassed {
            return Ok(());
        }

        match self.tenant_id() {
            Some(active) if active == record_tenant => Ok(()),
            Some(active) => {
                tracing::warn!(
                    record_tenant,
                    active_tenant = active,
                    "Tenant-scoped record does not belong to the active tenant"
                );
                Err(TenantError::Mismatch {
                    record: record_tenant,
                    active,
                })
            }
            None => Err(TenantError::NoActiveTenant),
        }
    }

    /// [`TenantContext::ensure_owns`] for a [`TenantScoped`] record.
    pub fn ensure_record<R: TenantScoped>(&self, record: &R) -> TenantResult<()> {
        self.ensure_owns(record.tenant_id())
    }

    /// Stamp a new record with the active tenant's key.
    pub fn require_tenant_id(&self) -> TenantResult<TenantId> {
        self.tenant_id().ok_or(TenantError::NoActiveTenant)
    }
}
