//! Session/tenant consistency guard
//!
//! A session issued under one tenant must never be honoured by another.
//! When the tenant resolved for a request differs from the tenant recorded
//! on the session, the guard destroys the old session, logs the user out
//! and re-issues the session under the new tenant.

use std::sync::Arc;

use platform_tenant::{Tenant, TenantContext, TenantId};
use tracing::{debug, instrument, warn};

use crate::error::SessionResult;
use crate::session::Session;
use crate::store::SessionStore;

/// What the guard did to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The session had no tenant and is now bound
    Bound,

    /// The session already belonged to the tenant
    Unchanged,

    /// The session belonged to another tenant and was regenerated
    Regenerated {
        /// Tenant the session was bound to before
        previous: TenantId,
    },

    /// No tenant is active for the request, nothing was checked
    Skipped,
}

/// Enforces that a session belongs to the request's tenant.
#[derive(Clone)]
pub struct SessionTenantGuard {
    store: Arc<dyn SessionStore>,
}

impl SessionTenantGuard {
    /// Create a guard over a session store.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Check `session` against `tenant` and remediate a mismatch.
    #[instrument(skip_all, fields(tenant_id = tenant.id))]
    pub async fn enforce(
        &self,
        session: &mut Session,
        tenant: &Tenant,
    ) -> SessionResult<GuardOutcome> {
        match session.tenant_id {
            None => {
                session.bind_tenant(tenant.id);
                self.store.save(session).await?;
                debug!("Session bound to tenant");
                Ok(GuardOutcome::Bound)
            }
            Some(current) if current == tenant.id => Ok(GuardOutcome::Unchanged),
            Some(previous) => {
                self.store.destroy(&session.token).await?;

                session.flush();
                session.logout();
                session.regenerate();
                session.regenerate_csrf();
                session.bind_tenant(tenant.id);
                session.touch();
                self.store.save(session).await?;

                warn!(
                    security_event = true,
                    previous_tenant_id = previous,
                    "Session used across tenants, regenerated and logged out"
                );
                Ok(GuardOutcome::Regenerated { previous })
            }
        }
    }

    /// Check `session` against the active tenant of a request context.
    ///
    /// Bypassed contexts and contexts without a tenant are skipped.
    pub async fn enforce_context(
        &self,
        session: &mut Session,
        context: &TenantContext,
    ) -> SessionResult<GuardOutcome> {
        if context.is_bypassed() {
            return Ok(GuardOutcome::Skipped);
        }
        match context.get() {
            Some(tenant) => self.enforce(session, tenant).await,
            None => Ok(GuardOutcome::Skipped),
        }
    }
}

impl std::fmt::Debug for SessionTenantGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTenantGuard").finish_non_exhaustive()
    }
}
