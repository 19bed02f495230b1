//! The configuration pipeline
//!
//! Contributors are registered once at process start and run in ascending
//! priority order. [`ConfigPipeline::resolve`] computes the effective config
//! without side effects; [`ConfigPipeline::apply`] also rebinds the worker's
//! runtime and hands back a [`TenantScope`] that restores every binding when
//! it is reverted or dropped.

use std::fmt;
use std::sync::Arc;

use platform_tenant::{EffectiveConfig, Tenant, TenantId};
use tracing::{debug, instrument, warn};

use crate::contributor::{Applied, ConfigContributor};
use crate::contributors::{
    AppContributor, CacheContributor, CacheManagerContributor, DatabaseContributor,
    SessionContributor,
};
use crate::runtime::Runtime;

/// Ordered registry of contributors.
#[derive(Clone)]
pub struct ConfigPipeline {
    contributors: Vec<Arc<dyn ConfigContributor>>,
}

/// Builder for [`ConfigPipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    contributors: Vec<Arc<dyn ConfigContributor>>,
}

impl PipelineBuilder {
    /// Register a contributor.
    pub fn register<C: ConfigContributor + 'static>(mut self, contributor: C) -> Self {
        self.contributors.push(Arc::new(contributor));
        self
    }

    /// Register a shared contributor.
    pub fn register_arc(mut self, contributor: Arc<dyn ConfigContributor>) -> Self {
        self.contributors.push(contributor);
        self
    }

    /// Sort by priority and freeze the registry.
    ///
    /// The sort is stable: contributors with equal priority run in
    /// registration order, so the last registered wins conflicting writes.
    pub fn build(mut self) -> ConfigPipeline {
        self.contributors.sort_by_key(|c| c.priority());
        ConfigPipeline {
            contributors: self.contributors,
        }
    }
}

impl ConfigPipeline {
    /// Start a new registry.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline with the five platform contributors.
    pub fn standard() -> Self {
        Self::builder()
            .register(AppContributor)
            .register(DatabaseContributor)
            .register(CacheContributor)
            .register(SessionContributor)
            .register(CacheManagerContributor)
            .build()
    }

    /// Contributor names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.contributors.iter().map(|c| c.name()).collect()
    }

    /// Number of registered contributors.
    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// Check if no contributor is registered.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Compute the effective config for `tenant`.
    pub fn resolve(&self, tenant: &Tenant, raw: &EffectiveConfig) -> EffectiveConfig {
        let mut config = raw.clone();
        for contributor in &self.contributors {
            contributor.resolve(tenant, &mut config);
        }
        config
    }

    /// Resolve the config and rebind `runtime` for `tenant`.
    ///
    /// A contributor that fails is logged and reset on the spot; the
    /// remaining contributors still run.
    #[instrument(skip_all, fields(tenant_id = tenant.id))]
    pub fn apply<'r>(
        &self,
        tenant: &Tenant,
        raw: &EffectiveConfig,
        runtime: &'r mut Runtime,
    ) -> TenantScope<'r> {
        let config = self.resolve(tenant, raw);
        let mut scope = TenantScope {
            runtime,
            config,
            tenant_id: tenant.id,
            entered: Vec::with_capacity(self.contributors.len()),
            report: PipelineReport::default(),
            reverted: false,
        };

        for contributor in &self.contributors {
            let name = contributor.name();
            match contributor.apply(tenant, &scope.config, scope.runtime) {
                Ok(Applied::Rebound) => {
                    debug!(contributor = name, "Contributor rebound");
                    scope.report.applied.push(name);
                    scope.entered.push(Arc::clone(contributor));
                }
                Ok(Applied::Skipped) => {
                    debug!(contributor = name, "Contributor skipped, keeping defaults");
                    scope.report.skipped.push(name);
                    scope.entered.push(Arc::clone(contributor));
                }
                Err(e) => {
                    warn!(
                        contributor = name,
                        error = %e,
                        code = e.error_code(),
                        "Contributor failed, falling back to defaults"
                    );
                    contributor.reset(scope.runtime);
                    scope.report.failed.push((name, e.to_string()));
                }
            }
        }

        scope
    }

    /// Apply, run `handler` inside the scope, then revert.
    pub fn run<R>(
        &self,
        tenant: &Tenant,
        raw: &EffectiveConfig,
        runtime: &mut Runtime,
        handler: impl FnOnce(&mut TenantScope<'_>) -> R,
    ) -> R {
        let mut scope = self.apply(tenant, raw, runtime);
        let out = handler(&mut scope);
        scope.revert_all();
        out
    }
}

impl fmt::Debug for ConfigPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPipeline")
            .field("contributors", &self.names())
            .finish()
    }
}

/// What happened to each contributor during apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// Contributors that rebound their resource
    pub applied: Vec<&'static str>,

    /// Contributors that kept process defaults
    pub skipped: Vec<&'static str>,

    /// Contributors that failed, with the error message
    pub failed: Vec<(&'static str, String)>,
}

impl PipelineReport {
    /// Check if any contributor failed.
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// A tenant applied to one worker's runtime.
///
/// Holds the only mutable borrow of the runtime for as long as the tenant
/// is applied. Every binding is reset exactly once, either by
/// [`TenantScope::revert_all`] or when the scope is dropped.
pub struct TenantScope<'r> {
    runtime: &'r mut Runtime,
    config: EffectiveConfig,
    tenant_id: TenantId,
    entered: Vec<Arc<dyn ConfigContributor>>,
    report: PipelineReport,
    reverted: bool,
}

impl<'r> TenantScope<'r> {
    /// The resolved effective config.
    pub fn config(&self) -> &EffectiveConfig {
        &self.config
    }

    /// The runtime as rebound for the tenant.
    pub fn runtime(&self) -> &Runtime {
        &*self.runtime
    }

    /// Mutable access to the rebound runtime.
    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut *self.runtime
    }

    /// Id of the applied tenant.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Per-contributor outcome of the apply.
    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Reset every binding in reverse priority order.
    pub fn revert_all(mut self) -> PipelineReport {
        self.revert();
        std::mem::take(&mut self.report)
    }

    fn revert(&mut self) {
        if self.reverted {
            return;
        }
        while let Some(contributor) = self.entered.pop() {
            contributor.reset(self.runtime);
        }
        self.reverted = true;
        debug!(tenant_id = self.tenant_id, "Tenant bindings reverted");
    }
}

impl Drop for TenantScope<'_> {
    fn drop(&mut self) {
        self.revert();
    }
}

impl fmt::Debug for TenantScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantScope")
            .field("tenant_id", &self.tenant_id)
            .field("report", &self.report)
            .field("reverted", &self.reverted)
            .finish()
    }
}
