//! The contributor seam
//!
//! A contributor owns one configuration concern. It shapes the resolved
//! config (defaults and visibility) and rebinds the matching runtime
//! resource, then restores the process default on reset.

use platform_tenant::{EffectiveConfig, Tenant};

use crate::error::ContributorResult;
use crate::runtime::Runtime;

/// Outcome of a successful apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The runtime resource now points at tenant values
    Rebound,

    /// Required keys were absent, the process default stays bound
    Skipped,
}

/// One configuration concern in the pipeline.
pub trait ConfigContributor: Send + Sync {
    /// Stable name used in logs and reports.
    fn name(&self) -> &'static str;

    /// Execution order; lower runs first.
    fn priority(&self) -> i32;

    /// Add derived keys and visibility to the accumulating config.
    ///
    /// Must not touch runtime state.
    fn resolve(&self, _tenant: &Tenant, _config: &mut EffectiveConfig) {}

    /// Rebind the runtime resource for `tenant`.
    ///
    /// Missing required keys return `Ok(Applied::Skipped)`, never an error.
    fn apply(
        &self,
        tenant: &Tenant,
        config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied>;

    /// Restore the process default.
    fn reset(&self, runtime: &mut Runtime);
}
