//! Cache manager contributor

use platform_tenant::{EffectiveConfig, Tenant};

use crate::contributor::{Applied, ConfigContributor};
use crate::error::ContributorResult;
use crate::runtime::Runtime;

/// Purges resolved cache repositories so they pick up the active prefix.
///
/// Runs after [`CacheContributor`](super::CacheContributor).
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheManagerContributor;

impl ConfigContributor for CacheManagerContributor {
    fn name(&self) -> &'static str {
        "cache_manager"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn apply(
        &self,
        _tenant: &Tenant,
        _config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied> {
        runtime.cache_manager.purge();
        Ok(Applied::Rebound)
    }

    fn reset(&self, runtime: &mut Runtime) {
        runtime.cache_manager.purge();
    }
}
