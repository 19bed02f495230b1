//! Cache store contributor

use platform_tenant::{EffectiveConfig, Tenant, Visibility};

use super::{force_prefix_visibility, read_string};
use crate::contributor::{Applied, ConfigContributor};
use crate::error::{ContributorError, ContributorResult};
use crate::runtime::{CacheSettings, Runtime};

/// Points the cache at the tenant's store and key prefix.
///
/// Needs `cache_store` or `cache_prefix`. The prefix defaults to
/// `tenant_{public_id}_` so tenants never share keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheContributor;

/// Default cache prefix for a tenant.
pub fn tenant_cache_prefix(public_id: &str) -> String {
    format!("tenant_{public_id}_")
}

impl ConfigContributor for CacheContributor {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn resolve(&self, _tenant: &Tenant, config: &mut EffectiveConfig) {
        force_prefix_visibility(config, "cache_", Visibility::Private);
    }

    fn apply(
        &self,
        tenant: &Tenant,
        config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied> {
        let store = read_string(config, "cache_store");
        let prefix = read_string(config, "cache_prefix");
        if store.is_none() && prefix.is_none() {
            return Ok(Applied::Skipped);
        }

        let prefix = prefix.unwrap_or_else(|| tenant_cache_prefix(&tenant.public_id));
        if prefix.chars().any(char::is_whitespace) {
            return Err(ContributorError::invalid("cache_prefix", "must not contain whitespace"));
        }

        let store = store.unwrap_or_else(|| runtime.cache.default_value().store.clone());
        runtime.cache.rebind(CacheSettings { store, prefix });

        Ok(Applied::Rebound)
    }

    fn reset(&self, runtime: &mut Runtime) {
        runtime.cache.reset();
    }
}
