//! Application identity contributor

use platform_tenant::{EffectiveConfig, Tenant, Visibility};
use serde_json::json;

use super::{default_key_visibility, read_string};
use crate::contributor::{Applied, ConfigContributor};
use crate::error::ContributorResult;
use crate::runtime::{AppSettings, Runtime};

/// Rebinds the application name, URL and locale, and publishes the tenant
/// identity to the browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppContributor;

impl ConfigContributor for AppContributor {
    fn name(&self) -> &'static str {
        "app"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn resolve(&self, tenant: &Tenant, config: &mut EffectiveConfig) {
        config
            .set_with_visibility("tenant_id", json!(tenant.public_id), Visibility::Public)
            .set_with_visibility("tenant_name", json!(tenant.name), Visibility::Public);

        for key in ["app_name", "app_url", "app_locale"] {
            default_key_visibility(config, key, Visibility::Public);
        }
    }

    fn apply(
        &self,
        tenant: &Tenant,
        config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied> {
        let defaults = runtime.app.default_value().clone();

        runtime.app.rebind(AppSettings {
            name: read_string(config, "app_name").unwrap_or(defaults.name),
            url: read_string(config, "app_url").unwrap_or(defaults.url),
            locale: read_string(config, "app_locale").unwrap_or(defaults.locale),
            tenant_public_id: Some(tenant.public_id.clone()),
        });

        Ok(Applied::Rebound)
    }

    fn reset(&self, runtime: &mut Runtime) {
        runtime.app.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_publishes_identity() {
        let tenant = Tenant::new(4, "Acme", "acme.app").with_public_id("tnt_abc");
        let mut config = EffectiveConfig::new();
        config.set("appUrl", json!("https://acme.app"));

        AppContributor.resolve(&tenant, &mut config);

        assert_eq!(config.get_str("tenant_id"), Some("tnt_abc"));
        assert_eq!(config.visibility("tenant_name"), Visibility::Public);
        assert_eq!(config.visibility("appUrl"), Visibility::Public);
        assert!(!config.visibility_map().contains_key("app_locale"));
    }

    #[test]
    fn test_apply_falls_back_per_key() {
        let tenant = Tenant::new(4, "Acme", "acme.app").with_public_id("tnt_abc");
        let mut config = EffectiveConfig::new();
        config.set("app_name", json!("Acme Portal"));
        let mut runtime = Runtime::default();

        let outcome = AppContributor.apply(&tenant, &config, &mut runtime).unwrap();
        assert_eq!(outcome, Applied::Rebound);

        let app = runtime.app.get();
        assert_eq!(app.name, "Acme Portal");
        assert_eq!(app.url, AppSettings::default().url);
        assert_eq!(app.tenant_public_id.as_deref(), Some("tnt_abc"));

        AppContributor.reset(&mut runtime);
        assert!(runtime.app.is_default());
    }
}
