//! Session contributor and the XSRF cookie naming contract

use platform_tenant::{EffectiveConfig, Tenant, Visibility};
use serde_json::json;

use super::{read_string, read_u64};
use crate::contributor::{Applied, ConfigContributor};
use crate::error::{ContributorError, ContributorResult};
use crate::runtime::{Runtime, SessionSettings};

/// XSRF cookie name when no tenant is active.
pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

/// XSRF cookie name for the active tenant, if any.
///
/// The browser reads this name, so it must stay exactly
/// `XSRF-TOKEN-{public_id}` with a tenant and `XSRF-TOKEN` without.
pub fn xsrf_cookie_name(public_id: Option<&str>) -> String {
    match public_id {
        Some(id) => format!("{XSRF_COOKIE}-{id}"),
        None => XSRF_COOKIE.to_string(),
    }
}

/// Rebinds the session driver, lifetime and cookie names.
///
/// Every key is optional. The XSRF cookie is always renamed for the tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionContributor;

impl ConfigContributor for SessionContributor {
    fn name(&self) -> &'static str {
        "session"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn resolve(&self, tenant: &Tenant, config: &mut EffectiveConfig) {
        config.set_with_visibility(
            "xsrf_cookie",
            json!(xsrf_cookie_name(Some(&tenant.public_id))),
            Visibility::Public,
        );
        if let Some(key) = config.matching_key("session_lifetime") {
            config.set_visibility(key, Visibility::Protected);
        }
    }

    fn apply(
        &self,
        tenant: &Tenant,
        config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied> {
        let defaults = runtime.session.default_value().clone();
        let lifetime_minutes = match read_u64(config, "session_lifetime")? {
            Some(minutes) => u32::try_from(minutes)
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| {
                    ContributorError::invalid("session_lifetime", format!("{minutes} is out of range"))
                })?,
            None => defaults.lifetime_minutes,
        };

        runtime.session.rebind(SessionSettings {
            driver: read_string(config, "session_driver").unwrap_or(defaults.driver),
            lifetime_minutes,
            cookie: read_string(config, "session_cookie").unwrap_or(defaults.cookie),
            xsrf_cookie: xsrf_cookie_name(Some(&tenant.public_id)),
        });

        Ok(Applied::Rebound)
    }

    fn reset(&self, runtime: &mut Runtime) {
        runtime.session.reset();
    }
}
