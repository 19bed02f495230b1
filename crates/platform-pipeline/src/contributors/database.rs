//! Database connection contributor

use platform_tenant::{EffectiveConfig, Tenant, Visibility};
use tracing::debug;

use super::{force_prefix_visibility, read_string, read_u64};
use crate::contributor::{Applied, ConfigContributor};
use crate::error::{ContributorError, ContributorResult};
use crate::runtime::{DatabaseConnection, Runtime};

/// Switches the active database connection to the tenant's database.
///
/// `db_host` is required; without it the process connection stays bound.
/// Every `db_*` key is private.
#[derive(Debug, Clone, Copy, Default)]
pub struct DatabaseContributor;

impl ConfigContributor for DatabaseContributor {
    fn name(&self) -> &'static str {
        "database"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn resolve(&self, _tenant: &Tenant, config: &mut EffectiveConfig) {
        force_prefix_visibility(config, "db_", Visibility::Private);
    }

    fn apply(
        &self,
        tenant: &Tenant,
        config: &EffectiveConfig,
        runtime: &mut Runtime,
    ) -> ContributorResult<Applied> {
        let Some(host) = read_string(config, "db_host") else {
            debug!(tenant_id = tenant.id, "No db_host, keeping process connection");
            return Ok(Applied::Skipped);
        };
        validate_host(&host)?;

        let defaults = runtime.database.default_value().clone();
        let port = match read_u64(config, "db_port")? {
            Some(port) => validate_port(port)?,
            None => defaults.port,
        };

        runtime.database.rebind(DatabaseConnection {
            host,
            port,
            database: read_string(config, "db_database").unwrap_or(defaults.database),
            username: read_string(config, "db_username").unwrap_or(defaults.username),
            password: read_string(config, "db_password").unwrap_or(defaults.password),
        });

        Ok(Applied::Rebound)
    }

    fn reset(&self, runtime: &mut Runtime) {
        runtime.database.reset();
    }
}

/// Reject hosts that are URLs, paths or contain whitespace.
fn validate_host(host: &str) -> ContributorResult<()> {
    if host.contains("://") {
        return Err(ContributorError::invalid("db_host", "must not include a scheme"));
    }
    if host.contains('/') {
        return Err(ContributorError::invalid("db_host", "must not include a path"));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(ContributorError::invalid("db_host", "must not contain whitespace"));
    }
    Ok(())
}

fn validate_port(port: u64) -> ContributorResult<u16> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| ContributorError::invalid("db_port", format!("{port} is out of range")))
}
