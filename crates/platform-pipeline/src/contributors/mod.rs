//! The platform contributors, one per configuration concern
//!
//! | Contributor | Priority | Resource |
//! |---|---|---|
//! | [`AppContributor`] | 10 | application identity |
//! | [`DatabaseContributor`] | 20 | database connection |
//! | [`CacheContributor`] | 30 | cache store and prefix |
//! | [`SessionContributor`] | 40 | session driver, lifetime and cookies |
//! | [`CacheManagerContributor`] | 50 | resolved cache repositories |

pub mod app;
pub mod cache;
pub mod cache_manager;
pub mod database;
pub mod session;

pub use app::AppContributor;
pub use cache::CacheContributor;
pub use cache_manager::CacheManagerContributor;
pub use database::DatabaseContributor;
pub use session::{xsrf_cookie_name, SessionContributor, XSRF_COOKIE};

use platform_tenant::case::to_snake_case;
use platform_tenant::{EffectiveConfig, Visibility};
use serde_json::Value;

use crate::error::{ContributorError, ContributorResult};

/// Read a scalar as a string. Numbers and booleans are accepted.
pub(crate) fn read_string(config: &EffectiveConfig, key: &str) -> Option<String> {
    match config.lookup(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read an unsigned integer given as a number or a numeric string.
pub(crate) fn read_u64(config: &EffectiveConfig, key: &str) -> ContributorResult<Option<u64>> {
    let Some(value) = config.lookup(key) else {
        return Ok(None);
    };
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => return Ok(None),
        _ => None,
    };
    parsed
        .map(Some)
        .ok_or_else(|| ContributorError::invalid(key, format!("expected an unsigned integer, got {value}")))
}

/// Force every key whose snake_case form starts with `prefix` to `visibility`.
pub(crate) fn force_prefix_visibility(
    config: &mut EffectiveConfig,
    prefix: &str,
    visibility: Visibility,
) {
    let keys: Vec<String> = config
        .keys()
        .filter(|key| to_snake_case(key).starts_with(prefix))
        .cloned()
        .collect();
    for key in keys {
        config.set_visibility(key, visibility);
    }
}

/// Set `visibility` on the stored spelling of `key` when it has none.
pub(crate) fn default_key_visibility(
    config: &mut EffectiveConfig,
    key: &str,
    visibility: Visibility,
) {
    if let Some(matched) = config.matching_key(key) {
        config.default_visibility(&matched, visibility);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_read_u64_accepts_numbers_and_strings() {
        let mut config = EffectiveConfig::new();
        config.set("db_port", json!(6543)).set("session_lifetime", json!("90"));

        assert_eq!(read_u64(&config, "db_port").unwrap(), Some(6543));
        assert_eq!(read_u64(&config, "sessionLifetime").unwrap(), Some(90));
        assert_eq!(read_u64(&config, "missing").unwrap(), None);
    }

    #[test]
    fn test_read_u64_rejects_garbage() {
        let mut config = EffectiveConfig::new();
        config.set("db_port", json!("fifty"));
        assert!(matches!(
            read_u64(&config, "db_port"),
            Err(ContributorError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_force_prefix_visibility_matches_camel_keys() {
        let mut config = EffectiveConfig::new();
        config
            .set_with_visibility("dbHost", json!("db"), Visibility::Public)
            .set("database_name", json!("x"));

        force_prefix_visibility(&mut config, "db_", Visibility::Private);
        assert_eq!(config.visibility("dbHost"), Visibility::Private);
        assert!(!config.visibility_map().contains_key("database_name"));
    }
}
