//! Runtime resource bindings
//!
//! A [`Runtime`] is the set of stateful bindings one worker uses while it
//! serves a request: the application identity, the active database
//! connection, the cache store and prefix, resolved cache repositories and
//! the session configuration. Contributors re-point these at tenant values
//! and reset them to the process defaults afterwards.
//!
//! Runtime bindings live only inside the backend process. None of these
//! types implement `Serialize`.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// A value with a process default and a currently active binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<T> {
    default: T,
    active: T,
}

impl<T: Clone + PartialEq> Binding<T> {
    /// Create a binding whose active value is the default.
    pub fn new(default: T) -> Self {
        Self {
            active: default.clone(),
            default,
        }
    }

    /// The active value.
    pub fn get(&self) -> &T {
        &self.active
    }

    /// The process default.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Replace the active value.
    pub fn rebind(&mut self, value: T) {
        self.active = value;
    }

    /// Restore the process default.
    pub fn reset(&mut self) {
        self.active = self.default.clone();
    }

    /// Check if the active value is the process default.
    pub fn is_default(&self) -> bool {
        self.active == self.default
    }
}

/// Application identity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AppSettings {
    /// Application display name
    pub name: String,

    /// Canonical base URL
    pub url: String,

    /// Default locale
    pub locale: String,

    /// Public id of the tenant the worker is serving
    #[serde(default)]
    pub tenant_public_id: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "Relay".to_string(),
            url: "http://localhost".to_string(),
            locale: "en".to_string(),
            tenant_public_id: None,
        }
    }
}

/// Database connection parameters.
#[derive(Clone, PartialEq, Deserialize)]
pub struct DatabaseConnection {
    /// Host name or IP address
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Database name
    pub database: String,

    /// User name
    pub username: String,

    /// Password
    pub password: String,
}

impl fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConnection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Default for DatabaseConnection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            database: "relay".to_string(),
            username: "relay".to_string(),
            password: String::new(),
        }
    }
}

/// Cache store and key prefix.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheSettings {
    /// Store driver name (e.g. `redis`, `memory`)
    pub store: String,

    /// Prefix applied to every cache key
    pub prefix: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            store: "memory".to_string(),
            prefix: "relay_cache_".to_string(),
        }
    }
}

/// Session driver, lifetime and cookie names.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSettings {
    /// Session storage driver
    pub driver: String,

    /// Idle lifetime in minutes
    pub lifetime_minutes: u32,

    /// Session cookie name
    pub cookie: String,

    /// XSRF token cookie name
    pub xsrf_cookie: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            driver: "cookie".to_string(),
            lifetime_minutes: 120,
            cookie: "relay_session".to_string(),
            xsrf_cookie: crate::contributors::session::XSRF_COOKIE.to_string(),
        }
    }
}

/// A cache handle bound to a store and prefix at resolution time.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRepository {
    /// Store driver the repository writes to
    pub store: String,

    /// Prefix captured when the repository was resolved
    pub prefix: String,
}

impl CacheRepository {
    /// Fully prefixed cache key.
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }
}

/// Resolved cache repositories, keyed by store name.
///
/// Repositories capture the prefix in force when they are first resolved,
/// so they must be purged whenever the cache binding changes.
#[derive(Debug, Default)]
pub struct CacheManager {
    resolved: HashMap<String, CacheRepository>,
    purges: u64,
}

impl CacheManager {
    /// Resolve (or reuse) the repository for the active store.
    pub fn repository(&mut self, cache: &CacheSettings) -> &CacheRepository {
        self.resolved
            .entry(cache.store.clone())
            .or_insert_with(|| CacheRepository {
                store: cache.store.clone(),
                prefix: cache.prefix.clone(),
            })
    }

    /// Forget every resolved repository.
    pub fn purge(&mut self) {
        self.resolved.clear();
        self.purges += 1;
    }

    /// Number of resolved repositories.
    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// How many times the manager has been purged.
    pub fn purge_count(&self) -> u64 {
        self.purges
    }
}

/// Process defaults every binding resets to.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuntimeDefaults {
    /// Application identity
    #[serde(default)]
    pub app: AppSettings,

    /// Default database connection
    #[serde(default)]
    pub database: DatabaseConnection,

    /// Default cache store
    #[serde(default)]
    pub cache: CacheSettings,

    /// Default session configuration
    #[serde(default)]
    pub session: SessionSettings,
}

impl RuntimeDefaults {
    /// Load defaults from environment variables.
    ///
    /// Environment variables:
    /// - `APP_NAME`, `APP_URL`, `APP_LOCALE`
    /// - `DB_HOST`, `DB_PORT`, `DB_DATABASE`, `DB_USERNAME`, `DB_PASSWORD`
    /// - `CACHE_STORE`, `CACHE_PREFIX`
    /// - `SESSION_DRIVER`, `SESSION_LIFETIME` (minutes), `SESSION_COOKIE`
    pub fn from_env() -> Self {
        let default = Self::default();
        let var = |name: &str| std::env::var(name).ok();

        Self {
            app: AppSettings {
                name: var("APP_NAME").unwrap_or(default.app.name),
                url: var("APP_URL").unwrap_or(default.app.url),
                locale: var("APP_LOCALE").unwrap_or(default.app.locale),
                tenant_public_id: None,
            },
            database: DatabaseConnection {
                host: var("DB_HOST").unwrap_or(default.database.host),
                port: var("DB_PORT")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.database.port),
                database: var("DB_DATABASE").unwrap_or(default.database.database),
                username: var("DB_USERNAME").unwrap_or(default.database.username),
                password: var("DB_PASSWORD").unwrap_or(default.database.password),
            },
            cache: CacheSettings {
                store: var("CACHE_STORE").unwrap_or(default.cache.store),
                prefix: var("CACHE_PREFIX").unwrap_or(default.cache.prefix),
            },
            session: SessionSettings {
                driver: var("SESSION_DRIVER").unwrap_or(default.session.driver),
                lifetime_minutes: var("SESSION_LIFETIME")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(default.session.lifetime_minutes),
                cookie: var("SESSION_COOKIE").unwrap_or(default.session.cookie),
                xsrf_cookie: default.session.xsrf_cookie,
            },
        }
    }
}

/// The bindings one worker reconfigures per request.
///
/// Each worker owns its runtime, so nothing applied for one request is
/// visible to another.
#[derive(Debug)]
pub struct Runtime {
    /// Application identity
    pub app: Binding<AppSettings>,

    /// Active database connection
    pub database: Binding<DatabaseConnection>,

    /// Active cache store and prefix
    pub cache: Binding<CacheSettings>,

    /// Resolved cache repositories
    pub cache_manager: CacheManager,

    /// Active session configuration
    pub session: Binding<SessionSettings>,
}

impl Runtime {
    /// Create a runtime bound to the given defaults.
    pub fn new(defaults: RuntimeDefaults) -> Self {
        Self {
            app: Binding::new(defaults.app),
            database: Binding::new(defaults.database),
            cache: Binding::new(defaults.cache),
            cache_manager: CacheManager::default(),
            session: Binding::new(defaults.session),
        }
    }

    /// Create a runtime from environment defaults.
    pub fn from_env() -> Self {
        Self::new(RuntimeDefaults::from_env())
    }

    /// Resolve the cache repository for the active cache binding.
    pub fn cache_repository(&mut self) -> &CacheRepository {
        self.cache_manager.repository(self.cache.get())
    }

    /// Check if every binding is back at its process default.
    pub fn is_neutral(&self) -> bool {
        self.app.is_default()
            && self.database.is_default()
            && self.cache.is_default()
            && self.session.is_default()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_rebind_and_reset() {
        let mut binding = Binding::new(CacheSettings::default());
        assert!(binding.is_default());

        binding.rebind(CacheSettings {
            store: "redis".to_string(),
            prefix: "tenant_a_".to_string(),
        });
        assert!(!binding.is_default());
        assert_eq!(binding.get().store, "redis");
        assert_eq!(binding.default_value().store, "memory");

        binding.reset();
        assert!(binding.is_default());
    }

    #[test]
    fn test_database_password_redacted() {
        let conn = DatabaseConnection {
            password: "hunter2".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", conn);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_cache_manager_captures_prefix() {
        let mut runtime = Runtime::default();
        assert_eq!(runtime.cache_repository().key("k"), "relay_cache_k");

        runtime.cache.rebind(CacheSettings {
            store: "memory".to_string(),
            prefix: "tenant_x_".to_string(),
        });
        // still the stale repository until purged
        assert_eq!(runtime.cache_repository().key("k"), "relay_cache_k");

        runtime.cache_manager.purge();
        assert_eq!(runtime.cache_repository().key("k"), "tenant_x_k");
        assert_eq!(runtime.cache_manager.purge_count(), 1);
    }

    #[test]
    fn test_defaults_deserialize_partially() {
        let defaults: RuntimeDefaults =
            serde_json::from_str(r#"{"cache": {"store": "redis", "prefix": "p_"}}"#).unwrap();
        assert_eq!(defaults.cache.store, "redis");
        assert_eq!(defaults.database, DatabaseConnection::default());
    }

    #[test]
    fn test_new_runtime_is_neutral() {
        assert!(Runtime::default().is_neutral());
    }
}
