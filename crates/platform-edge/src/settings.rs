//! Edge cache settings.
//!
//! Loaded from environment variables with defaults suitable for local
//! development.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{EdgeError, EdgeResult};
use crate::retry::RetryPolicy;

/// How the edge keeps tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    /// Fetch per domain on demand and cache with a TTL
    Lazy,
    /// Load every tenant up front and refresh on an interval
    Preload,
}

/// Edge tenant cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    /// Backend tenant API.
    pub backend: BackendEndpoint,

    /// Backend request timeout in seconds.
    pub timeout_secs: u64,

    /// Load the whole tenant set instead of fetching per domain.
    pub preload: bool,

    /// Lazy-mode entry lifetime in seconds.
    pub resolver_ttl_secs: u64,

    /// Preload refresh interval in seconds.
    pub cache_ttl_secs: u64,

    /// When off, every lookup goes to the backend.
    pub cache_enabled: bool,

    /// Attempts for the bulk preload fetch.
    pub max_retries: u32,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            backend: BackendEndpoint {
                base_url: "http://localhost:8000".to_string(),
                api_key: None,
            },
            timeout_secs: 10,
            preload: false,
            resolver_ttl_secs: 300,
            cache_ttl_secs: 600,
            cache_enabled: true,
            max_retries: 3,
        }
    }
}

impl EdgeSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `TENANT_API_URL`: Backend base URL (default: http://localhost:8000)
    /// - `TENANT_API_KEY`: Bearer key for the tenant API
    /// - `TENANT_API_TIMEOUT_SECS`: Request timeout in seconds (default: 10)
    /// - `TENANT_PRELOAD`: Preload mode on/off (default: off)
    /// - `TENANT_RESOLVER_TTL`: Lazy entry lifetime in seconds (default: 300)
    /// - `TENANT_CACHE_TTL`: Preload refresh interval in seconds (default: 600)
    /// - `TENANT_CACHE_ENABLED`: Cache on/off (default: on)
    /// - `TENANT_API_RETRIES`: Bulk fetch attempts (default: 3)
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            backend: BackendEndpoint {
                base_url: std::env::var("TENANT_API_URL").unwrap_or(default.backend.base_url),
                api_key: std::env::var("TENANT_API_KEY").ok().filter(|k| !k.is_empty()),
            },
            timeout_secs: std::env::var("TENANT_API_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.timeout_secs),
            preload: std::env::var("TENANT_PRELOAD")
                .ok()
                .and_then(|s| parse_switch(&s))
                .unwrap_or(default.preload),
            resolver_ttl_secs: std::env::var("TENANT_RESOLVER_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.resolver_ttl_secs),
            cache_ttl_secs: std::env::var("TENANT_CACHE_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.cache_ttl_secs),
            cache_enabled: std::env::var("TENANT_CACHE_ENABLED")
                .ok()
                .and_then(|s| parse_switch(&s))
                .unwrap_or(default.cache_enabled),
            max_retries: std::env::var("TENANT_API_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default.max_retries),
        }
    }

    /// The active cache mode.
    pub fn mode(&self) -> CacheMode {
        if self.preload {
            CacheMode::Preload
        } else {
            CacheMode::Lazy
        }
    }

    /// Backend request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Lazy-mode entry lifetime.
    pub fn resolver_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(u32::try_from(self.resolver_ttl_secs).unwrap_or(u32::MAX)))
    }

    /// Preload refresh interval, never shorter than one second.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.max(1))
    }

    /// Retry policy for the bulk fetch.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries.max(1),
            ..RetryPolicy::default()
        }
    }

    /// Check that the settings can drive a cache.
    pub fn validate(&self) -> EdgeResult<()> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(EdgeError::InvalidConfig {
                key: "TENANT_API_URL".to_string(),
                message: format!("not an http(s) URL: {}", self.backend.base_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(EdgeError::InvalidConfig {
                key: "TENANT_API_TIMEOUT_SECS".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse an on/off switch.
fn parse_switch(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "on" | "true" | "yes" => Some(true),
        "0" | "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// The backend tenant API.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendEndpoint {
    /// Base URL for the backend (e.g., "https://api.relay.app").
    pub base_url: String,

    /// API key sent as a bearer token.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for BackendEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendEndpoint")
            .field("base_url", &self.base_url)
            .field("has_auth", &self.has_auth())
            .finish()
    }
}

impl BackendEndpoint {
    /// Build a full URL by appending a path to the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Check if API key authentication is available.
    pub fn has_auth(&self) -> bool {
        self.api_key.is_some()
    }
}
