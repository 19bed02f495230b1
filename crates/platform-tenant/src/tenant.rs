//! Tenant domain model
//!
//! This module provides the core Tenant entity. A tenant is an isolated
//! organization selected by the domain an inbound request arrives on, and
//! carries the raw configuration the pipeline composes from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::EffectiveConfig;

/// Internal tenant identifier.
pub type TenantId = i64;

/// A tenant in the multi-tenant system.
///
/// Domains are unique across tenants, which makes resolution by domain
/// unambiguous. A tenant may name a parent; keys it does not override are
/// inherited from the parent chain.
///
/// # Architecture
///
/// ```text
/// Tenant
///   ├─ domain (resolution key)
///   ├─ public_id (safe to show to browsers)
///   ├─ parent_id ─→ Tenant
///   └─ EffectiveConfig (values + visibility + tier)
/// ```
///
/// # Examples
///
/// ```
/// use platform_tenant::Tenant;
///
/// let tenant = Tenant::new(1, "Acme Corp", "Acme.App");
/// assert_eq!(tenant.domain, "acme.app");
/// assert!(tenant.public_id.starts_with("tnt_"));
/// assert!(tenant.is_active);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tenant {
    /// Internal identifier
    pub id: TenantId,

    /// Externally-safe identifier, embedded in cookie names and URLs
    pub public_id: String,

    /// Display name
    pub name: String,

    /// Unique domain used to resolve inbound requests
    pub domain: String,

    /// Parent tenant this one inherits configuration from
    pub parent_id: Option<TenantId>,

    /// Raw stored configuration
    #[serde(default)]
    pub config: EffectiveConfig,

    /// Subscription tier
    pub tier: Option<String>,

    /// Whether the tenant is active
    pub is_active: bool,

    /// When the tenant was created
    pub created_at: DateTime<Utc>,

    /// When the tenant was last updated
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Creates a new active tenant with an empty configuration.
    ///
    /// The domain is normalized and a `tnt_`-prefixed public id is generated.
    ///
    /// # Arguments
    ///
    /// * `id` - Internal identifier
    /// * `name` - Display name
    /// * `domain` - Resolution domain
    pub fn new(id: TenantId, name: impl Into<String>, domain: impl AsRef<str>) -> Self {
        let now = Utc::now();
        Self {
            id,
            public_id: format!("tnt_{}", Uuid::now_v7().simple()),
            name: name.into(),
            domain: normalize_domain(domain.as_ref()),
            parent_id: None,
            config: EffectiveConfig::new(),
            tier: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the public identifier.
    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.public_id = public_id.into();
        self
    }

    /// Set the parent tenant.
    pub fn with_parent(mut self, parent_id: TenantId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Set the stored configuration.
    pub fn with_config(mut self, config: EffectiveConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the tier.
    pub fn with_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    /// Check if the tenant inherits from a parent.
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// The stored configuration with the record's tier applied when the
    /// configuration carries none of its own.
    pub fn raw_config(&self) -> EffectiveConfig {
        let mut config = self.config.clone();
        if config.tier().is_none() {
            config.set_tier(self.tier.clone());
        }
        config
    }
}

/// Records that belong to exactly one tenant.
pub trait TenantScoped {
    /// The tenant key stored on the record.
    fn tenant_id(&self) -> TenantId;
}

/// Normalize a host or domain for lookup.
///
/// Trims whitespace, lowercases, strips any port and a trailing dot.
///
/// # Examples
///
/// ```
/// use platform_tenant::tenant::normalize_domain;
///
/// assert_eq!(normalize_domain(" Acme.App:8443 "), "acme.app");
/// assert_eq!(normalize_domain("acme.app."), "acme.app");
/// ```
pub fn normalize_domain(host: &str) -> String {
    let host = host.trim();
    let host = match host.rsplit_once(':') {
        Some((name, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    };
    host.trim_end_matches('.').to_ascii_lowercase()
}
