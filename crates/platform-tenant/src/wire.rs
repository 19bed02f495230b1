//! Wire payloads exchanged between the backend and the rendering edge
//!
//! The payload shape is:
//!
//! ```text
//! { id, name, domain, parent_id,
//!   config: { <keys>, __visibility: { <key>: "public"|"protected"|"private" } },
//!   tier }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::EffectiveConfig;
use crate::tenant::{Tenant, TenantId};
use crate::visibility::Exposure;

/// A tenant and its configuration as sent over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TenantPayload {
    /// Internal tenant id
    pub id: TenantId,

    /// Display name
    pub name: String,

    /// Resolution domain
    pub domain: String,

    /// Parent tenant id
    #[serde(default)]
    pub parent_id: Option<TenantId>,

    /// Configuration values with the embedded `__visibility` map
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Tier tag
    #[serde(default)]
    pub tier: Option<String>,
}

impl TenantPayload {
    /// Build the payload for a trust boundary.
    ///
    /// Only keys exposed to `exposure` are written, so a private value can
    /// never be serialized through this path.
    pub fn expose(tenant: &Tenant, config: &EffectiveConfig, exposure: Exposure) -> Self {
        let exposed = config.exposed(exposure);
        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            domain: tenant.domain.clone(),
            parent_id: tenant.parent_id,
            config: exposed.to_wire(),
            tier: exposed.tier().map(str::to_string).or_else(|| tenant.tier.clone()),
        }
    }

    /// Parse the embedded configuration.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig::from_wire(self.config.clone(), self.tier.clone())
    }

    /// Check if the tenant inherits from a parent.
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }
}
