//! Tenant resolution from inbound requests
//!
//! The resolver maps a request's host to a [`Tenant`] through a
//! [`TenantRepository`], keeping a short-lived domain cache so repeated
//! requests for the same domain do not hit storage every time.
//!
//! ```text
//! RequestInfo ─→ domain ─→ resolution cache ─(miss)─→ TenantRepository
//!                                  │
//!                                  └─→ Arc<Tenant> ─→ TenantContext
//! ```

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::config::EffectiveConfig;
use crate::context::TenantContext;
use crate::error::{TenantError, TenantResult};
use crate::tenant::{normalize_domain, Tenant, TenantId};

/// Header that names the tenant domain explicitly, overriding `Host`.
pub const TENANT_DOMAIN_HEADER: &str = "X-Tenant-Domain";

/// Storage seam for tenant records.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Look up a tenant by its normalized domain.
    async fn find_by_domain(&self, domain: &str) -> TenantResult<Option<Tenant>>;

    /// Look up a tenant by internal id.
    async fn find_by_id(&self, id: TenantId) -> TenantResult<Option<Tenant>>;
}

/// In-memory tenant repository.
///
/// Suitable for tests and single-process deployments that load tenants at
/// startup. Domain uniqueness is enforced on insert.
#[derive(Debug, Default)]
pub struct MemoryTenantRepository {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
}

impl MemoryTenantRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tenant.
    pub async fn insert(&self, tenant: Tenant) -> TenantResult<()> {
        let mut tenants = self.tenants.write().await;

        let taken = tenants
            .values()
            .any(|existing| existing.domain == tenant.domain && existing.id != tenant.id);
        if taken {
            return Err(TenantError::DuplicateDomain(tenant.domain));
        }

        tenants.insert(tenant.id, tenant);
        Ok(())
    }

    /// Remove a tenant.
    pub async fn remove(&self, id: TenantId) -> Option<Tenant> {
        self.tenants.write().await.remove(&id)
    }

    /// All stored tenants.
    pub async fn all(&self) -> Vec<Tenant> {
        self.tenants.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl TenantRepository for MemoryTenantRepository {
    async fn find_by_domain(&self, domain: &str) -> TenantResult<Option<Tenant>> {
        let tenants = self.tenants.read().await;
        Ok(tenants.values().find(|t| t.domain == domain).cloned())
    }

    async fn find_by_id(&self, id: TenantId) -> TenantResult<Option<Tenant>> {
        Ok(self.tenants.read().await.get(&id).cloned())
    }
}

/// The parts of an inbound request tenant resolution looks at.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    /// `Host` header or authority
    pub host: Option<String>,

    /// Value of the `X-Tenant-Domain` header
    pub tenant_domain: Option<String>,
}

impl RequestInfo {
    /// Request arriving on `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            tenant_domain: None,
        }
    }

    /// Set the explicit tenant domain header.
    pub fn with_tenant_domain(mut self, domain: impl Into<String>) -> Self {
        self.tenant_domain = Some(domain.into());
        self
    }

    /// The normalized domain to resolve; the explicit header wins over `Host`.
    pub fn domain(&self) -> Option<String> {
        self.tenant_domain
            .as_deref()
            .or(self.host.as_deref())
            .map(normalize_domain)
            .filter(|domain| !domain.is_empty())
    }
}

/// Resolver configuration.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// How long a resolved domain stays cached (zero disables the cache)
    pub resolution_ttl: Duration,

    /// Maximum parent-chain depth followed for inheritance
    pub max_parent_depth: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            resolution_ttl: Duration::from_secs(60),
            max_parent_depth: 16,
        }
    }
}

impl ResolverSettings {
    /// Load settings from environment variables.
    ///
    /// Environment variables:
    /// - `TENANT_RESOLUTION_TTL`: Resolution cache TTL in seconds (default: 60)
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            resolution_ttl: std::env::var("TENANT_RESOLUTION_TTL")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.resolution_ttl),
            ..default
        }
    }
}

struct CachedResolution {
    tenant: Arc<Tenant>,
    expires_at: Instant,
}

/// Maps inbound requests to tenants.
///
/// Constructed once per process and shared by reference; the resolution
/// cache is a field of the resolver, not process-global state.
pub struct TenantResolver {
    repository: Arc<dyn TenantRepository>,
    settings: ResolverSettings,
    cache: RwLock<HashMap<String, CachedResolution>>,
}

impl std::fmt::Debug for TenantResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantResolver")
            .field("settings", &self.settings)
            .finish()
    }
}

impl TenantResolver {
    /// Create a resolver over a repository.
    pub fn new(repository: Arc<dyn TenantRepository>, settings: ResolverSettings) -> Self {
        Self {
            repository,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the tenant a request belongs to.
    pub async fn resolve_tenant(&self, request: &RequestInfo) -> TenantResult<Arc<Tenant>> {
        let domain = request.domain().ok_or(TenantError::MissingHost)?;
        self.resolve_domain(&domain).await
    }

    /// Resolve a request straight into a fresh [`TenantContext`].
    pub async fn resolve_context(&self, request: &RequestInfo) -> TenantResult<TenantContext> {
        let tenant = self.resolve_tenant(request).await?;
        Ok(TenantContext::for_tenant(tenant))
    }

    /// Resolve a tenant by domain.
    #[instrument(skip(self))]
    pub async fn resolve_domain(&self, domain: &str) -> TenantResult<Arc<Tenant>> {
        let domain = normalize_domain(domain);

        if let Some(tenant) = self.cached(&domain).await {
            debug!("Tenant resolution cache hit");
            return Ok(tenant);
        }

        let tenant = match self.repository.find_by_domain(&domain).await? {
            Some(tenant) => tenant,
            None => {
                debug!("No tenant registered for domain");
                return Err(TenantError::NotFound(domain));
            }
        };

        if !tenant.is_active {
            warn!(tenant_id = tenant.id, "Request resolved to an inactive tenant");
            return Err(TenantError::Inactive(domain));
        }

        let tenant = Arc::new(tenant);
        if !self.settings.resolution_ttl.is_zero() {
            let mut cache = self.cache.write().await;
            cache.insert(
                domain,
                CachedResolution {
                    tenant: tenant.clone(),
                    expires_at: Instant::now() + self.settings.resolution_ttl,
                },
            );
        }

        Ok(tenant)
    }

    /// Raw configuration with parent inheritance applied.
    ///
    /// The chain is merged root-first so a tenant's own keys override its
    /// ancestors'. Missing parents and cycles end the walk with a warning.
    pub async fn inherited_config(&self, tenant: &Tenant) -> TenantResult<EffectiveConfig> {
        let mut chain = vec![tenant.raw_config()];
        let mut visited = HashSet::from([tenant.id]);
        let mut next = tenant.parent_id;

        while let Some(parent_id) = next {
            if chain.len() > self.settings.max_parent_depth {
                warn!(tenant_id = tenant.id, "Parent chain exceeds maximum depth");
                break;
            }
            if !visited.insert(parent_id) {
                warn!(tenant_id = tenant.id, parent_id, "Cycle in tenant parent chain");
                break;
            }

            match self.repository.find_by_id(parent_id).await? {
                Some(parent) => {
                    next = parent.parent_id;
                    chain.push(parent.raw_config());
                }
                None => {
                    warn!(tenant_id = tenant.id, parent_id, "Parent tenant not found");
                    break;
                }
            }
        }

        let mut config = EffectiveConfig::new();
        for level in chain.iter().rev() {
            config.merge(level);
        }
        Ok(config)
    }

    /// Drop a cached resolution.
    pub async fn forget(&self, domain: &str) {
        self.cache.write().await.remove(&normalize_domain(domain));
    }

    /// Drop every cached resolution.
    pub async fn flush(&self) {
        self.cache.write().await.clear();
    }

    async fn cached(&self, domain: &str) -> Option<Arc<Tenant>> {
        let cache = self.cache.read().await;
        cache
            .get(domain)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.tenant.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::Visibility;
    use serde_json::json;

    async fn repository() -> Arc<MemoryTenantRepository> {
        let repo = Arc::new(MemoryTenantRepository::new());

        let mut root = EffectiveConfig::new();
        root.set_with_visibility("app_name", json!("Relay"), Visibility::Public)
            .set_with_visibility("app_locale", json!("en"), Visibility::Public)
            .set("db_host", json!("db.internal"));
        repo.insert(Tenant::new(1, "Relay", "relay.app").with_config(root))
            .await
            .unwrap();

        let mut child = EffectiveConfig::new();
        child.set_with_visibility("app_name", json!("Acme"), Visibility::Public);
        repo.insert(
            Tenant::new(2, "Acme", "acme.app")
                .with_parent(1)
                .with_config(child),
        )
        .await
        .unwrap();

        repo
    }

    #[tokio::test]
    async fn test_resolve_by_host() {
        let resolver = TenantResolver::new(repository().await, ResolverSettings::default());
        let tenant = resolver
            .resolve_tenant(&RequestInfo::new("ACME.app:443"))
            .await
            .unwrap();
        assert_eq!(tenant.id, 2);
    }

    #[tokio::test]
    async fn test_header_overrides_host() {
        let resolver = TenantResolver::new(repository().await, ResolverSettings::default());
        let request = RequestInfo::new("edge.internal").with_tenant_domain("relay.app");
        let ctx = resolver.resolve_context(&request).await.unwrap();
        assert_eq!(ctx.tenant_id(), Some(1));
    }

    #[tokio::test]
    async fn test_not_found_and_missing_host() {
        let resolver = TenantResolver::new(repository().await, ResolverSettings::default());

        let err = resolver
            .resolve_tenant(&RequestInfo::new("unknown.app"))
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::NotFound(ref d) if d == "unknown.app"));

        let err = resolver
            .resolve_tenant(&RequestInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::MissingHost));
    }

    #[tokio::test]
    async fn test_inactive_tenant_rejected() {
        let repo = repository().await;
        let mut tenant = Tenant::new(3, "Gone", "gone.app");
        tenant.is_active = false;
        repo.insert(tenant).await.unwrap();

        let resolver = TenantResolver::new(repo, ResolverSettings::default());
        let err = resolver.resolve_domain("gone.app").await.unwrap_err();
        assert!(matches!(err, TenantError::Inactive(_)));
    }

    #[tokio::test]
    async fn test_resolution_cache_and_forget() {
        let repo = repository().await;
        let resolver = TenantResolver::new(repo.clone(), ResolverSettings::default());

        assert_eq!(resolver.resolve_domain("acme.app").await.unwrap().name, "Acme");

        let renamed = Tenant::new(2, "Acme Renamed", "acme.app").with_parent(1);
        repo.insert(renamed).await.unwrap();
        assert_eq!(resolver.resolve_domain("acme.app").await.unwrap().name, "Acme");

        resolver.forget("acme.app").await;
        assert_eq!(
            resolver.resolve_domain("acme.app").await.unwrap().name,
            "Acme Renamed"
        );
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let repo = repository().await;
        let settings = ResolverSettings {
            resolution_ttl: Duration::ZERO,
            ..Default::default()
        };
        let resolver = TenantResolver::new(repo.clone(), settings);

        resolver.resolve_domain("acme.app").await.unwrap();
        repo.remove(2).await;
        assert!(resolver.resolve_domain("acme.app").await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_domain_rejected() {
        let repo = repository().await;
        let err = repo
            .insert(Tenant::new(5, "Impostor", "acme.app"))
            .await
            .unwrap_err();
        assert!(matches!(err, TenantError::DuplicateDomain(_)));
    }

    #[tokio::test]
    async fn test_inherited_config() {
        let repo = repository().await;
        let resolver = TenantResolver::new(repo, ResolverSettings::default());
        let child = resolver.resolve_domain("acme.app").await.unwrap();

        let config = resolver.inherited_config(&child).await.unwrap();
        assert_eq!(config.get_str("app_name"), Some("Acme"));
        assert_eq!(config.get_str("app_locale"), Some("en"));
        assert_eq!(config.get_str("db_host"), Some("db.internal"));
    }

    #[tokio::test]
    async fn test_inherited_config_survives_cycles() {
        let repo = Arc::new(MemoryTenantRepository::new());
        repo.insert(Tenant::new(1, "A", "a.app").with_parent(2))
            .await
            .unwrap();
        repo.insert(Tenant::new(2, "B", "b.app").with_parent(1))
            .await
            .unwrap();

        let resolver = TenantResolver::new(repo, ResolverSettings::default());
        let a = resolver.resolve_domain("a.app").await.unwrap();
        assert!(resolver.inherited_config(&a).await.is_ok());
    }
}
