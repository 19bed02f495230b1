//! Edge tenant cache.
//!
//! Resolves the tenant for a rendering request by domain and returns the
//! configuration the render may use. Two modes:
//!
//! - **Lazy**: fetch per domain on a miss and keep the result for the
//!   resolver TTL. Expiry is checked on read.
//! - **Preload**: load every tenant up front and on a fixed interval, then
//!   answer from memory. Until the first load completes, lookups fall back
//!   to direct fetches.
//!
//! In both modes a tenant with a parent is served the parent's config, and
//! the identity keys (`apiUrl`, `tenantId`, `tenantName`) are always public.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform_tenant::case::key_variants;
use platform_tenant::tenant::normalize_domain;
use platform_tenant::{EffectiveConfig, Exposure, TenantId, TenantPayload, Visibility};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::client::BackendClient;
use crate::error::EdgeResult;
use crate::retry::RetryPolicy;
use crate::settings::{CacheMode, EdgeSettings};

/// Keys always published to the browser.
pub const IDENTITY_KEYS: [&str; 3] = ["apiUrl", "tenantId", "tenantName"];

/// A tenant as seen by a render.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTenant {
    /// Id of the tenant the domain belongs to
    pub id: TenantId,

    /// Display name of that tenant
    pub name: String,

    /// Domain it was resolved from
    pub domain: String,

    /// Parent tenant, if any
    pub parent_id: Option<TenantId>,

    /// Tenant whose config is served (the parent when there is one)
    pub config_owner: TenantId,

    /// Protected view of the owner's config, identity keys public
    pub config: EffectiveConfig,
}

impl ResolvedTenant {
    /// Build the render view of `tenant` using `owner`'s config.
    ///
    /// Identity keys are taken from the owner's raw config whatever their
    /// marking. Everything else passes through the protected view, so a
    /// private key leaked by the backend is dropped here.
    pub fn from_payloads(tenant: &TenantPayload, owner: &TenantPayload) -> Self {
        let raw = owner.effective_config();
        let identity = identity_values(&raw);

        let mut config = raw.exposed(Exposure::Protected);
        for (key, value) in identity {
            config.set(key, value);
        }

        if config.matching_key("tenantId").is_none() {
            config.set("tenantId", json!(owner.id));
        }
        if config.matching_key("tenantName").is_none() {
            config.set("tenantName", Value::String(owner.name.clone()));
        }
        publish_identity_keys(&mut config);

        Self {
            id: tenant.id,
            name: tenant.name.clone(),
            domain: tenant.domain.clone(),
            parent_id: tenant.parent_id,
            config_owner: owner.id,
            config,
        }
    }

    /// Check if the served config is inherited from a parent.
    pub fn is_inherited(&self) -> bool {
        self.config_owner != self.id
    }

    /// Keys the browser may see.
    pub fn public_config(&self) -> serde_json::Map<String, Value> {
        self.config.public_config()
    }

    /// Keys the render may use server side.
    pub fn protected_config(&self) -> serde_json::Map<String, Value> {
        self.config.protected_config()
    }
}

/// Every stored spelling of the identity keys with its value.
fn identity_values(config: &EffectiveConfig) -> Vec<(String, Value)> {
    IDENTITY_KEYS
        .iter()
        .flat_map(|key| key_variants(key))
        .filter_map(|variant| {
            let value = config.values().get(&variant)?.clone();
            Some((variant, value))
        })
        .collect()
}

/// Force every stored spelling of the identity keys to public.
fn publish_identity_keys(config: &mut EffectiveConfig) {
    for key in IDENTITY_KEYS {
        for variant in key_variants(key) {
            if config.get(&variant).is_some() {
                config.set_visibility(variant, Visibility::Public);
            }
        }
    }
}

/// A lazy-mode entry.
#[derive(Debug, Clone)]
pub struct CachedDomainEntry {
    /// Resolved tenant
    pub tenant: Arc<ResolvedTenant>,

    /// When the entry stops being served
    pub expires_at: DateTime<Utc>,
}

impl CachedDomainEntry {
    /// Check if the entry is live at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// One complete preload of the tenant set.
///
/// Built off to the side and swapped in whole, so readers see either the
/// previous snapshot or the new one.
#[derive(Debug, Default)]
pub struct PreloadSnapshot {
    /// Render views by domain
    pub by_domain: HashMap<String, Arc<ResolvedTenant>>,

    /// Raw payloads by id, used for parent lookups
    pub by_id: HashMap<TenantId, TenantPayload>,

    /// When the snapshot was loaded
    pub loaded_at: DateTime<Utc>,
}

impl PreloadSnapshot {
    /// Build a snapshot from the bulk export.
    ///
    /// Tenants whose parent is missing from the export are left out.
    pub fn build(tenants: Vec<TenantPayload>, loaded_at: DateTime<Utc>) -> Self {
        let by_id: HashMap<TenantId, TenantPayload> =
            tenants.into_iter().map(|t| (t.id, t)).collect();

        let mut by_domain = HashMap::with_capacity(by_id.len());
        for tenant in by_id.values() {
            let owner = match tenant.parent_id {
                Some(parent_id) => match by_id.get(&parent_id) {
                    Some(parent) => parent,
                    None => {
                        warn!(
                            tenant_id = tenant.id,
                            parent_id, "Parent missing from preload, skipping tenant"
                        );
                        continue;
                    }
                },
                None => tenant,
            };
            by_domain.insert(
                normalize_domain(&tenant.domain),
                Arc::new(ResolvedTenant::from_payloads(tenant, owner)),
            );
        }

        Self {
            by_domain,
            by_id,
            loaded_at,
        }
    }

    /// Number of resolvable domains.
    pub fn len(&self) -> usize {
        self.by_domain.len()
    }

    /// Check if the snapshot has no tenants.
    pub fn is_empty(&self) -> bool {
        self.by_domain.is_empty()
    }
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from memory
    pub hits: u64,
    /// Lookups that needed the backend or found nothing
    pub misses: u64,
    /// Single-tenant backend fetches
    pub fetches: u64,
    /// Backend calls that failed
    pub fetch_failures: u64,
    /// Completed preloads
    pub preloads: u64,
    /// Lazy entries held, live or expired
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    fetch_failures: AtomicU64,
    preloads: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// The edge tenant cache.
#[derive(Debug)]
pub struct EdgeTenantCache {
    client: BackendClient,
    settings: EdgeSettings,
    retry: RetryPolicy,
    entries: RwLock<HashMap<String, CachedDomainEntry>>,
    snapshot: RwLock<Option<Arc<PreloadSnapshot>>>,
    counters: Counters,
}

impl EdgeTenantCache {
    /// Create a cache from settings.
    pub fn new(settings: EdgeSettings) -> EdgeResult<Self> {
        settings.validate()?;
        let client = BackendClient::new(settings.backend.clone(), settings.timeout())?;
        Ok(Self::with_client(client, settings))
    }

    /// Create a cache from environment settings.
    pub fn from_env() -> EdgeResult<Self> {
        Self::new(EdgeSettings::from_env())
    }

    /// Create a cache around an existing client.
    pub fn with_client(client: BackendClient, settings: EdgeSettings) -> Self {
        Self {
            client,
            retry: settings.retry_policy(),
            settings,
            entries: RwLock::new(HashMap::new()),
            snapshot: RwLock::new(None),
            counters: Counters::default(),
        }
    }

    /// Replace the retry policy for the bulk fetch.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The cache settings.
    pub fn settings(&self) -> &EdgeSettings {
        &self.settings
    }

    /// Resolve the tenant for `domain` now.
    pub async fn resolve(&self, domain: &str) -> Option<Arc<ResolvedTenant>> {
        self.resolve_at(domain, Utc::now()).await
    }

    /// Resolve the tenant for `domain` as of `now`.
    ///
    /// `None` means no tenant: unknown domain or unreachable backend.
    #[instrument(skip(self, now))]
    pub async fn resolve_at(
        &self,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Option<Arc<ResolvedTenant>> {
        let domain = normalize_domain(domain);
        if domain.is_empty() {
            return None;
        }

        if !self.settings.cache_enabled {
            Counters::bump(&self.counters.misses);
            return self.fetch_resolved(&domain).await.map(Arc::new);
        }

        match self.settings.mode() {
            CacheMode::Lazy => self.resolve_lazy(&domain, now).await,
            CacheMode::Preload => self.resolve_preloaded(&domain).await,
        }
    }

    async fn resolve_lazy(&self, domain: &str, now: DateTime<Utc>) -> Option<Arc<ResolvedTenant>> {
        if let Some(entry) = self.entries.read().await.get(domain) {
            if entry.is_live(now) {
                Counters::bump(&self.counters.hits);
                return Some(Arc::clone(&entry.tenant));
            }
        }

        Counters::bump(&self.counters.misses);
        let tenant = Arc::new(self.fetch_resolved(domain).await?);

        self.entries.write().await.insert(
            domain.to_string(),
            CachedDomainEntry {
                tenant: Arc::clone(&tenant),
                expires_at: now + self.settings.resolver_ttl(),
            },
        );
        Some(tenant)
    }

    async fn resolve_preloaded(&self, domain: &str) -> Option<Arc<ResolvedTenant>> {
        let snapshot = self.snapshot.read().await.clone();

        match snapshot {
            Some(snapshot) => match snapshot.by_domain.get(domain) {
                Some(tenant) => {
                    Counters::bump(&self.counters.hits);
                    Some(Arc::clone(tenant))
                }
                None => {
                    Counters::bump(&self.counters.misses);
                    None
                }
            },
            None => {
                debug!("No preload yet, fetching directly");
                Counters::bump(&self.counters.misses);
                self.fetch_resolved(domain).await.map(Arc::new)
            }
        }
    }

    /// Fetch a domain and, when it has a parent, the parent.
    async fn fetch_resolved(&self, domain: &str) -> Option<ResolvedTenant> {
        let tenant = self.fetch(self.client.fetch_by_domain(domain)).await??;

        match tenant.parent_id {
            Some(parent_id) => {
                let Some(parent) = self.fetch(self.client.fetch_by_id(parent_id)).await? else {
                    warn!(
                        tenant_id = tenant.id,
                        parent_id, "Parent tenant not found, refusing to serve child config"
                    );
                    return None;
                };
                Some(ResolvedTenant::from_payloads(&tenant, &parent))
            }
            None => Some(ResolvedTenant::from_payloads(&tenant, &tenant)),
        }
    }

    /// Run one single-tenant fetch, counting it. Failures become `None`.
    async fn fetch<F>(&self, call: F) -> Option<Option<TenantPayload>>
    where
        F: std::future::Future<Output = EdgeResult<Option<TenantPayload>>>,
    {
        Counters::bump(&self.counters.fetches);
        match call.await {
            Ok(found) => Some(found),
            Err(e) => {
                Counters::bump(&self.counters.fetch_failures);
                warn!(error = %e, "Tenant fetch failed");
                None
            }
        }
    }

    /// Load the full tenant set and swap it in.
    ///
    /// On failure the previous snapshot stays in place.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> EdgeResult<usize> {
        let tenants = match self.retry.run(|| self.client.fetch_all()).await {
            Ok(tenants) => tenants,
            Err(e) => {
                Counters::bump(&self.counters.fetch_failures);
                warn!(error = %e, "Preload failed, keeping previous snapshot");
                return Err(e);
            }
        };

        let snapshot = Arc::new(PreloadSnapshot::build(tenants, Utc::now()));
        let count = snapshot.len();
        *self.snapshot.write().await = Some(snapshot);
        Counters::bump(&self.counters.preloads);

        info!(tenants = count, "Tenant preload complete");
        Ok(count)
    }

    /// Check if a preload has completed.
    pub async fn is_preloaded(&self) -> bool {
        self.snapshot.read().await.is_some()
    }

    /// The current preload snapshot.
    pub async fn snapshot(&self) -> Option<Arc<PreloadSnapshot>> {
        self.snapshot.read().await.clone()
    }

    /// Drop the lazy entry for a domain.
    pub async fn invalidate(&self, domain: &str) -> bool {
        self.entries
            .write()
            .await
            .remove(&normalize_domain(domain))
            .is_some()
    }

    /// Drop every lazy entry and the preload snapshot.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
        *self.snapshot.write().await = None;
    }

    /// Current counters.
    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            fetches: self.counters.fetches.load(Ordering::Relaxed),
            fetch_failures: self.counters.fetch_failures.load(Ordering::Relaxed),
            preloads: self.counters.preloads.load(Ordering::Relaxed),
            entries: self.entries.read().await.len(),
        }
    }
}

/// Background preload refresh. Aborts the task when dropped.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop refreshing.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Check if the refresh task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Preload now and then every `cache_ttl` seconds.
///
/// Must be called from within a tokio runtime.
pub fn spawn_preload_refresh(cache: Arc<EdgeTenantCache>) -> RefreshHandle {
    let period = cache.settings().refresh_interval();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            // failures are logged inside refresh and retried next tick
            let _ = cache.refresh().await;
        }
    });

    RefreshHandle { handle }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: serde_json::Value) -> TenantPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_child_gets_parent_config() {
        let parent = payload(json!({
            "id": 1, "name": "Root", "domain": "root.app",
            "config": {"apiUrl": "https://api.acme.app", "__visibility": {"apiUrl": "protected"}}
        }));
        let child = payload(json!({
            "id": 2, "name": "Acme", "domain": "acme.app", "parent_id": 1,
            "config": {"apiUrl": "https://child.example", "__visibility": {"apiUrl": "public"}}
        }));

        let resolved = ResolvedTenant::from_payloads(&child, &parent);
        assert!(resolved.is_inherited());
        assert_eq!(resolved.config.get_str("apiUrl"), Some("https://api.acme.app"));
        assert_eq!(resolved.config.visibility("apiUrl"), Visibility::Public);
        assert_eq!(resolved.config.get("tenantId"), Some(&json!(1)));
        assert_eq!(resolved.config.get_str("tenantName"), Some("Root"));
        assert_eq!(resolved.config.visibility("tenantName"), Visibility::Public);
    }

    #[test]
    fn test_private_keys_never_ingested() {
        let tenant = payload(json!({
            "id": 1, "name": "Root", "domain": "root.app",
            "config": {"db_password": "hunter2", "__visibility": {"db_password": "private"}}
        }));
        let resolved = ResolvedTenant::from_payloads(&tenant, &tenant);
        assert!(!resolved.config.has("db_password"));
    }

    #[test]
    fn test_unmarked_identity_keys_published() {
        let parent = payload(json!({
            "id": 1, "name": "Root", "domain": "root.app",
            "config": {"apiUrl": "https://api.acme.app", "secret": "s"}
        }));
        let child = payload(json!({
            "id": 2, "name": "Acme", "domain": "acme.app", "parent_id": 1
        }));

        let resolved = ResolvedTenant::from_payloads(&child, &parent);
        let public = resolved.public_config();
        assert_eq!(public.get("apiUrl"), Some(&json!("https://api.acme.app")));
        assert!(!resolved.config.has("secret"));
    }

    #[test]
    fn test_snake_case_identity_keys_published() {
        let tenant = payload(json!({
            "id": 1, "name": "Root", "domain": "root.app",
            "config": {
                "api_url": "https://api.root.app",
                "tenant_id": "tnt_root",
                "__visibility": {"api_url": "protected", "tenant_id": "protected"}
            }
        }));
        let resolved = ResolvedTenant::from_payloads(&tenant, &tenant);
        assert_eq!(resolved.config.visibility("api_url"), Visibility::Public);
        assert_eq!(resolved.config.visibility("tenant_id"), Visibility::Public);
        assert!(!resolved.config.has("tenantId"));
    }

    #[test]
    fn test_snapshot_skips_orphans() {
        let tenants = vec![
            payload(json!({"id": 1, "name": "Root", "domain": "root.app"})),
            payload(json!({"id": 2, "name": "Acme", "domain": "Acme.App", "parent_id": 1})),
            payload(json!({"id": 3, "name": "Orphan", "domain": "orphan.app", "parent_id": 99})),
        ];
        let snapshot = PreloadSnapshot::build(tenants, Utc::now());

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.by_domain["acme.app"].config_owner, 1);
        assert!(!snapshot.by_domain.contains_key("orphan.app"));
        assert_eq!(snapshot.by_id.len(), 3);
    }

    #[test]
    fn test_cache_debug_hides_api_key() {
        let mut settings = EdgeSettings::default();
        settings.backend.api_key = Some("edge-secret-key".to_string());
        let cache = EdgeTenantCache::new(settings).unwrap();
        assert!(!format!("{:?}", cache).contains("edge-secret-key"));
    }

    #[test]
    fn test_entry_liveness_boundary() {
        let now = Utc::now();
        let tenant = payload(json!({"id": 1, "name": "Root", "domain": "root.app"}));
        let entry = CachedDomainEntry {
            tenant: Arc::new(ResolvedTenant::from_payloads(&tenant, &tenant)),
            expires_at: now + chrono::Duration::seconds(300),
        };
        assert!(entry.is_live(now + chrono::Duration::seconds(299)));
        assert!(!entry.is_live(now + chrono::Duration::seconds(300)));
    }
}
