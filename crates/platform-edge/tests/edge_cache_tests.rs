//! Integration tests for the edge tenant cache.
//!
//! The backend tenant API is simulated with wiremock. Each test drives the
//! cache through one mode and checks which backend calls it makes.

use chrono::{Duration as ChronoDuration, Utc};
use platform_edge::{
    BackendEndpoint, EdgeSettings, EdgeTenantCache, RetryPolicy, CACHE_PATH, PROTECTED_PATH,
    TENANT_ID_HEADER,
};
use platform_tenant::{Visibility, TENANT_DOMAIN_HEADER};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Root tenant `1` owning the shared config.
fn root_tenant() -> Value {
    json!({
        "id": 1,
        "name": "Acme Group",
        "domain": "acme-group.app",
        "parent_id": null,
        "config": {
            "apiUrl": "https://api.acme.app",
            "theme": "dark",
            "__visibility": { "apiUrl": "protected", "theme": "public" }
        },
        "tier": "enterprise"
    })
}

/// Child tenant `2` on `acme.app` with its own (ignored) config.
fn child_tenant() -> Value {
    json!({
        "id": 2,
        "name": "Acme",
        "domain": "acme.app",
        "parent_id": 1,
        "config": {
            "apiUrl": "https://child.invalid",
            "__visibility": { "apiUrl": "public" }
        }
    })
}

/// Standalone tenant `3` leaking a private key.
fn standalone_tenant() -> Value {
    json!({
        "id": 3,
        "name": "Solo",
        "domain": "solo.app",
        "config": {
            "apiUrl": "https://api.solo.app",
            "db_password": "hunter2",
            "__visibility": { "apiUrl": "private", "db_password": "private" }
        }
    })
}

fn settings(server: &MockServer, preload: bool) -> EdgeSettings {
    EdgeSettings {
        backend: BackendEndpoint {
            base_url: server.uri(),
            api_key: Some("edge-key".to_string()),
        },
        timeout_secs: 5,
        preload,
        resolver_ttl_secs: 300,
        cache_ttl_secs: 600,
        cache_enabled: true,
        max_retries: 1,
    }
}

fn cache(settings: EdgeSettings) -> EdgeTenantCache {
    EdgeTenantCache::new(settings).unwrap().with_retry(RetryPolicy::none())
}

async fn mount_domain(server: &MockServer, domain: &str, body: Value, expect: u64) {
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .and(header(TENANT_DOMAIN_HEADER, domain))
        .and(header("Authorization", "Bearer edge-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expect)
        .mount(server)
        .await;
}

async fn mount_id(server: &MockServer, id: &str, body: Value, expect: u64) {
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .and(header(TENANT_ID_HEADER, id))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(expect)
        .mount(server)
        .await;
}

/// Parent `1` whose `apiUrl` carries no visibility marking at all.
fn unmarked_parent() -> Value {
    json!({
        "id": 1,
        "name": "Root",
        "domain": "root.app",
        "config": { "apiUrl": "https://api.acme.app" }
    })
}

/// Child `2` on `acme.app` pointing at the unmarked parent.
fn unmarked_child() -> Value {
    json!({
        "id": 2,
        "name": "Acme",
        "domain": "acme.app",
        "parent_id": 1,
        "config": {}
    })
}

// ============================================================================
// Lazy mode
// ============================================================================

#[tokio::test]
async fn test_lazy_child_resolves_to_parent_config() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme.app", child_tenant(), 1).await;
    mount_id(&server, "1", root_tenant(), 1).await;

    let cache = cache(settings(&server, false));
    let tenant = cache.resolve("acme.app").await.unwrap();

    assert_eq!(tenant.id, 2);
    assert_eq!(tenant.config_owner, 1);
    assert_eq!(tenant.config.get_str("apiUrl"), Some("https://api.acme.app"));

    for key in ["apiUrl", "tenantId", "tenantName"] {
        assert_eq!(tenant.config.visibility(key), Visibility::Public, "{key}");
    }
    assert_eq!(tenant.config.get("tenantId"), Some(&json!(1)));
    assert_eq!(tenant.config.get_str("tenantName"), Some("Acme Group"));
    assert_eq!(tenant.config.tier(), Some("enterprise"));

    let public = tenant.public_config();
    assert_eq!(public["apiUrl"], json!("https://api.acme.app"));
    assert_eq!(public["theme"], json!("dark"));
}

#[tokio::test]
async fn test_lazy_entry_expires_after_ttl() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme-group.app", root_tenant(), 2).await;

    let cache = cache(settings(&server, false));
    let t0 = Utc::now();

    assert!(cache.resolve_at("acme-group.app", t0).await.is_some());
    assert!(cache
        .resolve_at("acme-group.app", t0 + ChronoDuration::seconds(299))
        .await
        .is_some());
    assert!(cache
        .resolve_at("acme-group.app", t0 + ChronoDuration::seconds(301))
        .await
        .is_some());

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
    assert_eq!(stats.fetches, 2);
}

#[tokio::test]
async fn test_lazy_normalizes_domain() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme-group.app", root_tenant(), 1).await;

    let cache = cache(settings(&server, false));
    assert!(cache.resolve("ACME-GROUP.app:443").await.is_some());
    assert!(cache.resolve("acme-group.app").await.is_some());
}

#[tokio::test]
async fn test_unknown_domain_is_none_and_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let cache = cache(settings(&server, false));
    assert!(cache.resolve("nobody.app").await.is_none());
    assert!(cache.resolve("nobody.app").await.is_none());
    assert_eq!(cache.stats().await.fetch_failures, 0);
}

#[tokio::test]
async fn test_backend_failure_fails_closed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let cache = cache(settings(&server, false));
    assert!(cache.resolve("acme.app").await.is_none());
    assert_eq!(cache.stats().await.fetch_failures, 1);
}

#[tokio::test]
async fn test_lazy_unmarked_parent_api_url_is_public() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme.app", unmarked_child(), 1).await;
    mount_id(&server, "1", unmarked_parent(), 1).await;

    let cache = cache(settings(&server, false));
    let tenant = cache.resolve("acme.app").await.unwrap();

    assert_eq!(tenant.config.get_str("apiUrl"), Some("https://api.acme.app"));
    assert_eq!(tenant.config.visibility("apiUrl"), Visibility::Public);
    assert_eq!(
        tenant.public_config().get("apiUrl"),
        Some(&json!("https://api.acme.app"))
    );
    assert_eq!(tenant.public_config().get("tenantId"), Some(&json!(1)));
    assert_eq!(tenant.public_config().get("tenantName"), Some(&json!("Root")));
}

#[tokio::test]
async fn test_missing_parent_fails_closed() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme.app", child_tenant(), 1).await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .and(header(TENANT_ID_HEADER, "1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let cache = cache(settings(&server, false));
    assert!(cache.resolve("acme.app").await.is_none());
}

#[tokio::test]
async fn test_private_keys_dropped_on_ingest() {
    let server = MockServer::start().await;
    mount_domain(&server, "solo.app", standalone_tenant(), 1).await;

    let cache = cache(settings(&server, false));
    let tenant = cache.resolve("solo.app").await.unwrap();

    assert!(!tenant.config.has("db_password"));
    assert!(!tenant.public_config().contains_key("db_password"));
    // identity keys are published even when the backend marks them private
    assert_eq!(tenant.config.get_str("apiUrl"), Some("https://api.solo.app"));
    assert_eq!(tenant.config.visibility("apiUrl"), Visibility::Public);
    assert_eq!(tenant.config.get_str("tenantName"), Some("Solo"));
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme-group.app", root_tenant(), 2).await;

    let cache = cache(settings(&server, false));
    cache.resolve("acme-group.app").await.unwrap();
    assert!(cache.invalidate("acme-group.app").await);
    cache.resolve("acme-group.app").await.unwrap();
}

#[tokio::test]
async fn test_cache_disabled_fetches_every_time() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme-group.app", root_tenant(), 3).await;

    let mut settings = settings(&server, false);
    settings.cache_enabled = false;
    let cache = cache(settings);

    for _ in 0..3 {
        assert!(cache.resolve("acme-group.app").await.is_some());
    }
    assert_eq!(cache.stats().await.entries, 0);
}

// ============================================================================
// Preload mode
// ============================================================================

async fn mount_bulk(server: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path(CACHE_PATH))
        .and(header("Authorization", "Bearer edge-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_preload_child_resolves_to_parent_config() {
    let server = MockServer::start().await;
    mount_bulk(&server, json!([root_tenant(), child_tenant(), standalone_tenant()])).await;

    let cache = cache(settings(&server, true));
    assert_eq!(cache.refresh().await.unwrap(), 3);

    let tenant = cache.resolve("acme.app").await.unwrap();
    assert_eq!(tenant.config_owner, 1);
    assert_eq!(tenant.config.get_str("apiUrl"), Some("https://api.acme.app"));
    assert_eq!(tenant.config.visibility("apiUrl"), Visibility::Public);
    assert_eq!(tenant.config.visibility("tenantId"), Visibility::Public);
    assert_eq!(tenant.config.visibility("tenantName"), Visibility::Public);
}

#[tokio::test]
async fn test_preload_unmarked_parent_api_url_is_public() {
    let server = MockServer::start().await;
    mount_bulk(&server, json!([unmarked_parent(), unmarked_child()])).await;

    let cache = cache(settings(&server, true));
    assert_eq!(cache.refresh().await.unwrap(), 2);

    let tenant = cache.resolve("acme.app").await.unwrap();
    assert_eq!(tenant.config_owner, 1);
    assert_eq!(tenant.config.visibility("apiUrl"), Visibility::Public);
    assert_eq!(
        tenant.public_config().get("apiUrl"),
        Some(&json!("https://api.acme.app"))
    );
}

#[tokio::test]
async fn test_preload_reads_are_in_memory() {
    let server = MockServer::start().await;
    mount_bulk(&server, json!({ "tenants": [root_tenant(), child_tenant()] })).await;
    Mock::given(method("GET"))
        .and(path(PROTECTED_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(root_tenant()))
        .expect(0)
        .mount(&server)
        .await;

    let cache = cache(settings(&server, true));
    cache.refresh().await.unwrap();

    assert!(cache.resolve("acme.app").await.is_some());
    assert!(cache.resolve("acme-group.app").await.is_some());
    assert!(cache.resolve("unknown.app").await.is_none());

    let stats = cache.stats().await;
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.fetches, 0);
    assert_eq!(stats.preloads, 1);
}

#[tokio::test]
async fn test_preload_falls_back_before_first_load() {
    let server = MockServer::start().await;
    mount_domain(&server, "acme.app", child_tenant(), 1).await;
    mount_id(&server, "1", root_tenant(), 1).await;

    let cache = cache(settings(&server, true));
    assert!(!cache.is_preloaded().await);

    let tenant = cache.resolve("acme.app").await.unwrap();
    assert_eq!(tenant.config_owner, 1);
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CACHE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([root_tenant()])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CACHE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let cache = cache(settings(&server, true));
    cache.refresh().await.unwrap();
    assert!(cache.refresh().await.is_err());

    assert!(cache.resolve("acme-group.app").await.is_some());
    let stats = cache.stats().await;
    assert_eq!(stats.preloads, 1);
    assert_eq!(stats.fetch_failures, 1);
}

#[tokio::test]
async fn test_bulk_fetch_retries_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(CACHE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(CACHE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([root_tenant()])))
        .mount(&server)
        .await;

    let cache = EdgeTenantCache::new(settings(&server, true))
        .unwrap()
        .with_retry(RetryPolicy {
            max_attempts: 2,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            exponential_base: 2.0,
        });

    assert_eq!(cache.refresh().await.unwrap(), 1);
}

#[tokio::test]
async fn test_spawned_refresh_loads_immediately() {
    let server = MockServer::start().await;
    mount_bulk(&server, json!([root_tenant()])).await;

    let cache = std::sync::Arc::new(cache(settings(&server, true)));
    let handle = platform_edge::spawn_preload_refresh(cache.clone());

    for _ in 0..50 {
        if cache.is_preloaded().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cache.is_preloaded().await);

    drop(handle);
    cache.clear().await;
    assert!(!cache.is_preloaded().await);
}
