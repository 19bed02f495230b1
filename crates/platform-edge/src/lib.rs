//! # Platform Edge
//!
//! Tenant resolution for the server-side rendering edge of the Relay
//! platform. The edge never talks to the tenant database; it asks the
//! backend's tenant API and caches the answer.
//!
//! ## Overview
//!
//! - **Client**: `GET /api/tenant/protected` by domain or id, and
//!   `GET /api/tenant/cache` for the full tenant set
//! - **Cache**: lazy per-domain TTL entries, or a preloaded snapshot
//!   refreshed on an interval
//! - **Inheritance**: a child tenant is always served its parent's config
//! - **Visibility**: only protected config is ingested; identity keys are
//!   always public
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use platform_edge::{spawn_preload_refresh, EdgeTenantCache};
//!
//! async fn render(host: &str) {
//!     let cache = Arc::new(EdgeTenantCache::from_env().unwrap());
//!     let _refresh = cache
//!         .settings()
//!         .preload
//!         .then(|| spawn_preload_refresh(cache.clone()));
//!
//!     match cache.resolve(host).await {
//!         Some(tenant) => println!("{:?}", tenant.public_config()),
//!         None => println!("no tenant, failing closed"),
//!     }
//! }
//! ```
//!
//! ## Environment
//!
//! | Variable | Default |
//! |---|---|
//! | `TENANT_API_URL` | `http://localhost:8000` |
//! | `TENANT_API_KEY` | unset |
//! | `TENANT_API_TIMEOUT_SECS` | `10` |
//! | `TENANT_PRELOAD` | `off` |
//! | `TENANT_RESOLVER_TTL` | `300` |
//! | `TENANT_CACHE_TTL` | `600` |
//! | `TENANT_CACHE_ENABLED` | `on` |
//! | `TENANT_API_RETRIES` | `3` |

pub mod cache;
pub mod client;
pub mod error;
pub mod retry;
pub mod settings;

// Re-export main types for convenience
pub use cache::{
    spawn_preload_refresh, CacheStats, CachedDomainEntry, EdgeTenantCache, PreloadSnapshot,
    RefreshHandle, ResolvedTenant, IDENTITY_KEYS,
};
pub use client::{BackendClient, CACHE_PATH, PROTECTED_PATH, TENANT_ID_HEADER};
pub use error::{EdgeError, EdgeResult};
pub use retry::RetryPolicy;
pub use settings::{BackendEndpoint, CacheMode, EdgeSettings};
