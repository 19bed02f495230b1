//! # Platform Config Pipeline
//!
//! This crate turns a tenant's raw configuration into its effective
//! configuration and rebinds the worker's runtime resources for the
//! duration of one request.
//!
//! ## Overview
//!
//! - **Contributors**: One object per concern (app, database, cache,
//!   session, cache manager), each with `apply` and `reset`
//! - **Pipeline**: An explicit, priority-ordered registry built at startup
//! - **Runtime**: The bindings a worker reconfigures, with process defaults
//! - **Scope**: A guard that resets every binding exactly once
//!
//! ## Usage
//!
//! ```rust
//! use platform_pipeline::{ConfigPipeline, Runtime};
//! use platform_tenant::{EffectiveConfig, Tenant};
//! use serde_json::json;
//!
//! let pipeline = ConfigPipeline::standard();
//! let mut runtime = Runtime::default();
//!
//! let tenant = Tenant::new(1, "Acme Corp", "acme.app").with_public_id("tnt_abc");
//! let mut raw = EffectiveConfig::new();
//! raw.set("cache_store", json!("redis"));
//!
//! {
//!     let scope = pipeline.apply(&tenant, &raw, &mut runtime);
//!     assert_eq!(scope.runtime().session.get().xsrf_cookie, "XSRF-TOKEN-tnt_abc");
//!     assert_eq!(scope.runtime().cache.get().prefix, "tenant_tnt_abc_");
//!     scope.revert_all();
//! }
//!
//! assert!(runtime.is_neutral());
//! ```
//!
//! ## Failure Policy
//!
//! Missing required keys skip a contributor. Invalid values are logged and
//! the contributor falls back to process defaults. Neither aborts the
//! request.

pub mod contributor;
pub mod contributors;
pub mod error;
pub mod pipeline;
pub mod runtime;

// Re-export main types for convenience
pub use contributor::{Applied, ConfigContributor};
pub use contributors::{
    xsrf_cookie_name, AppContributor, CacheContributor, CacheManagerContributor,
    DatabaseContributor, SessionContributor, XSRF_COOKIE,
};
pub use error::{ContributorError, ContributorResult};
pub use pipeline::{ConfigPipeline, PipelineBuilder, PipelineReport, TenantScope};
pub use runtime::{
    AppSettings, Binding, CacheManager, CacheRepository, CacheSettings, DatabaseConnection,
    Runtime, RuntimeDefaults, SessionSettings,
};
