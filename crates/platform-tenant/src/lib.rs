//! # Platform Tenancy
//!
//! This crate provides tenant records, effective configuration and tenant
//! resolution for the Relay platform backend and its rendering edge.
//!
//! ## Overview
//!
//! The platform-tenant crate handles:
//! - **Tenants**: Organizations selected by the domain a request arrives on
//! - **Effective config**: Dot-addressable values with per-key visibility
//! - **Visibility**: Public / protected / private trust boundaries
//! - **Context**: The request-scoped active tenant, with a bypass flag
//! - **Resolution**: Host → tenant lookup with a short-lived cache
//! - **Wire payloads**: The shape served to the rendering edge
//!
//! ## Architecture
//!
//! ```text
//! RequestInfo
//!   └─ TenantResolver ─→ TenantRepository
//!         └─ Tenant
//!              ├─ EffectiveConfig (values + visibility + tier)
//!              └─ parent_id ─→ Tenant (inheritance)
//!   └─ TenantContext (active tenant | bypass)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use platform_tenant::{MemoryTenantRepository, RequestInfo, ResolverSettings, Tenant, TenantResolver};
//!
//! async fn resolve() {
//!     let repo = Arc::new(MemoryTenantRepository::new());
//!     repo.insert(Tenant::new(1, "Acme Corp", "acme.app")).await.unwrap();
//!
//!     let resolver = TenantResolver::new(repo, ResolverSettings::default());
//!     let ctx = resolver
//!         .resolve_context(&RequestInfo::new("acme.app"))
//!         .await
//!         .unwrap();
//!     assert_eq!(ctx.tenant_id(), Some(1));
//! }
//! ```
//!
//! ## Visibility Guarantees
//!
//! - Keys without explicit visibility are private
//! - Unknown visibility tokens from the wire load as private
//! - `protected_config()` never returns a private key

pub mod case;
pub mod config;
pub mod context;
pub mod error;
pub mod resolver;
pub mod tenant;
pub mod visibility;
pub mod wire;

// Re-export main types for convenience
pub use config::{EffectiveConfig, StoredConfig, VISIBILITY_KEY};
pub use context::TenantContext;
pub use error::{TenantError, TenantResult};
pub use resolver::{
    MemoryTenantRepository, RequestInfo, ResolverSettings, TenantRepository, TenantResolver,
    TENANT_DOMAIN_HEADER,
};
pub use tenant::{Tenant, TenantId, TenantScoped};
pub use visibility::{Exposure, Visibility};
pub use wire::TenantPayload;
