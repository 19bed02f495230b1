//! # Platform Sessions
//!
//! This crate provides browser sessions for the Relay platform and the
//! guard that keeps every session bound to a single tenant.
//!
//! ## Overview
//!
//! - **Sessions**: Opaque 40-character tokens with CSRF tokens and data
//! - **Stores**: Async persistence keyed by token digest
//! - **Guard**: Regenerates sessions presented to a different tenant
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use platform_session::{GuardOutcome, MemorySessionStore, Session, SessionTenantGuard};
//! use platform_tenant::Tenant;
//!
//! async fn guard_request() {
//!     let guard = SessionTenantGuard::new(Arc::new(MemorySessionStore::new()));
//!
//!     let mut session = Session::for_tenant(7);
//!     let tenant = Tenant::new(9, "Beta", "beta.app");
//!
//!     let outcome = guard.enforce(&mut session, &tenant).await.unwrap();
//!     assert_eq!(outcome, GuardOutcome::Regenerated { previous: 7 });
//! }
//! ```
//!
//! ## Security
//!
//! - A session replayed against another tenant is destroyed, never reused
//! - The user is logged out and the CSRF token rotated on regeneration
//! - Regenerations are logged as `security_event = true` warnings

pub mod error;
pub mod guard;
pub mod session;
pub mod store;

// Re-export main types for convenience
pub use error::{SessionError, SessionResult};
pub use guard::{GuardOutcome, SessionTenantGuard};
pub use session::{generate_token, Session, TOKEN_LENGTH};
pub use store::{token_digest, MemorySessionStore, SessionStore};
