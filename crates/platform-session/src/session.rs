//! Session records
//!
//! A session carries an opaque token, the tenant it was issued under, the
//! authenticated user (if any), a CSRF token and free-form data.

use chrono::{DateTime, Duration, Utc};
use platform_tenant::TenantId;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Length of session and CSRF tokens.
pub const TOKEN_LENGTH: usize = 40;

/// Generate a random alphanumeric token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// A browser session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    /// Opaque session token sent as the session cookie
    pub token: String,

    /// Tenant the session is bound to
    pub tenant_id: Option<TenantId>,

    /// Authenticated user
    pub user_id: Option<Uuid>,

    /// CSRF token for state-changing requests
    pub csrf_token: String,

    /// Session data
    #[serde(default)]
    pub data: HashMap<String, Value>,

    /// When the session was started
    pub created_at: DateTime<Utc>,

    /// Last request seen on this session
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Start a new anonymous, unbound session.
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            token: generate_token(),
            tenant_id: None,
            user_id: None,
            csrf_token: generate_token(),
            data: HashMap::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Start a session already bound to a tenant.
    pub fn for_tenant(tenant_id: TenantId) -> Self {
        let mut session = Self::start();
        session.tenant_id = Some(tenant_id);
        session
    }

    /// Bind the session to a tenant.
    pub fn bind_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = Some(tenant_id);
    }

    /// Mark a user as authenticated on this session.
    pub fn login(&mut self, user_id: Uuid) {
        self.user_id = Some(user_id);
    }

    /// Forget the authenticated user.
    pub fn logout(&mut self) {
        self.user_id = None;
    }

    /// Check if a user is authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Store a value.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    /// Read a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Remove a value.
    pub fn forget(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Remove all data.
    pub fn flush(&mut self) {
        self.data.clear();
    }

    /// Issue a new session token, returning the old one.
    pub fn regenerate(&mut self) -> String {
        std::mem::replace(&mut self.token, generate_token())
    }

    /// Issue a new CSRF token.
    pub fn regenerate_csrf(&mut self) {
        self.csrf_token = generate_token();
    }

    /// Check a presented CSRF token.
    pub fn verify_csrf(&self, presented: &str) -> bool {
        !presented.is_empty() && presented == self.csrf_token
    }

    /// Record activity.
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Check if the session has been idle longer than `lifetime` at `now`.
    pub fn is_expired_at(&self, lifetime: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > lifetime
    }
}
