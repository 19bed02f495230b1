//! Session storage
//!
//! Sessions are keyed by a SHA-256 digest of the token so raw tokens are
//! never retained as lookup keys.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::SessionResult;
use crate::session::Session;

/// Storage key for a session token.
pub fn token_digest(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, hash)
}

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the session for a token.
    async fn load(&self, token: &str) -> SessionResult<Option<Session>>;

    /// Insert or replace a session under its current token.
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// Remove the session for a token. Returns whether one existed.
    async fn destroy(&self, token: &str) -> SessionResult<bool>;
}

/// In-process session store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> SessionResult<Option<Session>> {
        Ok(self.sessions.read().await.get(&token_digest(token)).cloned())
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        self.sessions
            .write()
            .await
            .insert(token_digest(&session.token), session.clone());
        Ok(())
    }

    async fn destroy(&self, token: &str) -> SessionResult<bool> {
        Ok(self
            .sessions
            .write()
            .await
            .remove(&token_digest(token))
            .is_some())
    }
}
