//! Effective configuration for a tenant
//!
//! This module provides [`EffectiveConfig`], the value object every
//! configuration contributor reads and writes. It pairs a dot-addressable
//! JSON map with a per-key visibility map and an optional tier tag.
//!
//! # Visibility rules
//!
//! - A key without an explicit visibility inherits from its nearest dotted
//!   prefix (`db` covers `db.host`), and defaults to private.
//! - [`EffectiveConfig::public_config`] and
//!   [`EffectiveConfig::protected_config`] are the only ways a filtered view
//!   leaves this type. Neither can ever include a private key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::case::key_variants;
use crate::visibility::{Exposure, Visibility};

/// Reserved key carrying the visibility map inside a wire `config` object.
pub const VISIBILITY_KEY: &str = "__visibility";

/// A tenant's effective configuration with per-key visibility.
///
/// # Examples
///
/// ```
/// use platform_tenant::{EffectiveConfig, Visibility};
/// use serde_json::json;
///
/// let mut config = EffectiveConfig::new();
/// config
///     .set("app_name", json!("Acme"))
///     .set("db.host", json!("10.0.0.4"))
///     .set_visibility("app_name", Visibility::Public);
///
/// assert_eq!(config.get("db.host"), Some(&json!("10.0.0.4")));
/// assert_eq!(config.visibility("db.host"), Visibility::Private);
/// assert!(config.public_config().contains_key("app_name"));
/// assert!(!config.protected_config().contains_key("db"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "StoredConfig", into = "StoredConfig")]
pub struct EffectiveConfig {
    values: Map<String, Value>,
    visibility: BTreeMap<String, Visibility>,
    tier: Option<String>,
}

impl EffectiveConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from its three parts.
    pub fn from_parts(
        values: Map<String, Value>,
        visibility: BTreeMap<String, Visibility>,
        tier: Option<String>,
    ) -> Self {
        Self {
            values,
            visibility,
            tier,
        }
    }

    /// Splits the configuration into values, visibility and tier.
    pub fn into_parts(self) -> (Map<String, Value>, BTreeMap<String, Visibility>, Option<String>) {
        (self.values, self.visibility, self.tier)
    }

    /// Read a value by key.
    ///
    /// A literal top-level key wins; otherwise the key is treated as a
    /// dotted path into nested objects.
    pub fn get(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }
        if !key.contains('.') {
            return None;
        }

        let mut segments = key.split('.');
        let first = self.values.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| value.as_object()?.get(segment))
    }

    /// Read a value, falling back to `default` when the key is absent.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).cloned().unwrap_or(default)
    }

    /// Read a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Read a value accepting either camelCase or snake_case spelling.
    ///
    /// `lookup("apiUrl")` finds a value stored under `api_url` and vice versa.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        self.matching_key(key).and_then(|matched| self.get(&matched))
    }

    /// String form of [`EffectiveConfig::lookup`]. Empty strings count as absent.
    pub fn lookup_str(&self, key: &str) -> Option<&str> {
        self.lookup(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// The spelling of `key` actually present in this configuration, if any.
    pub fn matching_key(&self, key: &str) -> Option<String> {
        key_variants(key)
            .into_iter()
            .find(|candidate| self.get(candidate).is_some())
    }

    /// Write a value. Dotted keys create nested objects as needed.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        let key = key.into();

        if self.values.contains_key(&key) || !key.contains('.') {
            self.values.insert(key, value);
            return self;
        }

        let mut segments: Vec<&str> = key.split('.').collect();
        let Some(last) = segments.pop() else {
            return self;
        };

        let mut current = &mut self.values;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                return self;
            };
            current = next;
        }
        current.insert(last.to_string(), value);

        self
    }

    /// Write a value together with its visibility.
    pub fn set_with_visibility(
        &mut self,
        key: impl Into<String>,
        value: Value,
        visibility: Visibility,
    ) -> &mut Self {
        let key = key.into();
        self.set(key.clone(), value);
        self.set_visibility(key, visibility)
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a key and its explicit visibility.
    pub fn forget(&mut self, key: &str) -> Option<Value> {
        self.visibility.remove(key);

        if let Some(value) = self.values.remove(key) {
            return Some(value);
        }

        let (parents, last) = key.rsplit_once('.')?;
        let mut current = &mut self.values;
        for segment in parents.split('.') {
            current = current.get_mut(segment)?.as_object_mut()?;
        }
        current.remove(last)
    }

    /// Visibility of a key, private by default.
    ///
    /// A private ancestor hides everything below it. A key nested inside a
    /// real object with no entry of its own takes the nearest ancestor's
    /// visibility; literal top-level keys never inherit.
    pub fn visibility(&self, key: &str) -> Visibility {
        let ancestors: Vec<&str> = key
            .match_indices('.')
            .map(|(index, _)| &key[..index])
            .collect();

        if ancestors
            .iter()
            .any(|head| self.visibility.get(*head) == Some(&Visibility::Private))
        {
            return Visibility::Private;
        }

        if let Some(visibility) = self.visibility.get(key) {
            return *visibility;
        }

        if self.values.contains_key(key) {
            return Visibility::Private;
        }

        ancestors
            .iter()
            .rev()
            .filter(|head| self.get(head).is_some_and(Value::is_object))
            .find_map(|head| self.visibility.get(*head).copied())
            .unwrap_or(Visibility::Private)
    }

    /// Visibility of a key looked up with case translation.
    pub fn lookup_visibility(&self, key: &str) -> Visibility {
        match self.matching_key(key) {
            Some(matched) => self.visibility(&matched),
            None => self.visibility(key),
        }
    }

    /// Set the visibility of a key.
    pub fn set_visibility(&mut self, key: impl Into<String>, visibility: Visibility) -> &mut Self {
        self.visibility.insert(key.into(), visibility);
        self
    }

    /// Set the visibility of a key only when none is recorded yet.
    pub fn default_visibility(&mut self, key: &str, visibility: Visibility) -> &mut Self {
        if !self.visibility.contains_key(key) {
            self.visibility.insert(key.to_string(), visibility);
        }
        self
    }

    /// Explicit visibility entries.
    pub fn visibility_map(&self) -> &BTreeMap<String, Visibility> {
        &self.visibility
    }

    /// Raw values.
    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Top-level keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Check whether no values, visibility entries or tier are present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.visibility.is_empty() && self.tier.is_none()
    }

    /// Subscription tier tag.
    pub fn tier(&self) -> Option<&str> {
        self.tier.as_deref()
    }

    /// Set or clear the tier tag.
    pub fn set_tier(&mut self, tier: Option<String>) -> &mut Self {
        self.tier = tier;
        self
    }

    /// Merge `other` into this configuration.
    ///
    /// Values and visibility from `other` overwrite matching keys (nested
    /// objects merge key by key). The tier is replaced only when `other`
    /// carries one.
    pub fn merge(&mut self, other: &EffectiveConfig) -> &mut Self {
        merge_objects(&mut self.values, &other.values);

        for (key, visibility) in &other.visibility {
            self.visibility.insert(key.clone(), *visibility);
        }

        if other.tier.is_some() {
            self.tier = other.tier.clone();
        }

        self
    }

    /// Non-mutating form of [`EffectiveConfig::merge`].
    pub fn merged(&self, other: &EffectiveConfig) -> EffectiveConfig {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Values whose visibility is `public`.
    pub fn public_config(&self) -> Map<String, Value> {
        self.filter_object(None, &self.values, Exposure::Public)
    }

    /// Values whose visibility is `public` or `protected`.
    ///
    /// Private keys are excluded unconditionally.
    pub fn protected_config(&self) -> Map<String, Value> {
        self.filter_object(None, &self.values, Exposure::Protected)
    }

    /// A copy holding only what may cross the given boundary, visibility
    /// entries included.
    pub fn exposed(&self, exposure: Exposure) -> EffectiveConfig {
        let values = self.filter_object(None, &self.values, exposure);
        let visibility = self
            .visibility
            .iter()
            .filter(|(key, _)| self.visibility(key).is_exposed_to(exposure))
            .map(|(key, visibility)| (key.clone(), *visibility))
            .collect();

        EffectiveConfig {
            values,
            visibility,
            tier: self.tier.clone(),
        }
    }

    /// Render the wire `config` object: values plus an embedded
    /// `__visibility` map.
    pub fn to_wire(&self) -> Map<String, Value> {
        let mut config = self.values.clone();
        let visibility: Map<String, Value> = self
            .visibility
            .iter()
            .map(|(key, visibility)| (key.clone(), Value::String(visibility.as_str().to_string())))
            .collect();
        config.insert(VISIBILITY_KEY.to_string(), Value::Object(visibility));
        config
    }

    /// Parse a wire `config` object. Unknown visibility tokens become private.
    pub fn from_wire(mut config: Map<String, Value>, tier: Option<String>) -> Self {
        let visibility = match config.remove(VISIBILITY_KEY) {
            Some(Value::Object(entries)) => entries
                .into_iter()
                .map(|(key, token)| {
                    let visibility = token
                        .as_str()
                        .map(Visibility::parse_lenient)
                        .unwrap_or(Visibility::Private);
                    (key, visibility)
                })
                .collect(),
            _ => BTreeMap::new(),
        };

        Self {
            values: config,
            visibility,
            tier,
        }
    }

    fn filter_object(
        &self,
        prefix: Option<&str>,
        object: &Map<String, Value>,
        exposure: Exposure,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for (key, value) in object {
            let path = match prefix {
                Some(prefix) => format!("{}.{}", prefix, key),
                None => key.clone(),
            };

            match value {
                Value::Object(children) if !children.is_empty() => {
                    if self.visibility.get(&path) == Some(&Visibility::Private) {
                        continue;
                    }
                    let filtered = self.filter_object(Some(&path), children, exposure);
                    if !filtered.is_empty() {
                        out.insert(key.clone(), Value::Object(filtered));
                    }
                }
                _ => {
                    if self.visibility(&path).is_exposed_to(exposure) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        out
    }
}

fn merge_objects(target: &mut Map<String, Value>, incoming: &Map<String, Value>) {
    for (key, value) in incoming {
        if let (Some(Value::Object(existing)), Value::Object(nested)) = (target.get_mut(key), value)
        {
            merge_objects(existing, nested);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Persisted form of [`EffectiveConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    /// Configuration values
    #[serde(default)]
    pub config: Map<String, Value>,

    /// Visibility per key; unknown tokens load as private
    #[serde(default)]
    pub visibility: BTreeMap<String, Visibility>,

    /// Tier tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl From<StoredConfig> for EffectiveConfig {
    fn from(stored: StoredConfig) -> Self {
        Self {
            values: stored.config,
            visibility: stored.visibility,
            tier: stored.tier,
        }
    }
}

impl From<EffectiveConfig> for StoredConfig {
    fn from(config: EffectiveConfig) -> Self {
        Self {
            config: config.values,
            visibility: config.visibility,
            tier: config.tier,
        }
    }
}
