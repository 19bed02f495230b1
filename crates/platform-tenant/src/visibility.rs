//! Visibility levels for configuration keys
//!
//! Every configuration key carries a visibility that decides which trust
//! boundary it may cross. Unknown or missing visibility is always treated as
//! [`Visibility::Private`].

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Visibility classification of a single configuration key.
///
/// # Levels
///
/// - **Public**: may be sent to the browser
/// - **Protected**: may reach the rendering edge, never the browser
/// - **Private**: never leaves the backend process
///
/// # Examples
///
/// ```
/// use platform_tenant::Visibility;
///
/// assert_eq!(Visibility::parse_lenient("public"), Visibility::Public);
/// assert_eq!(Visibility::parse_lenient("PROTECTED"), Visibility::Protected);
/// assert_eq!(Visibility::parse_lenient("everyone"), Visibility::Private);
/// ```
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Exposed to the browser
    Public,

    /// Exposed to the rendering edge only
    Protected,

    /// Backend only
    #[default]
    Private,
}

impl Visibility {
    /// Parse a visibility token, degrading anything unrecognised to `Private`.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Visibility::Public,
            "protected" => Visibility::Protected,
            _ => Visibility::Private,
        }
    }

    /// Get string representation of the visibility.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }

    /// Check whether a key with this visibility may cross the given boundary.
    pub fn is_exposed_to(&self, exposure: Exposure) -> bool {
        match (self, exposure) {
            (Visibility::Private, _) => false,
            (Visibility::Public, _) => true,
            (Visibility::Protected, Exposure::Protected) => true,
            (Visibility::Protected, Exposure::Public) => false,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Visibility {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Non-string tokens (numbers, null, objects) are just as untrusted
        // as unknown strings.
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(raw
            .as_str()
            .map(Visibility::parse_lenient)
            .unwrap_or(Visibility::Private))
    }
}

/// Trust boundary a filtered view of the configuration is produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exposure {
    /// The browser: public keys only
    Public,

    /// The rendering edge: public and protected keys
    Protected,
}
