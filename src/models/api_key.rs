//! API Key model for authentication.
//!
//! API keys identify automation clients. They are stored as SHA-256 hashes;
//! the plaintext key is shown once at provisioning time and never persisted.

use std::collections::BTreeSet;
use std::fmt;

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `mcp_api_keys` table with columns:
/// - `id`: Stable integer identity
/// - `key_hash`: SHA-256 hash of the actual API key
/// - `name`: Display label
/// - `scopes_json`: JSON array of scope strings
/// - `signing_secret_enc`: Encrypted HMAC signing secret, if any
/// - `status`: `active` or `inactive`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKeyRecord {
    pub id: i64,

    /// SHA-256 hash of the actual API key (64 hex characters)
    pub key_hash: String,

    pub name: String,

    /// Serialized scope set as stored; validated by [`Scopes::parse_json`]
    /// when the key authenticates.
    pub scopes_json: String,

    /// Signing secret encrypted with the deployment `APP_SECRET`.
    ///
    /// `None` means the key cannot sign requests.
    pub signing_secret_enc: Option<String>,

    pub status: String,
}

impl ApiKeyRecord {
    pub fn status(&self) -> KeyStatus {
        KeyStatus::from_column(&self.status)
    }
}

/// Lifecycle state of an API key.
///
/// Only `Active` keys authenticate. Any unrecognised column value is treated
/// as `Inactive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStatus {
    Active,
    Inactive,
}

impl KeyStatus {
    pub fn from_column(value: &str) -> Self {
        match value {
            "active" => KeyStatus::Active,
            _ => KeyStatus::Inactive,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KeyStatus::Active => "active",
            KeyStatus::Inactive => "inactive",
        }
    }
}

/// Stored scopes could not be interpreted as a set of strings.
#[derive(Debug, thiserror::Error)]
#[error("Malformed scopes: {0}")]
pub struct ScopesError(String);

/// Set of capability tokens granted to a key (e.g. `pages.write`).
///
/// Membership-only semantics: order and duplicates in storage are irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scopes(BTreeSet<String>);

impl Scopes {
    /// Parse the `scopes_json` column.
    ///
    /// The value must be a JSON array whose elements are non-empty strings.
    /// Anything else is rejected instead of silently becoming an empty set.
    pub fn parse_json(raw: &str) -> Result<Self, ScopesError> {
        let values: Vec<serde_json::Value> =
            serde_json::from_str(raw).map_err(|e| ScopesError(e.to_string()))?;

        let mut scopes = BTreeSet::new();
        for value in values {
            match value {
                serde_json::Value::String(s) if !s.trim().is_empty() => {
                    scopes.insert(s.trim().to_string());
                }
                other => return Err(ScopesError(format!("invalid scope entry {other}"))),
            }
        }

        Ok(Self(scopes))
    }

    pub fn contains(&self, scope: &str) -> bool {
        self.0.contains(scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn to_json(&self) -> String {
        serde_json::Value::from(self.0.iter().cloned().collect::<Vec<_>>()).to_string()
    }
}

impl<S: Into<String>> FromIterator<S> for Scopes {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Decrypted request signing secret.
///
/// `Debug` never prints the value.
#[derive(Clone)]
pub struct SigningSecret(String);

impl SigningSecret {
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([redacted])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scope_array() {
        let scopes = Scopes::parse_json(r#"["pages.write","pages.read","pages.write"]"#).unwrap();
        assert!(scopes.contains("pages.read"));
        assert!(scopes.contains("pages.write"));
        assert!(!scopes.contains("menus.write"));
        assert_eq!(scopes.iter().count(), 2);
    }

    #[test]
    fn empty_array_is_empty_set() {
        assert_eq!(Scopes::parse_json("[]").unwrap(), Scopes::default());
    }

    #[test]
    fn malformed_scopes_are_rejected() {
        for raw in ["", "not json", r#"{"a":1}"#, r#""pages.read""#, "[1,2]", r#"["ok", ""]"#] {
            assert!(Scopes::parse_json(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn unknown_status_is_inactive() {
        assert_eq!(KeyStatus::from_column("active"), KeyStatus::Active);
        assert_eq!(KeyStatus::from_column("inactive"), KeyStatus::Inactive);
        assert_eq!(KeyStatus::from_column("ACTIVE"), KeyStatus::Inactive);
        assert_eq!(KeyStatus::from_column("revoked"), KeyStatus::Inactive);
    }

    #[test]
    fn signing_secret_debug_is_redacted() {
        let secret = SigningSecret::new("super-secret".to_string());
        assert!(!format!("{secret:?}").contains("super-secret"));
    }
}
