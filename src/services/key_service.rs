//! API key issuance.
//!
//! Keys are provisioned out of band by the `wp-mcp-issue-key` binary. The
//! plaintext key and signing secret are shown once; the store keeps only the
//! key's SHA-256 digest and the signing secret sealed under `APP_SECRET`.

use crate::config::AppSecret;
use crate::crypto::{self, CryptoError};
use crate::models::api_key::Scopes;

/// Scopes granted when none are requested.
pub const DEFAULT_SCOPES: [&str; 3] = ["pages.read", "pages.write", "menus.write"];

/// A freshly generated key, before it is stored.
pub struct IssuedKey {
    /// Plaintext bearer key; never persisted
    pub api_key: String,
    /// Plaintext signing secret; never persisted
    pub signing_secret: String,
    pub key_hash: String,
    pub scopes_json: String,
    pub signing_secret_enc: String,
}

/// Generate a key and signing secret for the given scopes.
///
/// # Process
///
/// 1. Generate a random API key and signing secret
/// 2. Hash the key for the `key_hash` column
/// 3. Encrypt the signing secret with the deployment secret
pub fn issue_key(scopes: &Scopes, app_secret: &AppSecret) -> Result<IssuedKey, CryptoError> {
    let api_key = crypto::generate_secret();
    let signing_secret = crypto::generate_secret();

    Ok(IssuedKey {
        key_hash: crypto::hash_api_key(&api_key),
        scopes_json: scopes.to_json(),
        signing_secret_enc: crypto::encrypt(&signing_secret, app_secret.expose())?,
        api_key,
        signing_secret,
    })
}

/// Parse a comma separated scope list, falling back to [`DEFAULT_SCOPES`].
pub fn parse_scope_list(raw: Option<&str>) -> Scopes {
    let requested: Scopes = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if requested.iter().next().is_none() {
        DEFAULT_SCOPES.into_iter().collect()
    } else {
        requested
    }
}
