//! Authenticated identity attached to a request.

use crate::models::api_key::{Scopes, SigningSecret};

/// Principal resolved by the authenticator.
///
/// Inserted into the request's extension map by the security middleware;
/// handlers extract it with `Extension<Principal>`.
#[derive(Debug, Clone)]
pub struct Principal {
    /// ID of the authenticated API key
    pub api_key_id: i64,

    /// Display label of the key
    pub name: String,

    pub scopes: Scopes,

    /// Decrypted signing secret, if the key has one
    pub signing_secret: Option<SigningSecret>,
}

impl Principal {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }
}
