//! API key authentication.
//!
//! Resolves a presented API key and the caller's address into a
//! [`Principal`]. Every failure is the same `AppError::Unauthenticated`; the
//! specific cause is only written to the server log.

use std::sync::Arc;

use crate::config::{AppSecret, SecurityConfig};
use crate::crypto;
use crate::error::AppError;
use crate::models::api_key::{KeyStatus, Scopes, SigningSecret};
use crate::models::principal::Principal;
use crate::services::ip_allowlist::IpAllowlist;
use crate::store::CredentialStore;

pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
    ip_allowlist: IpAllowlist,
    app_secret: AppSecret,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>, config: &SecurityConfig) -> Self {
        Self {
            store,
            ip_allowlist: config.ip_allowlist.clone(),
            app_secret: config.app_secret.clone(),
        }
    }

    /// Authenticate a request.
    ///
    /// # Flow
    ///
    /// 1. Reject an absent or empty key
    /// 2. If an allowlist is configured, reject callers outside it
    /// 3. Hash the key with SHA-256 and look up an active record
    /// 4. Parse the stored scope set; malformed scopes reject the key
    /// 5. Decrypt the signing secret, if the key has one
    ///
    /// # Errors
    ///
    /// - `Unauthenticated` for every rejection above, including a signing
    ///   secret that fails to decrypt
    /// - `Database` if the store is unreachable
    pub async fn authenticate(
        &self,
        api_key: Option<&str>,
        client_ip: &str,
    ) -> Result<Principal, AppError> {
        let Some(api_key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
            tracing::warn!("Authentication failed: no API key presented");
            return Err(AppError::Unauthenticated);
        };

        if self.ip_allowlist.is_enabled() && !self.ip_allowlist.allows(client_ip) {
            tracing::warn!(client_ip, "Authentication failed: address not allowlisted");
            return Err(AppError::Unauthenticated);
        }

        let key_hash = crypto::hash_api_key(api_key);
        let Some(record) = self.store.find_active_key_by_hash(&key_hash).await? else {
            tracing::warn!("Authentication failed: unknown or inactive key");
            return Err(AppError::Unauthenticated);
        };

        if record.status() != KeyStatus::Active {
            tracing::warn!(api_key_id = record.id, "Authentication failed: key inactive");
            return Err(AppError::Unauthenticated);
        }

        let scopes = Scopes::parse_json(&record.scopes_json).map_err(|e| {
            tracing::warn!(api_key_id = record.id, "Authentication failed: {e}");
            AppError::Unauthenticated
        })?;

        let signing_secret = match record.signing_secret_enc.as_deref() {
            None | Some("") => None,
            Some(blob) => {
                let secret = crypto::decrypt(blob, self.app_secret.expose()).map_err(|e| {
                    tracing::warn!(
                        api_key_id = record.id,
                        "Authentication failed: signing secret unreadable: {e}"
                    );
                    AppError::Unauthenticated
                })?;
                Some(SigningSecret::new(secret))
            }
        };

        Ok(Principal {
            api_key_id: record.id,
            name: record.name,
            scopes,
            signing_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::api_key::ApiKeyRecord;
    use crate::store::MemoryStore;

    const APP_SECRET: &str = "test-app-secret-0123456789abcdef";
    const API_KEY: &str = "plain-api-key";

    fn record(scopes_json: &str, signing_secret_enc: Option<String>) -> ApiKeyRecord {
        ApiKeyRecord {
            id: 7,
            key_hash: crypto::hash_api_key(API_KEY),
            name: "automation".to_string(),
            scopes_json: scopes_json.to_string(),
            signing_secret_enc,
            status: "active".to_string(),
        }
    }

    fn authenticator(store: Arc<MemoryStore>, allowlist: &[&str]) -> Authenticator {
        let mut config = SecurityConfig::with_app_secret(APP_SECRET);
        config.ip_allowlist = IpAllowlist::parse(allowlist).unwrap();
        Authenticator::new(store, &config)
    }

    #[tokio::test]
    async fn resolves_principal_with_scopes_and_secret() {
        let store = Arc::new(MemoryStore::new());
        let enc = crypto::encrypt("sign-me", APP_SECRET).unwrap();
        store.insert_key(record(r#"["pages.read","pages.write"]"#, Some(enc)));

        let principal = authenticator(store, &[])
            .authenticate(Some(API_KEY), "203.0.113.1")
            .await
            .unwrap();

        assert_eq!(principal.api_key_id, 7);
        assert_eq!(principal.name, "automation");
        assert!(principal.has_scope("pages.write"));
        assert!(!principal.has_scope("menus.write"));
        assert_eq!(principal.signing_secret.unwrap().expose(), "sign-me");
    }

    #[tokio::test]
    async fn key_without_signing_secret_still_authenticates() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(record("[]", None));

        let principal = authenticator(store, &[])
            .authenticate(Some(API_KEY), "203.0.113.1")
            .await
            .unwrap();
        assert!(principal.signing_secret.is_none());
    }

    #[tokio::test]
    async fn every_failure_is_uniformly_unauthenticated() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(record(r#"["pages.read"]"#, None));
        let auth = authenticator(store.clone(), &["10.0.0.0/24"]);

        for (key, ip) in [
            (None, "10.0.0.5"),
            (Some(""), "10.0.0.5"),
            (Some("   "), "10.0.0.5"),
            (Some("wrong-key"), "10.0.0.5"),
            (Some(API_KEY), "10.0.1.5"),
            (Some(API_KEY), "garbage"),
        ] {
            assert!(matches!(
                auth.authenticate(key, ip).await,
                Err(AppError::Unauthenticated)
            ));
        }

        assert!(auth.authenticate(Some(API_KEY), "10.0.0.5").await.is_ok());

        store.set_key_status(7, KeyStatus::Inactive);
        assert!(matches!(
            auth.authenticate(Some(API_KEY), "10.0.0.5").await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn malformed_scopes_reject_the_key() {
        let store = Arc::new(MemoryStore::new());
        store.insert_key(record("{not json", None));

        assert!(matches!(
            authenticator(store, &[]).authenticate(Some(API_KEY), "10.0.0.5").await,
            Err(AppError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn undecryptable_signing_secret_is_unauthenticated() {
        let store = Arc::new(MemoryStore::new());
        let enc = crypto::encrypt("sign-me", "a-different-app-secret-000000").unwrap();
        store.insert_key(record("[]", Some(enc)));

        assert!(matches!(
            authenticator(store, &[]).authenticate(Some(API_KEY), "10.0.0.5").await,
            Err(AppError::Unauthenticated)
        ));
    }
}
