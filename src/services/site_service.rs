//! Site registration and credential loading.
//!
//! WordPress application passwords are encrypted with the deployment
//! `APP_SECRET` before they reach the store, and decrypted only when a tool
//! is about to call the site.

use crate::config::AppSecret;
use crate::crypto::{self, CryptoError};
use crate::error::AppError;
use crate::models::site::{
    RegisterSiteRequest, RegisterSiteResponse, Site, SiteRecord,
};
use crate::store::SiteStore;

#[derive(Debug, thiserror::Error)]
pub enum LoadSiteError {
    #[error("Unknown site_id")]
    UnknownSite,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Site credentials unreadable: {0}")]
    Crypto(#[from] CryptoError),
}

/// Look up a site and decrypt its application password.
pub async fn load_site(
    store: &dyn SiteStore,
    app_secret: &AppSecret,
    site_id: &str,
) -> Result<Site, LoadSiteError> {
    let record = store
        .find_site(site_id)
        .await?
        .ok_or(LoadSiteError::UnknownSite)?;

    let wp_app_password = crypto::decrypt(&record.wp_app_password_enc, app_secret.expose())?;

    Ok(Site {
        site_id: record.site_id,
        base_url: record.base_url,
        wp_username: record.wp_username,
        wp_app_password,
    })
}

/// Register a site or replace its credentials.
///
/// # Process
///
/// 1. Trim and require every field
/// 2. Require an http(s) `base_url`
/// 3. Encrypt the application password
/// 4. Upsert the `wp_sites` row
///
/// # Errors
///
/// - `MissingFields`: any field empty after trimming
/// - `InvalidRequest`: `base_url` is not an http(s) URL
pub async fn register_site(
    store: &dyn SiteStore,
    app_secret: &AppSecret,
    request: RegisterSiteRequest,
) -> Result<RegisterSiteResponse, AppError> {
    let site_id = request.site_id.trim().to_string();
    let base_url = request.base_url.trim().to_string();
    let wp_username = request.wp_username.trim().to_string();
    let wp_app_password = request.wp_app_password;

    if site_id.is_empty()
        || base_url.is_empty()
        || wp_username.is_empty()
        || wp_app_password.is_empty()
    {
        return Err(AppError::MissingFields);
    }

    validate_base_url(&base_url)?;

    let record = SiteRecord {
        site_id,
        base_url,
        wp_username,
        wp_app_password_enc: crypto::encrypt(&wp_app_password, app_secret.expose())?,
    };

    let mode = store.upsert_site(&record).await?;
    tracing::info!(site_id = %record.site_id, ?mode, "Site registered");

    Ok(RegisterSiteResponse {
        ok: true,
        mode,
        site_id: record.site_id,
        base_url: record.base_url,
    })
}

fn validate_base_url(base_url: &str) -> Result<(), AppError> {
    let parsed = url::Url::parse(base_url)
        .map_err(|_| AppError::InvalidRequest("base_url is not a valid URL".to_string()))?;

    match parsed.scheme() {
        "https" | "http" if parsed.host_str().is_some() => Ok(()),
        _ => Err(AppError::InvalidRequest(
            "base_url must be an http or https URL".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::site::UpsertMode;
    use crate::store::MemoryStore;

    fn secret() -> AppSecret {
        AppSecret::new("site-service-secret-0123456789")
    }

    fn request(site_id: &str, base_url: &str) -> RegisterSiteRequest {
        RegisterSiteRequest {
            site_id: site_id.to_string(),
            base_url: base_url.to_string(),
            wp_username: "bot".to_string(),
            wp_app_password: "abcd efgh ijkl".to_string(),
        }
    }

    #[tokio::test]
    async fn registered_password_is_encrypted_and_loadable() {
        let store = MemoryStore::new();

        let response = register_site(&store, &secret(), request(" main ", "https://example.com"))
            .await
            .unwrap();
        assert_eq!(response.mode, UpsertMode::Inserted);
        assert_eq!(response.site_id, "main");

        let stored = store.site("main").unwrap();
        assert_ne!(stored.wp_app_password_enc, "abcd efgh ijkl");

        let site = load_site(&store, &secret(), "main").await.unwrap();
        assert_eq!(site.wp_app_password, "abcd efgh ijkl");
        assert!(!format!("{site:?}").contains("abcd"));

        let again = register_site(&store, &secret(), request("main", "https://example.org"))
            .await
            .unwrap();
        assert_eq!(again.mode, UpsertMode::Updated);
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let store = MemoryStore::new();
        let mut incomplete = request("main", "https://example.com");
        incomplete.wp_username = "  ".to_string();

        assert!(matches!(
            register_site(&store, &secret(), incomplete).await,
            Err(AppError::MissingFields)
        ));
    }

    #[tokio::test]
    async fn base_url_must_be_http() {
        let store = MemoryStore::new();
        for url in ["ftp://example.com", "example.com", "file:///etc/passwd"] {
            assert!(matches!(
                register_site(&store, &secret(), request("main", url)).await,
                Err(AppError::InvalidRequest(_))
            ));
        }
    }

    #[tokio::test]
    async fn load_site_failures() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_site(&store, &secret(), "nope").await,
            Err(LoadSiteError::UnknownSite)
        ));

        register_site(&store, &secret(), request("main", "https://example.com"))
            .await
            .unwrap();
        let wrong = AppSecret::new("not-the-secret-used-to-encrypt");
        assert!(matches!(
            load_site(&store, &wrong, "main").await,
            Err(LoadSiteError::Crypto(_))
        ));
    }
}
