//! Registered WordPress sites.

use serde::{Deserialize, Serialize};

/// Represents a `wp_sites` row.
///
/// `wp_app_password_enc` is an encrypted blob (see `crypto`) under the
/// deployment `APP_SECRET`. It is decrypted only when a tool needs to call
/// the site.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SiteRecord {
    pub site_id: String,
    pub base_url: String,
    pub wp_username: String,
    pub wp_app_password_enc: String,
}

/// Request to register or update a site.
///
/// # Example
///
/// ```json
/// {
///   "site_id": "marketing",
///   "base_url": "https://example.com",
///   "wp_username": "automation",
///   "wp_app_password": "abcd efgh ijkl mnop"
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct RegisterSiteRequest {
    #[serde(default)]
    pub site_id: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub wp_username: String,
    #[serde(default)]
    pub wp_app_password: String,
}

/// Whether a site upsert created or replaced the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpsertMode {
    Inserted,
    Updated,
}

#[derive(Debug, Serialize)]
pub struct RegisterSiteResponse {
    pub ok: bool,
    pub mode: UpsertMode,
    pub site_id: String,
    pub base_url: String,
}

/// A site with its application password decrypted, ready for API calls.
///
/// `Debug` never prints the password.
#[derive(Clone)]
pub struct Site {
    pub site_id: String,
    pub base_url: String,
    pub wp_username: String,
    pub wp_app_password: String,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("site_id", &self.site_id)
            .field("base_url", &self.base_url)
            .field("wp_username", &self.wp_username)
            .finish_non_exhaustive()
    }
}
