//! PostgreSQL implementation of the store traits.
//!
//! All statements are prepared and bound; no value is ever interpolated
//! into SQL text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::db::DbPool;
use crate::models::api_key::ApiKeyRecord;
use crate::models::audit::AuditEntry;
use crate::models::site::{SiteRecord, UpsertMode};
use crate::services::key_service::IssuedKey;
use crate::store::{CredentialStore, SiteStore, StoreResult};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store a newly issued key and return its id.
    ///
    /// Provisioning only; the request pipeline never writes keys.
    pub async fn insert_api_key(&self, name: &str, issued: &IssuedKey) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO mcp_api_keys (key_hash, name, scopes_json, signing_secret_enc, status)
            VALUES ($1, $2, $3, $4, 'active')
            RETURNING id
            "#,
        )
        .bind(&issued.key_hash)
        .bind(name)
        .bind(&issued.scopes_json)
        .bind(&issued.signing_secret_enc)
        .fetch_one(&self.pool)
        .await
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_active_key_by_hash(&self, key_hash: &str) -> StoreResult<Option<ApiKeyRecord>> {
        sqlx::query_as::<_, ApiKeyRecord>(
            "SELECT id, key_hash, name, scopes_json, signing_secret_enc, status
             FROM mcp_api_keys
             WHERE key_hash = $1 AND status = 'active'
             LIMIT 1",
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
    }

    /// Single-statement upsert: the returned count is the value written by
    /// this call, so concurrent requests for one key each see a distinct
    /// count.
    async fn increment_and_read_window_count(
        &self,
        api_key_id: i64,
        window_start: DateTime<Utc>,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO mcp_rate_limits (api_key_id, window_start, count)
            VALUES ($1, $2, 1)
            ON CONFLICT (api_key_id, window_start)
            DO UPDATE SET count = mcp_rate_limits.count + 1
            RETURNING count
            "#,
        )
        .bind(api_key_id)
        .bind(window_start)
        .fetch_one(&self.pool)
        .await
    }

    async fn remember_signature(
        &self,
        api_key_id: i64,
        timestamp: i64,
        signature: &str,
        not_before: i64,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM mcp_seen_signatures WHERE api_key_id = $1 AND request_timestamp < $2")
            .bind(api_key_id)
            .bind(not_before)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO mcp_seen_signatures (api_key_id, request_timestamp, signature)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(api_key_id)
        .bind(timestamp)
        .bind(signature)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        Ok(inserted == 1)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteStore for PgStore {
    async fn find_site(&self, site_id: &str) -> StoreResult<Option<SiteRecord>> {
        sqlx::query_as::<_, SiteRecord>(
            "SELECT site_id, base_url, wp_username, wp_app_password_enc
             FROM wp_sites
             WHERE site_id = $1
             LIMIT 1",
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert_site(&self, site: &SiteRecord) -> StoreResult<UpsertMode> {
        // xmax is zero only for rows created by this statement
        let inserted = sqlx::query_scalar::<_, bool>(
            r#"
            INSERT INTO wp_sites (site_id, base_url, wp_username, wp_app_password_enc)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (site_id) DO UPDATE
            SET base_url = EXCLUDED.base_url,
                wp_username = EXCLUDED.wp_username,
                wp_app_password_enc = EXCLUDED.wp_app_password_enc,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&site.site_id)
        .bind(&site.base_url)
        .bind(&site.wp_username)
        .bind(&site.wp_app_password_enc)
        .fetch_one(&self.pool)
        .await?;

        Ok(if inserted {
            UpsertMode::Inserted
        } else {
            UpsertMode::Updated
        })
    }

    async fn record_tool_call(&self, entry: &AuditEntry) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO mcp_logs (api_key_id, site_id, tool_name, input_json, result_json, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.api_key_id)
        .bind(&entry.site_id)
        .bind(&entry.tool_name)
        .bind(&entry.input)
        .bind(&entry.result)
        .bind(entry.status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
