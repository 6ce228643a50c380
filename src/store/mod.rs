//! Persistence seams used by the security pipeline and the tools.
//!
//! The relational store is the only shared mutable state in the service.
//! Nothing read through these traits is cached across requests, so status
//! flips and scope changes take effect on the next request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::api_key::ApiKeyRecord;
use crate::models::audit::AuditEntry;
use crate::models::site::{SiteRecord, UpsertMode};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, sqlx::Error>;

/// Key lookup and per-key security counters.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find an active key by the SHA-256 hex digest of its plaintext.
    ///
    /// Unknown and inactive keys both yield `None`.
    async fn find_active_key_by_hash(&self, key_hash: &str) -> StoreResult<Option<ApiKeyRecord>>;

    /// Atomically create-or-increment the `(api_key_id, window_start)`
    /// counter and return the count this call produced.
    async fn increment_and_read_window_count(
        &self,
        api_key_id: i64,
        window_start: DateTime<Utc>,
    ) -> StoreResult<i64>;

    /// Record a verified `(timestamp, signature)` pair for a key.
    ///
    /// Returns `false` when the pair was already recorded. Entries with a
    /// timestamp before `not_before` are pruned for that key first.
    async fn remember_signature(
        &self,
        api_key_id: i64,
        timestamp: i64,
        signature: &str,
        not_before: i64,
    ) -> StoreResult<bool>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> StoreResult<()>;
}

/// Registered sites and the tool audit log.
#[async_trait]
pub trait SiteStore: Send + Sync {
    async fn find_site(&self, site_id: &str) -> StoreResult<Option<SiteRecord>>;

    async fn upsert_site(&self, site: &SiteRecord) -> StoreResult<UpsertMode>;

    async fn record_tool_call(&self, entry: &AuditEntry) -> StoreResult<()>;
}
