//! In-process store for tests and local development.
//!
//! Every operation takes one lock, so the window counter has the same
//! atomic increment-and-read semantics as the PostgreSQL upsert.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::api_key::{ApiKeyRecord, KeyStatus};
use crate::models::audit::AuditEntry;
use crate::models::site::{SiteRecord, UpsertMode};
use crate::store::{CredentialStore, SiteStore, StoreResult};

#[derive(Debug, Default)]
struct Inner {
    keys: HashMap<String, ApiKeyRecord>,
    windows: HashMap<(i64, DateTime<Utc>), i64>,
    seen_signatures: HashSet<(i64, i64, String)>,
    sites: HashMap<String, SiteRecord>,
    audit: Vec<AuditEntry>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a key record, indexed by its `key_hash`.
    pub fn insert_key(&self, record: ApiKeyRecord) {
        self.lock().keys.insert(record.key_hash.clone(), record);
    }

    /// Change the status of the key with the given id.
    pub fn set_key_status(&self, api_key_id: i64, status: KeyStatus) {
        for record in self.lock().keys.values_mut() {
            if record.id == api_key_id {
                record.status = status.as_str().to_string();
            }
        }
    }

    pub fn insert_site(&self, site: SiteRecord) {
        self.lock().sites.insert(site.site_id.clone(), site);
    }

    pub fn site(&self, site_id: &str) -> Option<SiteRecord> {
        self.lock().sites.get(site_id).cloned()
    }

    pub fn window_count(&self, api_key_id: i64, window_start: DateTime<Utc>) -> i64 {
        self.lock()
            .windows
            .get(&(api_key_id, window_start))
            .copied()
            .unwrap_or(0)
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.lock().audit.clone()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_active_key_by_hash(&self, key_hash: &str) -> StoreResult<Option<ApiKeyRecord>> {
        Ok(self
            .lock()
            .keys
            .get(key_hash)
            .filter(|record| record.status() == KeyStatus::Active)
            .cloned())
    }

    async fn increment_and_read_window_count(
        &self,
        api_key_id: i64,
        window_start: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let mut inner = self.lock();
        let count = inner.windows.entry((api_key_id, window_start)).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn remember_signature(
        &self,
        api_key_id: i64,
        timestamp: i64,
        signature: &str,
        not_before: i64,
    ) -> StoreResult<bool> {
        let mut inner = self.lock();
        inner
            .seen_signatures
            .retain(|(key, ts, _)| *key != api_key_id || *ts >= not_before);
        Ok(inner
            .seen_signatures
            .insert((api_key_id, timestamp, signature.to_string())))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl SiteStore for MemoryStore {
    async fn find_site(&self, site_id: &str) -> StoreResult<Option<SiteRecord>> {
        Ok(self.site(site_id))
    }

    async fn upsert_site(&self, site: &SiteRecord) -> StoreResult<UpsertMode> {
        let previous = self.lock().sites.insert(site.site_id.clone(), site.clone());
        Ok(match previous {
            Some(_) => UpsertMode::Updated,
            None => UpsertMode::Inserted,
        })
    }

    async fn record_tool_call(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.lock().audit.push(entry.clone());
        Ok(())
    }
}
