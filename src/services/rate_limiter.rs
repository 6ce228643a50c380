//! Per-key, per-minute request quota.
//!
//! Counters live in the store keyed by `(api_key_id, window_start)`, where
//! `window_start` is the request time truncated to the UTC minute. A new
//! minute starts a new row; old rows are never pruned here.
//!
//! # Admission
//!
//! A request is admitted when the count produced by its own increment is
//! `<= limit`, so exactly `limit` requests pass per key per minute. The
//! store's increment returns the value it wrote, which keeps that bound
//! under concurrent requests for the same key.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::error::AppError;
use crate::store::CredentialStore;

pub struct RateLimiter {
    store: Arc<dyn CredentialStore>,
    limit: i64,
}

impl RateLimiter {
    /// `limit <= 0` disables limiting.
    pub fn new(store: Arc<dyn CredentialStore>, limit: i64) -> Self {
        Self { store, limit }
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub async fn allow(&self, api_key_id: i64) -> Result<bool, AppError> {
        self.allow_at(api_key_id, Utc::now()).await
    }

    /// Count one request at `now` and decide whether it is admitted.
    pub async fn allow_at(&self, api_key_id: i64, now: DateTime<Utc>) -> Result<bool, AppError> {
        if !self.is_enabled() {
            return Ok(true);
        }

        let count = self
            .store
            .increment_and_read_window_count(api_key_id, window_start(now))
            .await?;

        Ok(count <= self.limit)
    }
}

/// Truncate a timestamp to the start of its UTC minute.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let seconds = now.timestamp();
    Utc.timestamp_opt(seconds - seconds.rem_euclid(60), 0)
        .single()
        .unwrap_or(now)
}
