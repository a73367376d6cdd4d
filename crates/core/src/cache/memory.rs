//! In-process result cache backed by moka.
//!
//! Lives as long as the process. Capacity-bounded; freshness is still
//! judged by the caller's policy.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;

use super::hash::CacheKey;
use super::store::{CacheEntry, ResultCache};
use crate::Error;

/// Process-lifetime cache of aggregated results.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Cache<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(max_entries: u64) -> Self {
        Self { inner: Cache::builder().max_capacity(max_entries).build() }
    }

    /// Entries currently held, after pending maintenance has run.
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        Ok(self.inner.get(key.hash()).await)
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        self.inner.insert(key.hash().to_string(), entry.clone()).await;
        Ok(())
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        self.inner.invalidate(key.hash()).await;
        Ok(())
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let stale: Vec<_> = self
            .inner
            .iter()
            .filter(|(_, entry)| entry.created_at < cutoff)
            .map(|(key, _)| key)
            .collect();

        for key in &stale {
            self.inner.invalidate(key.as_str()).await;
        }

        Ok(stale.len() as u64)
    }
}
