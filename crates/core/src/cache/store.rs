//! Cache abstraction injected into the search client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::hash::CacheKey;
use crate::Error;
use crate::types::ResultItem;

/// A stored result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub results: Vec<ResultItem>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entry stamped with the current time.
    pub fn now(results: Vec<ResultItem>) -> Self {
        Self { results, created_at: Utc::now() }
    }
}

/// Validity window applied when reading entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// `None` keeps entries forever.
    pub ttl: Option<Duration>,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { ttl: Some(Duration::from_millis(86_400_000)) }
    }
}

impl CachePolicy {
    pub fn never_expire() -> Self {
        Self { ttl: None }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    /// Whether `entry` may still answer a request at `now`.
    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let Some(ttl) = self.ttl else {
            return true;
        };
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(entry.created_at) < ttl,
            Err(_) => true,
        }
    }

    /// Oldest creation time that is still fresh at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.ttl?).ok()?;
        now.checked_sub_signed(ttl)
    }
}

/// Key-value store for aggregated results.
///
/// Writes are last-writer-wins per key. Implementations never judge
/// freshness; callers apply a [`CachePolicy`].
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error>;

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error>;

    async fn remove(&self, key: &CacheKey) -> Result<(), Error>;

    /// Delete entries created before `cutoff`, returning how many went.
    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, Error>;
}
