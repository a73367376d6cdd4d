//! Search result cache operations.
//!
//! Provides functions for caching and retrieving aggregated search results.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::params;

use super::connection::CacheDb;
use super::hash::CacheKey;
use super::store::{CacheEntry, ResultCache};
use crate::Error;

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl CacheDb {
    /// Get a cached result set by key hash.
    ///
    /// Returns None if the key doesn't exist in the cache.
    pub async fn get_results(&self, key_hash: &str) -> Result<Option<CacheEntry>, Error> {
        let key_hash = key_hash.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String)>, Error> {
                let mut stmt = conn.prepare("SELECT results_json, created_at FROM result_cache WHERE key_hash = ?1")?;

                let result = stmt.query_row(params![key_hash], |row| Ok((row.get(0)?, row.get(1)?)));

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(tokio_rusqlite::rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((results_json, created_at)) = row else {
            return Ok(None);
        };

        let results = serde_json::from_str(&results_json).map_err(|e| Error::Parse(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| Error::Parse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(Some(CacheEntry { results, created_at }))
    }

    /// Insert or replace a cached result set.
    ///
    /// Uses UPSERT semantics, then trims the table to the configured capacity.
    pub async fn put_results(&self, key_hash: &str, query_text: &str, entry: &CacheEntry) -> Result<(), Error> {
        let key_hash = key_hash.to_string();
        let query_text = query_text.to_string();
        let results_json = serde_json::to_string(&entry.results).map_err(|e| Error::Parse(e.to_string()))?;
        let created_at = timestamp(entry.created_at);

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO result_cache (key_hash, query_text, results_json, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(key_hash) DO UPDATE SET
                        query_text = excluded.query_text,
                        results_json = excluded.results_json,
                        created_at = excluded.created_at",
                    params![key_hash, query_text, results_json, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)?;

        if let Some(max) = self.max_entries {
            let evicted = self.purge_lru(max).await?;
            if evicted > 0 {
                tracing::debug!(evicted, max, "trimmed result cache to capacity");
            }
        }

        Ok(())
    }

    /// Delete one entry.
    pub async fn delete_results(&self, key_hash: &str) -> Result<(), Error> {
        let key_hash = key_hash.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute("DELETE FROM result_cache WHERE key_hash = ?1", params![key_hash])?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries created before `cutoff`.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        let cutoff = timestamp(cutoff);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM result_cache WHERE created_at < ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Purge oldest entries until count <= max_entries.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_lru(&self, max_entries: usize) -> Result<u64, Error> {
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM result_cache", [], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM result_cache WHERE key_hash IN (
                    SELECT key_hash FROM result_cache ORDER BY created_at ASC LIMIT ?1
                )",
                    params![to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of stored result sets.
    pub async fn count_results(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM result_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete everything.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM result_cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[async_trait]
impl ResultCache for CacheDb {
    async fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, Error> {
        self.get_results(key.hash()).await
    }

    async fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), Error> {
        self.put_results(key.hash(), key.canonical(), entry).await
    }

    async fn remove(&self, key: &CacheKey) -> Result<(), Error> {
        self.delete_results(key.hash()).await
    }

    async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, Error> {
        self.purge_created_before(cutoff).await
    }
}
