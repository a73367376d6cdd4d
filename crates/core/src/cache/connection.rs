//! SQLite handle for the persistent result cache.
//!
//! The database runs in WAL mode on tokio-rusqlite's background thread so a
//! CLI run and a long-lived client can share one file.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA busy_timeout=5000;
     PRAGMA temp_store=MEMORY;";

/// Persistent cache of aggregated search results.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    /// Upper bound on stored result sets; `None` keeps everything.
    pub(crate) max_entries: Option<usize>,
}

impl CacheDb {
    /// Open or create the cache file, creating missing parent directories.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("cannot create cache directory {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Private cache that disappears with the handle.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Keep at most `max_entries` result sets, evicting the oldest first.
    pub fn with_capacity(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS)).await.map_err(Error::Database)?;
        migrations::run(&conn).await?;

        Ok(Self { conn, max_entries: None })
    }
}
