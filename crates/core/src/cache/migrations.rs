//! Cache schema versioning.
//!
//! `schema_version` records every applied step. Steps run in order, each in
//! its own transaction, so a failed step leaves the previous schema intact.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Schema steps, ascending by version.
const STEPS: &[(u32, &str, &str)] = &[(1, "result_cache", include_str!("../../migrations/001_result_cache.sql"))];

/// Bring the cache schema up to date.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL
            )",
        )?;

        let applied: u32 =
            conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;

        for &(version, name, sql) in STEPS.iter().filter(|(v, _, _)| *v > applied) {
            apply(conn, version, name, sql)
                .map_err(|e| Error::MigrationFailed(format!("step {version} ({name}): {e}")))?;
            tracing::debug!(version, name, "applied cache schema step");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}

fn apply(conn: &mut rusqlite::Connection, version: u32, name: &str, sql: &str) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.execute(
        "INSERT INTO schema_version (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![version, name, chrono::Utc::now().to_rfc3339()],
    )?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, table: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [table],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_creates_result_cache_table() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        assert!(table_exists(&conn, "result_cache").await);
        assert!(table_exists(&conn, "schema_version").await);
    }

    #[tokio::test]
    async fn test_rerun_applies_nothing() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        let rows: Vec<(u32, String)> = conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT version, name FROM schema_version ORDER BY version")?;
                let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?.collect::<Result<Vec<_>, _>>();
                rows
            })
            .await
            .unwrap();

        assert_eq!(rows, vec![(1, "result_cache".to_string())]);
    }
}
