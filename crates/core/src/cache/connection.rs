//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), running migrations, and
//! applying the optional storage quota.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread. Clones share the same connection, so every
/// worker generation sees the same partitions.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open an in-memory database for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based databases.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS)).await.map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }

    /// Cap the database size. Writes past the cap fail with `QuotaExceeded`.
    ///
    /// SQLite never shrinks the cap below the pages already in use.
    pub async fn set_quota(&self, quota_bytes: u64) -> Result<(), Error> {
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
                let pages = (quota_bytes as i64 / page_size.max(1)).max(1);
                conn.execute_batch(&format!("PRAGMA max_page_count = {pages};"))?;
                tracing::debug!(quota_bytes, pages, "storage quota applied");
                Ok(())
            })
            .await
            .map_err(Error::from)
    }
}
