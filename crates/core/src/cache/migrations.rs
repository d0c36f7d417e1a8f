//! Cache schema migrations.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its version row, so a crash
//! never leaves a half-applied schema behind.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Schema steps in application order.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_partitions.sql")),
    (2, include_str!("../../migrations/002_entries.sql")),
];

/// Highest schema version this build understands.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}

/// Bring the schema up to date.
///
/// # Errors
///
/// Returns `Error::MigrationFailed` if a step fails, or if the database was
/// written by a build with a newer schema.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );",
        )?;

        let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
        if current > latest_version() {
            return Err(Error::MigrationFailed(format!(
                "cache schema v{current} is newer than supported v{}",
                latest_version()
            )));
        }

        for (version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > current) {
            let tx = conn.transaction()?;
            tx.execute_batch(sql).map_err(|e| Error::MigrationFailed(format!("v{version}: {e}")))?;
            tx.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            tracing::debug!(version, "applied cache migration");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
