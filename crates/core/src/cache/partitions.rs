//! Partition operations.
//!
//! Creating, listing and deleting named partitions. Deleting a partition
//! cascades to every entry it holds.

use super::connection::CacheDb;
use super::partition::PartitionRole;
use crate::Error;
use tokio_rusqlite::params;

impl CacheDb {
    /// Create a partition if it does not exist.
    ///
    /// Returns true when the partition was created by this call.
    pub async fn open_partition(&self, name: &str, role: PartitionRole) -> Result<bool, Error> {
        let name = name.to_string();
        let created_at = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT OR IGNORE INTO partitions (name, role, created_at) VALUES (?1, ?2, ?3)",
                    params![name, role.as_str(), created_at],
                )?;
                Ok(inserted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// List every partition name, oldest first.
    pub async fn partition_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM partitions ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a partition and all of its entries.
    ///
    /// Returns false if the partition did not exist.
    pub async fn drop_partition(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.open_partition("arca-static-v1.0.0", PartitionRole::Static).await.unwrap());
        assert!(!db.open_partition("arca-static-v1.0.0", PartitionRole::Static).await.unwrap());
        assert_eq!(db.partition_names().await.unwrap(), vec!["arca-static-v1.0.0"]);
    }

    #[tokio::test]
    async fn test_drop_partition() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_partition("arca-static-v1.0.0", PartitionRole::Static).await.unwrap();
        db.open_partition("arca-dynamic-v1.0.0", PartitionRole::Dynamic).await.unwrap();

        assert!(db.drop_partition("arca-static-v1.0.0").await.unwrap());
        assert!(!db.drop_partition("arca-static-v1.0.0").await.unwrap());
        assert_eq!(db.partition_names().await.unwrap(), vec!["arca-dynamic-v1.0.0"]);
    }
}
