//! The partition capability interface.
//!
//! Strategies and lifecycle code only see `CacheStorage`, so the SQLite
//! backend can be swapped for any persistent key-value store.

use async_trait::async_trait;

use super::connection::CacheDb;
use super::partition::PartitionRole;
use crate::Error;
use crate::http::{RequestKey, Response};

/// Persistent storage of named partitions of request/response snapshots.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the partition if absent. Idempotent.
    async fn open(&self, name: &str, role: PartitionRole) -> Result<(), Error>;

    /// Every partition name currently stored.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition with all of its entries.
    async fn delete_partition(&self, name: &str) -> Result<bool, Error>;

    /// Store one entry, replacing any entry with the same key.
    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> Result<(), Error>;

    /// Store many entries, all or nothing.
    async fn put_batch(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error>;

    /// Exact method+URL lookup.
    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, Error>;

    /// Keys in insertion order, oldest first.
    async fn keys(&self, name: &str) -> Result<Vec<RequestKey>, Error>;

    async fn delete(&self, name: &str, key: &RequestKey) -> Result<bool, Error>;

    /// Entry count of one partition, or of all partitions when `name` is None.
    async fn count(&self, name: Option<&str>) -> Result<u64, Error>;

    /// Evict oldest entries down to `max_entries`; returns how many were evicted.
    async fn trim(&self, name: &str, max_entries: usize) -> Result<u64, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str, role: PartitionRole) -> Result<(), Error> {
        self.open_partition(name, role).await.map(|_| ())
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.partition_names().await
    }

    async fn delete_partition(&self, name: &str) -> Result<bool, Error> {
        self.drop_partition(name).await
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &Response) -> Result<(), Error> {
        self.put_entry(name, key, response).await
    }

    async fn put_batch(&self, name: &str, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        self.put_entries(name, entries).await
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<Response>, Error> {
        self.get_entry(name, key).await
    }

    async fn keys(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        self.entry_keys(name).await
    }

    async fn delete(&self, name: &str, key: &RequestKey) -> Result<bool, Error> {
        self.delete_entry(name, key).await
    }

    async fn count(&self, name: Option<&str>) -> Result<u64, Error> {
        self.count_entries(name).await
    }

    async fn trim(&self, name: &str, max_entries: usize) -> Result<u64, Error> {
        self.trim_partition(name, max_entries).await
    }
}
