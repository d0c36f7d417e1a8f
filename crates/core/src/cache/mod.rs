//! Cache Store Manager: versioned partitions of request/response snapshots.
//!
//! This module provides a persistent partitioned cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Named partitions with a `static` or `dynamic` role
//! - Exact method+URL lookup keyed by SHA-256
//! - FIFO eviction bounded per partition
//! - Stale partition purge on activation
//! - An optional storage quota (SQLITE_FULL surfaces as `QuotaExceeded`)

pub mod connection;
pub mod entries;
pub mod hash;
pub mod manager;
pub mod migrations;
pub mod partition;
pub mod partitions;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use manager::CacheManager;
pub use partition::{PartitionName, PartitionRole, PartitionSet};
pub use storage::CacheStorage;
