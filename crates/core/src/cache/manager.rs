//! Cache Store Manager.
//!
//! Sits between the strategies and a `CacheStorage` backend. Writes and
//! reads made on behalf of a page never fail the page: storage errors are
//! logged here and turned into "not stored" / "miss".

use std::collections::HashSet;
use std::sync::Arc;

use super::partition::PartitionName;
use super::storage::CacheStorage;
use crate::Error;
use crate::http::{Request, RequestKey, Response};

#[derive(Clone)]
pub struct CacheManager {
    storage: Arc<dyn CacheStorage>,
}

impl CacheManager {
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self { storage }
    }

    /// Create the partition if absent.
    pub async fn open(&self, name: &PartitionName) -> Result<(), Error> {
        self.storage.open(&name.to_string(), name.role).await
    }

    /// Store a response snapshot for `request`.
    ///
    /// Only GET requests with a basic 200 response are stored. Storage
    /// failures, including an exhausted quota, are logged and reported as
    /// `false`.
    pub async fn put(&self, name: &PartitionName, request: &Request, response: &Response) -> bool {
        if !request.method.is_retrieval() || !response.is_storable() {
            tracing::debug!(
                url = %request.url,
                status = response.status,
                response_type = response.response_type.as_str(),
                "response not storable"
            );
            return false;
        }

        match self.storage.put(&name.to_string(), &request.key(), response).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(partition = %name, url = %request.url, error = %e, "cache put failed");
                false
            }
        }
    }

    /// Store a batch atomically. Unlike `put`, failures are returned.
    pub async fn put_all(&self, name: &PartitionName, entries: Vec<(RequestKey, Response)>) -> Result<(), Error> {
        if let Some((key, response)) = entries.iter().find(|(_, r)| !r.is_storable()) {
            return Err(Error::InvalidInput(format!(
                "{} answered {} ({}), not storable",
                key.url,
                response.status,
                response.response_type.as_str()
            )));
        }
        self.storage.put_batch(&name.to_string(), entries).await
    }

    /// Look up `request` in one partition. Storage errors read as a miss.
    pub async fn lookup(&self, name: &PartitionName, request: &Request) -> Option<Response> {
        self.lookup_key(name, &request.key()).await
    }

    pub async fn lookup_key(&self, name: &PartitionName, key: &RequestKey) -> Option<Response> {
        match self.storage.lookup(&name.to_string(), key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition = %name, url = %key.url, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// Delete every partition whose name is not in `current`.
    ///
    /// Returns the deleted names.
    pub async fn delete_stale_partitions(&self, current: &[String]) -> Result<Vec<String>, Error> {
        let keep: HashSet<&str> = current.iter().map(String::as_str).collect();
        let mut deleted = Vec::new();

        for name in self.storage.partitions().await? {
            if keep.contains(name.as_str()) {
                continue;
            }
            if self.storage.delete_partition(&name).await? {
                tracing::info!(partition = %name, "deleted stale partition");
                deleted.push(name);
            }
        }

        Ok(deleted)
    }

    /// Enforce the entry bound of a partition, oldest first.
    pub async fn trim(&self, name: &PartitionName, max_entries: usize) -> u64 {
        match self.storage.trim(&name.to_string(), max_entries).await {
            Ok(0) => 0,
            Ok(evicted) => {
                tracing::debug!(partition = %name, evicted, max_entries, "trimmed partition");
                evicted
            }
            Err(e) => {
                tracing::warn!(partition = %name, error = %e, "cache trim failed");
                0
            }
        }
    }

    /// Delete every partition unconditionally. Returns how many were deleted.
    pub async fn clear(&self) -> Result<usize, Error> {
        let mut deleted = 0;
        for name in self.storage.partitions().await? {
            if self.storage.delete_partition(&name).await? {
                deleted += 1;
            }
        }
        tracing::info!(deleted, "cleared all partitions");
        Ok(deleted)
    }

    /// Sum of entry counts across every partition.
    pub async fn total_entries(&self) -> Result<u64, Error> {
        self.storage.count(None).await
    }

    pub async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.storage.partitions().await
    }

    pub async fn keys(&self, name: &PartitionName) -> Result<Vec<RequestKey>, Error> {
        self.storage.keys(&name.to_string()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, PartitionRole};
    use crate::http::ResponseType;
    use url::Url;

    fn name(role: PartitionRole, version: &str) -> PartitionName {
        PartitionName::new("arca", role, version)
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse("https://app.test").unwrap().join(path).unwrap())
    }

    async fn manager() -> (CacheManager, CacheDb) {
        let db = CacheDb::open_in_memory().await.unwrap();
        (CacheManager::new(Arc::new(db.clone())), db)
    }

    #[tokio::test]
    async fn test_put_only_basic_200() {
        let (cache, _) = manager().await;
        let dynamic = name(PartitionRole::Dynamic, "1.0.0");

        assert!(cache.put(&dynamic, &get("/ok"), &Response::new(200, "ok")).await);
        assert!(!cache.put(&dynamic, &get("/missing"), &Response::new(404, "")).await);
        assert!(
            !cache
                .put(&dynamic, &get("/cdn"), &Response::new(200, "x").with_type(ResponseType::Opaque))
                .await
        );
        assert_eq!(cache.total_entries().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_skips_non_get() {
        let (cache, _) = manager().await;
        let dynamic = name(PartitionRole::Dynamic, "1.0.0");
        let post = Request::new(crate::http::Method::Post, Url::parse("https://app.test/api/login/").unwrap());

        assert!(!cache.put(&dynamic, &post, &Response::new(200, "ok")).await);
        assert_eq!(cache.total_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_swallows_quota_error() {
        let (cache, db) = manager().await;
        db.set_quota(64 * 1024).await.unwrap();
        let dynamic = name(PartitionRole::Dynamic, "1.0.0");

        let stored = cache
            .put(&dynamic, &get("/big.bin"), &Response::new(200, vec![7u8; 1024 * 1024]))
            .await;
        assert!(!stored);
        assert!(cache.lookup(&dynamic, &get("/big.bin")).await.is_none());
    }

    #[tokio::test]
    async fn test_stale_partition_purge() {
        let (cache, _) = manager().await;
        let v1 = name(PartitionRole::Static, "1.0.0");
        let v2 = name(PartitionRole::Static, "2.0.0");
        cache.open(&v1).await.unwrap();
        cache.open(&v2).await.unwrap();
        cache.put(&v2, &get("/static/app.css"), &Response::new(200, "body{}")).await;

        let deleted = cache.delete_stale_partitions(&[v2.to_string()]).await.unwrap();

        assert_eq!(deleted, vec!["arca-static-v1.0.0"]);
        assert_eq!(cache.partitions().await.unwrap(), vec!["arca-static-v2.0.0"]);
        assert!(cache.lookup(&v2, &get("/static/app.css")).await.is_some());
    }

    #[tokio::test]
    async fn test_fifo_eviction_bound() {
        let (cache, _) = manager().await;
        let dynamic = name(PartitionRole::Dynamic, "1.0.0");

        for i in 0..105 {
            cache
                .put(&dynamic, &get(&format!("/api/item/{i}")), &Response::new(200, format!("{i}")))
                .await;
            cache.trim(&dynamic, 100).await;
        }

        let keys = cache.keys(&dynamic).await.unwrap();
        assert_eq!(keys.len(), 100);
        for i in 0..5 {
            assert!(cache.lookup(&dynamic, &get(&format!("/api/item/{i}"))).await.is_none());
        }
        for i in 5..105 {
            assert!(cache.lookup(&dynamic, &get(&format!("/api/item/{i}"))).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (cache, _) = manager().await;
        let partitions = [
            name(PartitionRole::Static, "1.0.0"),
            name(PartitionRole::Static, "2.0.0"),
            name(PartitionRole::Dynamic, "2.0.0"),
        ];
        for i in 0..40 {
            let partition = &partitions[i % 3];
            cache.put(partition, &get(&format!("/r/{i}")), &Response::new(200, "x")).await;
        }
        assert_eq!(cache.total_entries().await.unwrap(), 40);

        assert_eq!(cache.clear().await.unwrap(), 3);
        assert!(cache.partitions().await.unwrap().is_empty());
        assert_eq!(cache.total_entries().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_put_all_rejects_unstorable() {
        let (cache, _) = manager().await;
        let static_cache = name(PartitionRole::Static, "1.0.0");
        let entries = vec![
            (get("/").key(), Response::new(200, "<html>")),
            (get("/dashboard/").key(), Response::new(500, "")),
        ];

        assert!(cache.put_all(&static_cache, entries).await.is_err());
        assert_eq!(cache.total_entries().await.unwrap(), 0);
    }
}
