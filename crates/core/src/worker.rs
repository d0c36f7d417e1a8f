//! One deployed version of the offline worker.
//!
//! An `OfflineWorker` bundles the configuration of a version with its
//! partitions, classifier and strategy engine. It reacts to the lifecycle
//! events the host drives (`install`, `activate`) and to the functional
//! events (fetch, message, sync). Phase bookkeeping lives in the host.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::cache::{CacheManager, CacheStorage, PartitionSet};
use crate::classify::{Classifier, Route};
use crate::config::{ConfigError, WorkerConfig};
use crate::error::Error;
use crate::fallback::OfflineFallback;
use crate::http::{Request, canonicalize};
use crate::lifecycle::{CacheSizeReply, MessageReply, VersionReply, WorkerMessage};
use crate::network::Network;
use crate::strategy::{Served, StrategyEngine};

/// Manifest fetches in flight at once during install.
const INSTALL_CONCURRENCY: usize = 4;

pub struct OfflineWorker {
    config: WorkerConfig,
    partitions: PartitionSet,
    manifest: Vec<Url>,
    sync_url: Url,
    cache: CacheManager,
    network: Arc<dyn Network>,
    classifier: Classifier,
    engine: StrategyEngine,
}

impl OfflineWorker {
    /// Build a worker for `config` on top of shared storage and network.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the origin, a manifest entry or the sync URL
    /// cannot be resolved.
    pub fn new(
        config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
    ) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let classifier = Classifier::new(&config)?;

        let mut seen = HashSet::new();
        let mut manifest = Vec::with_capacity(config.static_manifest.len());
        for entry in &config.static_manifest {
            let url = canonicalize(entry, &origin)
                .map_err(|e| ConfigError::Invalid { field: "static_manifest".into(), reason: e.to_string() })?;
            if seen.insert(url.to_string()) {
                manifest.push(url);
            }
        }

        let sync_url = canonicalize(&config.sync_url, &origin)
            .map_err(|e| ConfigError::Invalid { field: "sync_url".into(), reason: e.to_string() })?;

        let partitions = config.partitions();
        let cache = CacheManager::new(storage);
        let fallback = OfflineFallback::new(
            cache.clone(),
            partitions.static_cache.clone(),
            &origin,
            config.offline_page.as_deref(),
        );
        let engine = StrategyEngine::new(
            cache.clone(),
            network.clone(),
            fallback,
            partitions.clone(),
            config.max_dynamic_entries,
        );

        Ok(Self { config, partitions, manifest, sync_url, cache, network, classifier, engine })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn partitions(&self) -> &PartitionSet {
        &self.partitions
    }

    pub fn skip_waiting(&self) -> bool {
        self.config.skip_waiting
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Pre-cache the static manifest.
    ///
    /// Every entry is fetched before anything is written, and the batch is
    /// stored in one transaction: either the whole manifest lands in the
    /// static partition or nothing does. Re-running install overwrites the
    /// same keys. Returns the number of entries stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if any entry cannot be fetched, does
    /// not answer a storable 200, or the batch cannot be written.
    pub async fn install(&self) -> Result<usize, Error> {
        tracing::info!(version = %self.config.version, entries = self.manifest.len(), "installing");

        let semaphore = Arc::new(Semaphore::new(INSTALL_CONCURRENCY));
        let mut join_set = JoinSet::new();

        for (index, url) in self.manifest.iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let network = self.network.clone();

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| Error::InstallFailed(e.to_string()))?;
                let request = Request::get(url);
                let response = network
                    .fetch(&request)
                    .await
                    .map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
                if !response.is_storable() {
                    return Err(Error::InstallFailed(format!("{}: answered {}", request.url, response.status)));
                }
                Ok((index, request.key(), response))
            });
        }

        let mut fetched = Vec::with_capacity(self.manifest.len());
        while let Some(joined) = join_set.join_next().await {
            let entry = joined.map_err(|e| Error::InstallFailed(e.to_string()))??;
            fetched.push(entry);
        }
        fetched.sort_by_key(|(index, _, _)| *index);

        self.cache
            .open(&self.partitions.static_cache)
            .await
            .map_err(|e| Error::InstallFailed(format!("opening {}: {e}", self.partitions.static_cache)))?;

        let stored = fetched.len();
        let entries = fetched.into_iter().map(|(_, key, response)| (key, response)).collect();
        self.cache
            .put_all(&self.partitions.static_cache, entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("storing manifest: {e}")))?;

        tracing::info!(version = %self.config.version, stored, "installed");
        Ok(stored)
    }

    /// Delete every partition that does not belong to this version.
    ///
    /// Returns the deleted partition names.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        let purged = self.cache.delete_stale_partitions(&self.partitions.current_names()).await?;
        tracing::info!(version = %self.config.version, purged = purged.len(), "activated");
        Ok(purged)
    }

    pub fn classify(&self, request: &Request) -> Route {
        self.classifier.classify(request)
    }

    /// Intercept a fetch. Always resolves to a response.
    pub async fn handle_fetch(&self, request: &Request) -> Served {
        let route = self.classify(request);
        self.engine.execute(request, route).await
    }

    /// Handle a message posted by a page.
    ///
    /// `SKIP_WAITING` changes the worker's phase, which the host owns, so
    /// here it is acknowledged without effect.
    pub async fn handle_message(&self, message: WorkerMessage) -> Result<Option<MessageReply>, Error> {
        tracing::debug!(version = %self.config.version, action = message.action(), "message received");

        match message {
            WorkerMessage::SkipWaiting => Ok(None),
            WorkerMessage::ClearCache => {
                self.cache.clear().await?;
                Ok(None)
            }
            WorkerMessage::GetCacheSize => {
                let cache_size = self.cache.total_entries().await?;
                Ok(Some(MessageReply::CacheSize(CacheSizeReply { cache_size })))
            }
            WorkerMessage::GetVersion => Ok(Some(MessageReply::Version(self.version_info()))),
            WorkerMessage::CacheUrls { urls } => {
                self.cache_urls(&urls).await;
                Ok(None)
            }
        }
    }

    /// Fetch each URL into the dynamic partition. One failing URL does not
    /// stop the others. Returns how many were stored.
    pub async fn cache_urls(&self, urls: &[String]) -> usize {
        let origin = self.classifier.origin();
        let mut stored = 0;

        for raw in urls {
            let url = match canonicalize(raw, origin) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(url = %raw, error = %e, "skipping url");
                    continue;
                }
            };
            let request = Request::get(url);
            match self.network.fetch(&request).await {
                Ok(response) => {
                    if self.engine.store(&self.partitions.dynamic_cache, &request, &response).await {
                        stored += 1;
                    }
                }
                Err(e) => tracing::warn!(url = %request.url, error = %e, "could not cache url"),
            }
        }

        tracing::info!(requested = urls.len(), stored, "cached urls");
        stored
    }

    /// Handle a background sync event.
    ///
    /// Only the configured tag does anything: a single re-fetch of the sync
    /// URL into the dynamic partition. Returns whether it was stored.
    pub async fn background_sync(&self, tag: &str) -> bool {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync tag");
            return false;
        }

        let request = Request::get(self.sync_url.clone());
        match self.network.fetch(&request).await {
            Ok(response) => {
                let stored = self.engine.store(&self.partitions.dynamic_cache, &request, &response).await;
                tracing::info!(url = %request.url, status = response.status, stored, "background sync");
                stored
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "background sync failed");
                false
            }
        }
    }

    pub fn version_info(&self) -> VersionReply {
        VersionReply {
            version: self.config.version.clone(),
            static_cache: self.partitions.static_cache.to_string(),
            dynamic_cache: self.partitions.dynamic_cache.to_string(),
        }
    }
}
