use super::{Served, Source, StrategyEngine};
use crate::cache::PartitionName;
use crate::http::Request;

impl StrategyEngine {
    /// Prefer the network; fall back to the cache only when the transport fails.
    ///
    /// Non-2xx answers still count as answers and are returned unchanged.
    pub async fn network_first(&self, request: &Request, partition: &PartitionName) -> Served {
        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(partition, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                if let Some(hit) = self.cache.lookup(partition, request).await {
                    tracing::info!(url = %request.url, error = %e, "network failed, serving from cache");
                    return Served::new(hit, Source::Cache);
                }
                tracing::warn!(url = %request.url, error = %e, "network failed and nothing cached");
                self.give_up(request).await
            }
        }
    }
}
