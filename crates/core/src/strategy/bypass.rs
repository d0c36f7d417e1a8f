use super::{Served, Source, StrategyEngine};
use crate::http::Request;

impl StrategyEngine {
    /// Forward to the network untouched. Nothing is read from or written to the cache.
    pub async fn bypass(&self, request: &Request) -> Served {
        match self.network.fetch(request).await {
            Ok(response) => Served::new(response, Source::Passthrough),
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "bypassed request failed");
                self.give_up(request).await
            }
        }
    }
}
