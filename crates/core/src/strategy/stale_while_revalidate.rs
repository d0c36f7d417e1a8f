use super::{Served, Source, StrategyEngine};
use crate::cache::PartitionName;
use crate::http::Request;

impl StrategyEngine {
    /// Serve the cached copy at once and refresh it in the background.
    ///
    /// On a miss there is nothing to serve yet, so the network answer is
    /// awaited instead.
    pub async fn stale_while_revalidate(&self, request: &Request, partition: &PartitionName) -> Served {
        let Some(hit) = self.cache.lookup(partition, request).await else {
            return match self.network.fetch(request).await {
                Ok(response) => {
                    self.store(partition, request, &response).await;
                    Served::new(response, Source::Network)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "cache miss and network failed");
                    self.give_up(request).await
                }
            };
        };

        let engine = self.clone();
        let request = request.clone();
        let partition = partition.clone();
        let revalidation = tokio::spawn(async move {
            match engine.network.fetch(&request).await {
                Ok(response) => {
                    if engine.store(&partition, &request, &response).await {
                        tracing::debug!(url = %request.url, "revalidated");
                    }
                }
                Err(e) => tracing::debug!(url = %request.url, error = %e, "revalidation failed"),
            }
        });

        Served { response: hit, source: Source::Cache, revalidation: Some(revalidation) }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{SWR, fixture, url};
    use crate::http::{Destination, Request, Response};
    use crate::strategy::Source;

    #[tokio::test]
    async fn test_returns_cached_before_network_resolves() {
        let f = fixture(100).await;
        let avatar = url("/media/avatars/7.jpg");
        let req = Request::get(avatar.clone()).with_destination(Destination::Image);
        f.cache.put(&f.partitions.dynamic_cache, &req, &Response::new(200, "old-jpeg")).await;
        f.network.respond(&avatar, Response::new(200, "new-jpeg"));
        let gate = f.network.hold();

        let served = f.engine.execute(&req, SWR).await;

        // The refresh is still parked on the gate at this point.
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.body.as_ref(), b"old-jpeg");
        let cached = f.cache.lookup(&f.partitions.dynamic_cache, &req).await.unwrap();
        assert_eq!(cached.body.as_ref(), b"old-jpeg");

        gate.notify_one();
        served.revalidation.unwrap().await.unwrap();

        let refreshed = f.cache.lookup(&f.partitions.dynamic_cache, &req).await.unwrap();
        assert_eq!(refreshed.body.as_ref(), b"new-jpeg");
        assert_eq!(f.network.calls_to(&avatar), 1);
    }

    #[tokio::test]
    async fn test_miss_awaits_network() {
        let f = fixture(100).await;
        let font = url("/fonts/inter.woff2");
        f.network.respond(&font, Response::new(200, "woff2"));

        let served = f.engine.execute(&Request::get(font.clone()), SWR).await;

        assert_eq!(served.source, Source::Network);
        assert!(served.revalidation.is_none());
        assert!(f.cache.lookup(&f.partitions.dynamic_cache, &Request::get(font)).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_refresh_is_swallowed() {
        let f = fixture(100).await;
        let req = Request::get(url("/media/logo.svg"));
        f.cache.put(&f.partitions.dynamic_cache, &req, &Response::new(200, "<svg/>")).await;
        f.network.set_offline(true);

        let served = f.engine.execute(&req, SWR).await;
        assert_eq!(served.response.body.as_ref(), b"<svg/>");

        served.revalidation.unwrap().await.unwrap();
        let cached = f.cache.lookup(&f.partitions.dynamic_cache, &req).await.unwrap();
        assert_eq!(cached.body.as_ref(), b"<svg/>");
    }

    #[tokio::test]
    async fn test_miss_offline_gives_503() {
        let f = fixture(100).await;
        f.network.set_offline(true);

        let served = f.engine.execute(&Request::get(url("/media/chart.png")), SWR).await;
        assert_eq!(served.source, Source::Fallback);
        assert_eq!(served.response.status, 503);
    }
}
