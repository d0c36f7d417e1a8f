use super::{Served, Source, StrategyEngine};
use crate::cache::PartitionName;
use crate::http::Request;

impl StrategyEngine {
    /// Serve from cache; on a miss fetch, store and return.
    pub async fn cache_first(&self, request: &Request, partition: &PartitionName) -> Served {
        if let Some(hit) = self.cache.lookup(partition, request).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Served::new(hit, Source::Cache);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                self.store(partition, request, &response).await;
                Served::new(response, Source::Network)
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache miss and network failed");
                self.give_up(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{STATIC, fixture, url};
    use crate::http::{Destination, Request, Response};
    use crate::strategy::Source;

    #[tokio::test]
    async fn test_hit_skips_network() {
        let f = fixture(100).await;
        let req = Request::get(url("/static/css/style.css"));
        f.cache.put(&f.partitions.static_cache, &req, &Response::new(200, "body{}")).await;

        let served = f.engine.execute(&req, STATIC).await;

        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.body.as_ref(), b"body{}");
        assert_eq!(f.network.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_icon_fetched_once_then_cached() {
        let f = fixture(100).await;
        let icon = url("/static/icon.png");
        f.network.respond(&icon, Response::new(200, &b"\x89PNG\r\n"[..]).with_header("content-type", "image/png"));

        let first = f.engine.execute(&Request::get(icon.clone()), STATIC).await;
        assert_eq!(first.source, Source::Network);
        assert!(f.cache.lookup(&f.partitions.static_cache, &Request::get(icon.clone())).await.is_some());

        let second = f.engine.execute(&Request::get(icon.clone()), STATIC).await;
        assert_eq!(second.source, Source::Cache);
        assert_eq!(second.response.body.as_ref(), b"\x89PNG\r\n");
        assert_eq!(f.network.calls_to(&icon), 1);
    }

    #[tokio::test]
    async fn test_non_ok_returned_not_stored() {
        let f = fixture(100).await;
        let missing = url("/static/missing.js");
        f.network.respond(&missing, Response::new(404, "not found"));

        let served = f.engine.execute(&Request::get(missing.clone()), STATIC).await;
        assert_eq!(served.response.status, 404);
        assert!(f.cache.lookup(&f.partitions.static_cache, &Request::get(missing)).await.is_none());
    }

    #[tokio::test]
    async fn test_offline_miss_gives_503() {
        let f = fixture(100).await;
        f.network.set_offline(true);

        let req = Request::get(url("/static/js/app.js")).with_destination(Destination::Script);
        let served = f.engine.execute(&req, STATIC).await;

        assert_eq!(served.source, Source::Fallback);
        assert_eq!(served.response.status, 503);
        assert!(served.response.body.is_empty());
    }
}
