//! Offline Fallback Provider.
//!
//! The last stop when neither cache nor network produced a response.
//! Never fails.

use url::Url;

use crate::cache::{CacheManager, PartitionName};
use crate::http::{Method, Request, RequestKey, Response};

const OFFLINE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Offline</title>
    <style>
        body { font-family: sans-serif; text-align: center; padding: 50px; }
        button { padding: 10px 20px; border: none; border-radius: 5px; cursor: pointer; }
    </style>
</head>
<body>
    <h1>You are offline</h1>
    <p>The server could not be reached. Check your connection and try again.</p>
    <button onclick="window.location.reload()">Retry</button>
</body>
</html>
"#;

#[derive(Clone)]
pub struct OfflineFallback {
    cache: CacheManager,
    static_cache: PartitionName,
    offline_page: Option<RequestKey>,
}

impl OfflineFallback {
    pub fn new(cache: CacheManager, static_cache: PartitionName, origin: &Url, offline_page: Option<&str>) -> Self {
        let offline_page = offline_page
            .and_then(|path| origin.join(path).ok())
            .map(|url| RequestKey::new(Method::Get, &url));
        Self { cache, static_cache, offline_page }
    }

    /// Synthesize a response for a request that could not be served.
    ///
    /// Documents get the cached offline page, or an inline one with status
    /// 200 so the browser renders it. Everything else gets an empty 503.
    pub async fn respond(&self, request: &Request) -> Response {
        if !request.destination.is_navigable() {
            return Response::service_unavailable();
        }

        if let Some(key) = &self.offline_page
            && let Some(page) = self.cache.lookup_key(&self.static_cache, key).await
        {
            tracing::debug!(url = %request.url, "serving cached offline page");
            return page;
        }

        tracing::debug!(url = %request.url, "serving inline offline page");
        Response::html(200, OFFLINE_HTML)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheDb, PartitionRole};
    use crate::http::Destination;
    use std::sync::Arc;

    fn origin() -> Url {
        Url::parse("https://app.test").unwrap()
    }

    async fn setup() -> (OfflineFallback, CacheManager, PartitionName) {
        let cache = CacheManager::new(Arc::new(CacheDb::open_in_memory().await.unwrap()));
        let static_cache = PartitionName::new("arca", PartitionRole::Static, "1.0.0");
        let fallback = OfflineFallback::new(cache.clone(), static_cache.clone(), &origin(), Some("/offline/"));
        (fallback, cache, static_cache)
    }

    #[tokio::test]
    async fn test_non_document_gets_empty_503() {
        let (fallback, _, _) = setup().await;
        let req = Request::get(origin().join("/static/app.js").unwrap()).with_destination(Destination::Script);

        let res = fallback.respond(&req).await;
        assert_eq!(res.status, 503);
        assert!(res.body.is_empty());
    }

    #[tokio::test]
    async fn test_document_gets_inline_page() {
        let (fallback, _, _) = setup().await;
        let req = Request::navigate(origin().join("/reports/").unwrap());

        let res = fallback.respond(&req).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.content_type(), Some("text/html; charset=utf-8"));
        assert!(String::from_utf8_lossy(&res.body).contains("offline"));
    }

    #[tokio::test]
    async fn test_document_prefers_cached_offline_page() {
        let (fallback, cache, static_cache) = setup().await;
        let offline = Request::get(origin().join("/offline/").unwrap());
        cache.put(&static_cache, &offline, &Response::html(200, "<h1>Sin conexión</h1>")).await;

        let res = fallback.respond(&Request::navigate(origin().join("/reports/").unwrap())).await;
        assert_eq!(res.body.as_ref(), "<h1>Sin conexión</h1>".as_bytes());
    }
}
