//! MCP tool implementations.
//!
//! This module contains all tools exposed by the waystation server.

pub mod message;
pub mod status;
pub mod sync;
pub mod worker_fetch;

pub use message::{WorkerMessageParams, message_impl};
pub use status::status_impl;
pub use sync::{WorkerSyncParams, sync_impl};
pub use worker_fetch::{WorkerFetchParams, fetch_impl};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use waystation_core::Error;

/// Serialize a tool output as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use rmcp::model::CallToolResult;
    use url::Url;
    use waystation_core::{
        CacheDb, CacheManager, Error, Network, OfflineWorker, Request, Response, WorkerConfig, WorkerHost,
    };

    /// Network with fixed answers per URL.
    #[derive(Default)]
    pub struct CannedNetwork {
        routes: Mutex<HashMap<String, Response>>,
        offline: AtomicBool,
    }

    impl CannedNetwork {
        pub fn respond(&self, path: &str, response: Response) {
            self.routes.lock().unwrap().insert(origin().join(path).unwrap().to_string(), response);
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Network for CannedNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(Error::Network("offline".into()));
            }
            Ok(self
                .routes
                .lock()
                .unwrap()
                .get(request.url.as_str())
                .cloned()
                .unwrap_or_else(|| Response::new(404, "not found")))
        }
    }

    pub fn origin() -> Url {
        Url::parse("https://app.test").unwrap()
    }

    pub fn config(version: &str) -> WorkerConfig {
        WorkerConfig {
            version: version.into(),
            origin: origin().to_string(),
            static_manifest: vec!["/".into(), "/static/css/style.css".into()],
            ..Default::default()
        }
    }

    /// A host with version 1.0.0 installed and active.
    pub async fn deployed_host() -> (Arc<WorkerHost>, Arc<CannedNetwork>) {
        let network = Arc::new(CannedNetwork::default());
        network.respond("/", Response::html(200, "<h1>Inicio</h1>"));
        network.respond("/static/css/style.css", Response::new(200, "body{}").with_header("content-type", "text/css"));
        network.respond("/api/dashboard-data/", Response::new(200, r#"{"total":5}"#));

        let storage = Arc::new(CacheDb::open_in_memory().await.unwrap());
        let host = Arc::new(WorkerHost::new(CacheManager::new(storage.clone()), network.clone()));
        host.deploy(OfflineWorker::new(config("1.0.0"), storage, network.clone()).unwrap()).await.unwrap();
        (host, network)
    }

    pub fn text(result: &CallToolResult) -> String {
        result.content.first().and_then(|c| c.as_text()).map(|t| t.text.clone()).unwrap()
    }

    pub fn json(result: &CallToolResult) -> serde_json::Value {
        serde_json::from_str(&text(result)).unwrap()
    }
}
