//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::{
    WorkerFetchParams, WorkerMessageParams, WorkerSyncParams, fetch_impl, message_impl, status_impl, sync_impl,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use url::Url;
use waystation_core::WorkerHost;

/// The main MCP server handler for waystation.
#[derive(Clone)]
pub struct WaystationServer {
    host: Arc<WorkerHost>,
    origin: Url,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl WaystationServer {
    /// Create a new server handler around a worker host.
    pub fn new(host: Arc<WorkerHost>, origin: Url) -> Self {
        Self { host, origin, tool_router: Self::tool_router() }
    }

    /// Send a request through the active worker.
    #[tool(
        description = "Fetch a URL through the offline worker. Relative URLs resolve against the app origin. Returns status, source (cache, network, fallback, passthrough), content type and body."
    )]
    async fn worker_fetch(&self, params: Parameters<WorkerFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.host, &self.origin, params.0).await
    }

    #[tool(
        description = "Post a message to the worker: SKIP_WAITING, CLEAR_CACHE, GET_CACHE_SIZE, GET_VERSION or CACHE_URLS (data: {urls})."
    )]
    async fn worker_message(&self, params: Parameters<WorkerMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.host, params.0).await
    }

    #[tool(description = "Show installing, waiting and active worker versions and the cache partitions in storage.")]
    async fn worker_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.host).await
    }

    #[tool(description = "Deliver a background sync event to the active worker.")]
    async fn worker_sync(&self, params: Parameters<WorkerSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.host, params.0).await
    }
}

impl ServerHandler for WaystationServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "waystation".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing;

    #[tokio::test]
    async fn test_lists_worker_tools() {
        let (host, _network) = testing::deployed_host().await;
        let server = WaystationServer::new(host, testing::origin());

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|t| t.name.to_string()).collect();
        names.sort();

        assert_eq!(names, vec!["worker_fetch", "worker_message", "worker_status", "worker_sync"]);
    }

    #[tokio::test]
    async fn test_server_info() {
        let (host, _network) = testing::deployed_host().await;
        let info = WaystationServer::new(host, testing::origin()).get_info();
        assert_eq!(info.server_info.name, "waystation");
        assert!(info.capabilities.tools.is_some());
    }
}
