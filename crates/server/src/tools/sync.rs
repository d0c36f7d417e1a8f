//! worker_sync tool implementation.
//!
//! Delivers a background sync event to the active worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use waystation_core::{Error, WorkerHost};

use super::json_result;

/// Parameters for the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncParams {
    /// Sync tag; only the configured one (default "background-sync") does anything.
    pub tag: String,
}

/// Output from the worker_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerSyncOutput {
    pub tag: String,
    /// Whether fresh data was stored.
    pub refreshed: bool,
}

/// Implementation of the worker_sync tool.
pub async fn sync_impl(host: &WorkerHost, params: WorkerSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(Error::InvalidInput("tag cannot be empty".into()).into());
    }

    let refreshed = host.background_sync(&params.tag).await?;
    json_result(&WorkerSyncOutput { tag: params.tag, refreshed })
}
