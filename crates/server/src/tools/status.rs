//! worker_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use waystation_core::WorkerHost;

use super::json_result;

/// Implementation of the worker_status tool.
pub async fn status_impl(host: &WorkerHost) -> Result<CallToolResult, McpError> {
    let status = host.status().await?;
    json_result(&status)
}
