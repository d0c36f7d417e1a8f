//! worker_message tool implementation.
//!
//! Posts a `{action, data}` message to the worker host.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use waystation_core::{MessageReply, WorkerHost, WorkerMessage};

use super::json_result;

/// Parameters for the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageParams {
    /// SKIP_WAITING, CLEAR_CACHE, GET_CACHE_SIZE, GET_VERSION or CACHE_URLS.
    pub action: String,

    /// Payload; CACHE_URLS takes `{"urls": [...]}`.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Output from the worker_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerMessageOutput {
    pub action: String,
    /// Reply posted back by the worker, for queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<MessageReply>,
}

/// Implementation of the worker_message tool.
pub async fn message_impl(host: &WorkerHost, params: WorkerMessageParams) -> Result<CallToolResult, McpError> {
    let raw = match params.data {
        Some(data) => json!({ "action": params.action, "data": data }),
        None => json!({ "action": params.action }),
    };
    let message = WorkerMessage::from_json(raw)?;
    let action = message.action().to_string();

    let reply = host.post_message(message).await?;

    json_result(&WorkerMessageOutput { action, reply })
}
