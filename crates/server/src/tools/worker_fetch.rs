//! worker_fetch tool implementation.
//!
//! Sends a request through the worker host, the way a controlled page's
//! fetch would be intercepted.

use std::str::FromStr;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;
use waystation_core::http::canonicalize;
use waystation_core::{Destination, Error, Method, Request, Source, WorkerHost};

use super::json_result;

/// Input parameters for worker_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchParams {
    /// Absolute URL, or a path resolved against the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Accept header, e.g. "text/html" for a page load.
    #[serde(default)]
    pub accept: Option<String>,

    /// Request destination: "document", "image", "script", "style", "font" or empty.
    #[serde(default)]
    pub destination: Option<String>,
}

/// Output structure for worker_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkerFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// HTTP status code of the response.
    pub status: u16,
    /// Where the response came from.
    pub source: Source,
    /// Content-Type header (if any).
    pub content_type: Option<String>,
    /// Body size in bytes.
    pub bytes: usize,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

fn build_request(origin: &Url, params: &WorkerFetchParams) -> Result<Request, Error> {
    let url = canonicalize(&params.url, origin)?;
    let method = match params.method.as_deref() {
        Some(m) => Method::from_str(m)?,
        None => Method::Get,
    };

    let mut request = Request::new(method, url);
    if let Some(destination) = params.destination.as_deref() {
        request = request.with_destination(Destination::from_str(destination)?);
    }
    if let Some(accept) = params.accept.as_deref() {
        request = request.with_header("accept", accept);
    }
    Ok(request)
}

/// Implementation of the worker_fetch tool.
pub async fn fetch_impl(host: &WorkerHost, origin: &Url, params: WorkerFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(origin, &params)?;
    let served = host.fetch(&request).await?;

    let response = served.response;
    let output = WorkerFetchOutput {
        url: request.url.to_string(),
        status: response.status,
        source: served.source,
        content_type: response.content_type().map(str::to_string),
        bytes: response.body.len(),
        body: String::from_utf8_lossy(&response.body).into_owned(),
    };

    json_result(&output)
}
