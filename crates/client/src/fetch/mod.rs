//! HTTP transport for the worker.
//!
//! ### Response type
//! - Final URL on the application origin: `basic` (cacheable)
//! - Anything else: `cors` (served, never cached)
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Timeout: 20s (configurable)
//!
//! ### Failures
//! Non-2xx answers are returned as responses. Only transport failures are
//! errors: timeouts map to `FETCH_TIMEOUT`, oversized bodies to
//! `FETCH_TOO_LARGE`, everything else to `NETWORK_FAILURE`.

mod convert;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, header};
use url::Url;

use waystation_core::config::{ConfigError, WorkerConfig};
use waystation_core::{Error, Network, Request, Response};

pub use convert::{response_type_for, transport_error};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Application origin; decides which responses are `basic`.
    pub origin: Url,

    /// User agent string (default: "waystation/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl FetchConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            user_agent: "waystation/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl TryFrom<&WorkerConfig> for FetchConfig {
    type Error = ConfigError;

    fn try_from(config: &WorkerConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            origin: config.origin_url()?,
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
        })
    }
}

/// `Network` backed by reqwest.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn too_large(&self, len: usize) -> Error {
        Error::FetchTooLarge(format!("{len} bytes exceeds {}", self.config.max_bytes))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        let mut builder = self.http.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| transport_error(&request.url, e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(self.too_large(len as usize));
        }

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let headers = convert::headers(response.headers());
        let content_type = response.headers().get(header::CONTENT_TYPE).cloned();

        let body = response.bytes().await.map_err(|e| transport_error(&request.url, e))?;
        if body.len() > self.config.max_bytes {
            return Err(self.too_large(body.len()));
        }

        let response_type = response_type_for(&self.config.origin, &final_url);

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status,
            content_type = ?content_type,
            bytes = body.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Response { status, headers, body, response_type })
    }
}
