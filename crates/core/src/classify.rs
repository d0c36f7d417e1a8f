//! Request Classifier.
//!
//! Maps a request to a partition and a strategy. Rules are evaluated in
//! order and the first match wins; the last rule matches everything, so
//! every request is classified.

use std::collections::HashSet;

use serde::Serialize;
use url::Url;

use crate::cache::PartitionRole;
use crate::config::{ConfigError, WorkerConfig};
use crate::http::{Request, canonicalize, url::same_origin};
use crate::strategy::Strategy;

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Static,
    Dynamic,
    /// Not intercepted; straight to the network.
    Bypass,
}

impl Target {
    pub fn role(&self) -> Option<PartitionRole> {
        match self {
            Target::Static => Some(PartitionRole::Static),
            Target::Dynamic => Some(PartitionRole::Dynamic),
            Target::Bypass => None,
        }
    }
}

/// Outcome of classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Route {
    pub target: Target,
    pub strategy: Strategy,
}

impl Route {
    const BYPASS: Route = Route { target: Target::Bypass, strategy: Strategy::Bypass };
}

/// Rule table compiled from configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    /// Pathnames of the pre-cache manifest; the query string is not part of membership.
    manifest: HashSet<String>,
    static_prefix: String,
    dynamic_api_prefixes: Vec<String>,
    bypass_prefixes: Vec<String>,
    excluded_schemes: Vec<String>,
}

impl Classifier {
    pub fn new(config: &WorkerConfig) -> Result<Self, ConfigError> {
        let origin = config.origin_url()?;
        let manifest = config
            .static_manifest
            .iter()
            .map(|entry| {
                canonicalize(entry, &origin)
                    .map(|u| u.path().to_string())
                    .map_err(|e| ConfigError::Invalid { field: "static_manifest".into(), reason: e.to_string() })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            origin,
            manifest,
            static_prefix: config.static_prefix.clone(),
            dynamic_api_prefixes: config.dynamic_api_prefixes.clone(),
            bypass_prefixes: config.bypass_prefixes.clone(),
            excluded_schemes: config.excluded_schemes.clone(),
        })
    }

    /// Classify a request.
    ///
    /// 1. non-GET → bypass
    /// 2. excluded scheme or administrative prefix → bypass
    /// 3. static manifest or static prefix → static, cache-first
    /// 4. cross-origin → bypass
    /// 5. dynamic-API prefix → dynamic, network-first
    /// 6. `Accept: text/html` or a document destination → bypass (documents are never cached)
    /// 7. anything else → dynamic, stale-while-revalidate
    pub fn classify(&self, request: &Request) -> Route {
        if !request.method.is_retrieval() {
            return Route::BYPASS;
        }

        let url = &request.url;
        if self.excluded_schemes.iter().any(|s| s == url.scheme()) {
            return Route::BYPASS;
        }

        let same_origin = same_origin(url, &self.origin);
        let path = url.path();

        if same_origin && self.bypass_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Route::BYPASS;
        }

        if same_origin && (self.manifest.contains(path) || path.starts_with(self.static_prefix.as_str())) {
            return Route { target: Target::Static, strategy: Strategy::CacheFirst };
        }

        if !same_origin {
            return Route::BYPASS;
        }

        if self.dynamic_api_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return Route { target: Target::Dynamic, strategy: Strategy::NetworkFirst };
        }

        if request.accepts_html() || request.destination.is_navigable() {
            return Route::BYPASS;
        }

        Route { target: Target::Dynamic, strategy: Strategy::StaleWhileRevalidate }
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }
}
