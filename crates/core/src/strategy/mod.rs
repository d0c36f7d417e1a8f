//! Strategy Engine.
//!
//! Executes one of four response strategies against the cache and the
//! network. Whatever happens, a strategy resolves to a `Response`: storage
//! errors are swallowed by the `CacheManager`, and a request that neither
//! the cache nor the network can answer goes to the `OfflineFallback`.

mod bypass;
mod cache_first;
mod network_first;
mod stale_while_revalidate;

use std::fmt;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::cache::{CacheManager, PartitionName, PartitionRole, PartitionSet};
use crate::classify::Route;
use crate::fallback::OfflineFallback;
use crate::http::{Request, Response};
use crate::network::Network;

/// How a request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
    Bypass,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::CacheFirst => "cache-first",
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::Bypass => "bypass",
        };
        f.write_str(s)
    }
}

/// Where the returned response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Network,
    Fallback,
    /// Forwarded without interception.
    Passthrough,
}

/// A resolved request.
#[derive(Debug)]
pub struct Served {
    pub response: Response,
    pub source: Source,
    /// Detached stale-while-revalidate refresh, if one was started.
    ///
    /// Dropping the handle does not cancel the refresh.
    pub revalidation: Option<JoinHandle<()>>,
}

impl Served {
    pub(crate) fn new(response: Response, source: Source) -> Self {
        Self { response, source, revalidation: None }
    }
}

/// Runs strategies for one worker version.
#[derive(Clone)]
pub struct StrategyEngine {
    cache: CacheManager,
    network: Arc<dyn Network>,
    fallback: OfflineFallback,
    partitions: PartitionSet,
    max_dynamic_entries: usize,
}

impl StrategyEngine {
    pub fn new(
        cache: CacheManager, network: Arc<dyn Network>, fallback: OfflineFallback, partitions: PartitionSet,
        max_dynamic_entries: usize,
    ) -> Self {
        Self { cache, network, fallback, partitions, max_dynamic_entries }
    }

    /// Answer `request` according to its route.
    pub async fn execute(&self, request: &Request, route: Route) -> Served {
        let Some(role) = route.target.role() else {
            return self.bypass(request).await;
        };
        let partition = self.partitions.name_for(role).clone();

        tracing::debug!(url = %request.url, strategy = %route.strategy, partition = %partition, "executing strategy");

        match route.strategy {
            Strategy::CacheFirst => self.cache_first(request, &partition).await,
            Strategy::NetworkFirst => self.network_first(request, &partition).await,
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request, &partition).await,
            Strategy::Bypass => self.bypass(request).await,
        }
    }

    /// Store a response and keep dynamic partitions within their bound.
    pub(crate) async fn store(&self, partition: &PartitionName, request: &Request, response: &Response) -> bool {
        let stored = self.cache.put(partition, request, response).await;
        if stored && partition.role == PartitionRole::Dynamic {
            self.cache.trim(partition, self.max_dynamic_entries).await;
        }
        stored
    }

    pub(crate) async fn give_up(&self, request: &Request) -> Served {
        Served::new(self.fallback.respond(request).await, Source::Fallback)
    }
}
