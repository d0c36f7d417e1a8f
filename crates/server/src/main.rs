//! waystation server entry point.
//!
//! Loads the worker configuration, opens the cache database, deploys the
//! configured worker version and boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use waystation_client::{FetchConfig, HttpNetwork};
use waystation_core::{CacheDb, CacheManager, Network, OfflineWorker, WorkerConfig, WorkerHost};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = WorkerConfig::load().context("loading configuration")?;
    let origin = config.origin_url()?;

    tracing::info!(
        version = %config.version,
        origin = %origin,
        db_path = %config.db_path.display(),
        "Starting waystation server on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await.context("opening cache database")?;
    if let Some(quota) = config.storage_quota_bytes {
        db.set_quota(quota).await?;
    }
    let storage = Arc::new(db);

    let network: Arc<dyn Network> = Arc::new(HttpNetwork::new(FetchConfig::try_from(&config)?)?);
    let host = Arc::new(WorkerHost::new(CacheManager::new(storage.clone()), network.clone()));

    let mut signals = host.subscribe();
    tokio::spawn(async move {
        while let Ok(signal) = signals.recv().await {
            tracing::info!(?signal, "host signal");
        }
    });

    let worker = OfflineWorker::new(config, storage, network)?;
    if let Err(e) = host.deploy(worker).await {
        tracing::error!(error = %e, "deploy failed, requests pass through uncontrolled");
    }

    let handler = handler::WaystationServer::new(host, origin);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
