//! larder server entry point.
//!
//! Boots the offline cache gateway and serves its tool table over stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use larder_client::{FetchClient, FetchConfig, Gateway, GatewayConfig, WorkerState};
use larder_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(origin = %config.origin, db = %config.db_path.display(), "Starting larder on stdio transport");

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    let gateway = Arc::new(Gateway::new(GatewayConfig::try_from(&config)?, db, Arc::new(network)));

    tokio::spawn(install_until_ready(gateway.clone(), config.install_retry()));

    let handler = handler::LarderServer::new(gateway);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}

/// Install at startup, retrying while the manifest cannot be fetched.
///
/// When skip-waiting is configured, a failed activation after a good install
/// is retried on the same interval.
async fn install_until_ready(gateway: Arc<Gateway>, retry: Duration) {
    loop {
        match gateway.install().await {
            Ok(report) => {
                let state = gateway.state().await;
                tracing::info!(assets = report.assets.len(), state = state.as_str(), "startup install done");
                break;
            }
            Err(e) if gateway.state().await == WorkerState::Redundant => {
                tracing::warn!(retry_ms = retry.as_millis() as u64, "install failed, will retry: {e}");
                tokio::time::sleep(retry).await;
            }
            Err(e) => {
                tracing::debug!("startup install skipped: {e}");
                return;
            }
        }
    }

    while gateway.config().skip_waiting_on_install && gateway.state().await == WorkerState::Installed {
        match gateway.activate().await {
            Ok(report) => tracing::info!(deleted = report.deleted_stores.len(), "startup activation done"),
            Err(e) => {
                tracing::warn!(retry_ms = retry.as_millis() as u64, "activation failed, will retry: {e}");
                tokio::time::sleep(retry).await;
            }
        }
    }
}
