//! wxcache server entry point.
//!
//! Boots the offline cache proxy (install + activate), then serves the MCP
//! tool surface on stdio. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;
use wxcache_client::{FetchConfig, HttpFetcher, Proxy, ProxyConfig, WeatherApi};
use wxcache_core::{AppConfig, CacheStorage};

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache = %config.cache_name(), db = %config.db_path.display(), "starting wxcache");

    let storage = CacheStorage::open(&config.db_path).await?;
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::from(&config))?);
    let proxy = Arc::new(Proxy::new(storage, fetcher, ProxyConfig::from_app_config(&config)?));

    if let Err(e) = proxy.register().await {
        tracing::warn!(error = %e, "offline cache not in control; requests pass straight through");
    }

    let weather = Arc::new(WeatherApi::from_app_config(&config)?);
    let handler = handler::WxCacheServer::new(proxy.clone(), weather);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    proxy.flush().await;
    tracing::info!("pending cache writes flushed, exiting");

    Ok(())
}
