//! Offline cache proxy.
//!
//! One [`Proxy`] instance per process sits between the display client and
//! the network. Every intercepted request is classified and handled by one
//! of three strategies:
//!
//! - **API network-first**: forecast/geocoding hosts. Live response returned
//!   verbatim and never written; cached entry only as a fallback.
//! - **Navigation network-first**: page loads and `.html` paths. Live
//!   response returned, copy written in the background; cache as a fallback.
//! - **Asset cache-first**: everything else. Cached entry if present;
//!   otherwise fetched, and 2xx copies written in the background.
//!
//! ### Lifecycle
//! `install` populates the versioned cache store with the asset manifest
//! (all-or-nothing); `activate` evicts every other store and starts
//! controlling requests. Until activation requests pass straight through.
//!
//! ### Background writes
//! Cache writes never delay the response. They run as tasks on a
//! [`TaskTracker`] so shutdown can wait for them with [`Proxy::flush`].

pub mod classify;
pub mod lifecycle;
pub mod manifest;
mod strategy;

pub use classify::{Strategy, classify, is_api_host};
pub use lifecycle::LifecycleState;
pub use manifest::AssetManifest;

use std::sync::Arc;

use reqwest::Url;
use serde::Serialize;
use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;
use wxcache_core::{AppConfig, CacheStorage, CacheStore, Error};

use crate::fetch::{Fetcher, ProxyRequest, ProxyResponse};

/// Settings the proxy needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Current cache store name, e.g. `weather-pwa-v2`.
    pub cache_name: String,
    pub origin: Url,
    pub assets: Vec<String>,
    pub api_hosts: Vec<String>,
    pub install_concurrency: usize,
}

impl ProxyConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin =
            Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin {}: {e}", config.origin)))?;

        Ok(Self {
            cache_name: config.cache_name(),
            origin,
            assets: config.assets.clone(),
            api_hosts: config.api_hosts.clone(),
            install_concurrency: config.install_concurrency,
        })
    }
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
}

impl std::fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
        })
    }
}

/// Result of handling one intercepted request.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub response: ProxyResponse,
    pub source: ResponseSource,
    /// None when the proxy was not yet controlling requests.
    pub strategy: Option<Strategy>,
}

impl Intercepted {
    fn network(response: ProxyResponse, strategy: Strategy) -> Self {
        Self { response, source: ResponseSource::Network, strategy: Some(strategy) }
    }

    fn cache(response: ProxyResponse, strategy: Strategy) -> Self {
        Self { response, source: ResponseSource::Cache, strategy: Some(strategy) }
    }
}

/// The process-scoped caching proxy.
pub struct Proxy {
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    config: ProxyConfig,
    state: RwLock<LifecycleState>,
    writes: TaskTracker,
}

impl Proxy {
    pub fn new(storage: CacheStorage, fetcher: Arc<dyn Fetcher>, config: ProxyConfig) -> Self {
        Self { storage, fetcher, config, state: RwLock::new(LifecycleState::Idle), writes: TaskTracker::new() }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// Handle to the current-version store (not created by this call).
    pub fn current_store(&self) -> CacheStore {
        self.storage.store(&self.config.cache_name)
    }

    /// Number of background cache writes still running.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Handle one intercepted request.
    ///
    /// Failures surface to the caller unchanged; a cache miss on a fallback
    /// path re-raises the original network failure.
    pub async fn handle_fetch(&self, request: &ProxyRequest) -> Result<Intercepted, Error> {
        if !self.is_controlling().await {
            tracing::debug!(url = %request.url, "not controlling yet, passing through");
            let response = self.fetcher.fetch(request).await?;
            return Ok(Intercepted { response, source: ResponseSource::Network, strategy: None });
        }

        let strategy = classify(request, &self.config.api_hosts);
        tracing::debug!(method = %request.method, url = %request.url, %strategy, "intercepted request");

        match strategy {
            Strategy::ApiNetworkFirst => self.api_network_first(request).await,
            Strategy::NavigationNetworkFirst => self.navigation_network_first(request).await,
            Strategy::AssetCacheFirst => self.asset_cache_first(request).await,
        }
    }

    /// Wait until every background cache write has settled.
    ///
    /// The tracker stays closed afterwards. Writes spawned later are still
    /// tracked, and a later `flush` waits for them too. Safe to call from
    /// several tasks at once.
    pub async fn flush(&self) {
        self.writes.close();
        self.writes.wait().await;
    }
}
