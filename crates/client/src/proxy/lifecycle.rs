//! Install and activate: moving a cache version into control.

use serde::Serialize;
use wxcache_core::Error;

use super::Proxy;
use super::manifest::AssetManifest;

/// Where the proxy instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Idle,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    /// Controlling every request.
    Activated,
    /// Install failed; this version never takes control.
    Redundant,
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
            LifecycleState::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

impl Proxy {
    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub async fn is_controlling(&self) -> bool {
        self.state().await == LifecycleState::Activated
    }

    async fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        if *state != from {
            return Err(Error::InvalidInput(format!("cannot move from {} to {}", *state, to)));
        }
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: LifecycleState) {
        *self.state.write().await = to;
    }

    /// Cache the asset manifest into the current-version store.
    ///
    /// The store only exists afterwards if every asset was fetched with a 2xx
    /// status. On failure this instance becomes redundant and any previously
    /// installed store is left exactly as it was.
    pub async fn install(&self) -> Result<(), Error> {
        self.transition(LifecycleState::Idle, LifecycleState::Installing).await?;
        tracing::info!(cache = %self.config.cache_name, assets = self.config.assets.len(), "installing");

        match self.precache().await {
            Ok(count) => {
                self.set_state(LifecycleState::Installed).await;
                tracing::info!(cache = %self.config.cache_name, entries = count, "installed");
                Ok(())
            }
            Err(e) => {
                self.set_state(LifecycleState::Redundant).await;
                tracing::error!(cache = %self.config.cache_name, error = %e, "install failed, version discarded");
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize, Error> {
        let manifest = AssetManifest::resolve(&self.config.origin, &self.config.assets)?;
        let entries = manifest
            .fetch_all(self.fetcher.clone(), self.config.install_concurrency)
            .await?;
        let count = entries.len();
        self.storage.populate_store(&self.config.cache_name, entries).await?;
        Ok(count)
    }

    /// Evict every store but the current one, then take control of requests.
    ///
    /// Returns the names of the evicted stores.
    pub async fn activate(&self) -> Result<Vec<String>, Error> {
        self.transition(LifecycleState::Installed, LifecycleState::Activating).await?;

        match self.evict_stale_stores().await {
            Ok(evicted) => {
                self.set_state(LifecycleState::Activated).await;
                tracing::info!(cache = %self.config.cache_name, ?evicted, "activated, controlling all clients");
                Ok(evicted)
            }
            Err(e) => {
                self.set_state(LifecycleState::Installed).await;
                tracing::error!(cache = %self.config.cache_name, error = %e, "activation failed");
                Err(e)
            }
        }
    }

    async fn evict_stale_stores(&self) -> Result<Vec<String>, Error> {
        let mut evicted = Vec::new();
        for name in self.storage.store_names().await? {
            if name != self.config.cache_name {
                self.storage.delete_store(&name).await?;
                tracing::debug!(store = %name, "evicted stale cache store");
                evicted.push(name);
            }
        }
        Ok(evicted)
    }

    /// Install, then activate straight away without waiting.
    pub async fn register(&self) -> Result<(), Error> {
        self.install().await?;
        self.activate().await?;
        Ok(())
    }
}
