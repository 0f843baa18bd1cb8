//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WXCACHE_*)
//! 2. TOML config file (if WXCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Static assets that must be cached before a version counts as installed.
///
/// Relative entries resolve against [`AppConfig::origin`].
pub const DEFAULT_ASSETS: &[&str] = &[
    "./",
    "./index.html",
    "./styles.css",
    "./app.js",
    "./manifest.json",
    "./icon-192.png",
    "./icon-512.png",
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;600;700;800&display=swap",
];

/// Forecast and geocoding hosts whose requests always go network-first.
pub const DEFAULT_API_HOSTS: &[&str] = &["api.open-meteo.com", "geocoding-api.open-meteo.com"];

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WXCACHE_*)
/// 2. TOML config file (if WXCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite cache storage.
    ///
    /// Set via WXCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Name prefix shared by every cache store generation.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Version token of the deployed asset generation.
    ///
    /// Changing it is the only thing that replaces the cache store.
    /// Set via WXCACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the relative asset paths belong to.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Asset manifest, cached atomically on install.
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// Forecast/geocoding API hosts (subdomains match too).
    #[serde(default = "default_api_hosts")]
    pub api_hosts: Vec<String>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// This is the transport timeout; the proxy adds none of its own.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of redirects to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Manifest entries fetched in parallel during install.
    #[serde(default = "default_install_concurrency")]
    pub install_concurrency: usize,

    /// Open-Meteo forecast endpoint.
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Open-Meteo geocoding endpoint.
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./wxcache.sqlite")
}

fn default_cache_prefix() -> String {
    "weather-pwa".into()
}

fn default_cache_version() -> String {
    "v2".into()
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_assets() -> Vec<String> {
    DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect()
}

fn default_api_hosts() -> Vec<String> {
    DEFAULT_API_HOSTS.iter().map(|s| s.to_string()).collect()
}

fn default_user_agent() -> String {
    "wxcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_redirects() -> usize {
    5
}

fn default_install_concurrency() -> usize {
    4
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1/search".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            origin: default_origin(),
            assets: default_assets(),
            api_hosts: default_api_hosts(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            max_redirects: default_max_redirects(),
            install_concurrency: default_install_concurrency(),
            forecast_url: default_forecast_url(),
            geocoding_url: default_geocoding_url(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Name of the current cache store, e.g. `weather-pwa-v2`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `WXCACHE_`
    /// 2. TOML file from `WXCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WXCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WXCACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
