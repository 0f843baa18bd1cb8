//! Test doubles shared by the proxy and weather tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use wxcache_core::{AppConfig, CacheStorage, Error};

use crate::fetch::{Fetcher, ProxyRequest, ProxyResponse};
use crate::proxy::{Proxy, ProxyConfig};

/// In-memory origin: canned responses per URL, switchable offline.
#[derive(Default)]
pub(crate) struct StubFetcher {
    routes: Mutex<HashMap<String, (u16, &'static str, String)>>,
    unreachable: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
    calls_by_url: Mutex<HashMap<String, usize>>,
}

impl StubFetcher {
    pub(crate) fn respond(&self, url: &str, status: u16, content_type: &'static str, body: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), (status, content_type, body.to_string()));
    }

    /// Every fetch of `url` is rejected, as if its host were unreachable.
    pub(crate) fn unreachable(&self, url: &str) {
        self.unreachable.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.calls_by_url.lock().unwrap().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let url = request.url.to_string();
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_by_url.lock().unwrap().entry(url.clone()).or_default() += 1;

        if self.offline.load(Ordering::SeqCst) || self.unreachable.lock().unwrap().contains(&url) {
            return Err(Error::Network(format!("{url}: connection refused")));
        }

        let (status, content_type, body) = self
            .routes
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or((404, "text/plain", "not found".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

        Ok(ProxyResponse {
            url: Url::parse(&url).unwrap(),
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: Bytes::from(body),
        })
    }
}

pub(crate) const ORIGIN: &str = "http://localhost:8080/";
pub(crate) const FONT_URL: &str =
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;600;700;800&display=swap";

/// Stub that serves every default manifest asset with 200.
pub(crate) fn serving_manifest() -> StubFetcher {
    let fetcher = StubFetcher::default();
    fetcher.respond(ORIGIN, 200, "text/html", "<!doctype html><title>Weer</title>");
    fetcher.respond(&format!("{ORIGIN}index.html"), 200, "text/html", "<!doctype html><title>Weer</title>");
    fetcher.respond(&format!("{ORIGIN}styles.css"), 200, "text/css", "body{font-family:Inter}");
    fetcher.respond(&format!("{ORIGIN}app.js"), 200, "text/javascript", "loadWeather(52.3676, 4.9041);");
    fetcher.respond(&format!("{ORIGIN}manifest.json"), 200, "application/manifest+json", "{\"name\":\"Weer\"}");
    fetcher.respond(&format!("{ORIGIN}icon-192.png"), 200, "image/png", "png-192");
    fetcher.respond(&format!("{ORIGIN}icon-512.png"), 200, "image/png", "png-512");
    fetcher.respond(FONT_URL, 200, "text/css", "@font-face{font-family:Inter}");
    fetcher
}

pub(crate) fn app_config(version: &str) -> AppConfig {
    AppConfig { cache_version: version.to_string(), ..Default::default() }
}

pub(crate) async fn proxy_with(fetcher: std::sync::Arc<StubFetcher>, config: &AppConfig) -> Proxy {
    let storage = CacheStorage::open_in_memory().await.unwrap();
    Proxy::new(storage, fetcher, ProxyConfig::from_app_config(config).unwrap())
}
