//! Network side of the proxy: request/response types and the fetcher seam.
//!
//! ### Failure model
//! - A fetch that never produced a response (offline, DNS, connection
//!   refused, transport timeout) is `Err(Error::Network)`.
//! - Any HTTP status, including 4xx/5xx, is a successful fetch. Whether a
//!   response is worth caching is the strategy's decision, not the fetcher's.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Timeout: transport level only (default 20s)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode, Url};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, canonicalize, resolve};

use wxcache_core::{AppConfig, Error, RequestKey, ResponseRecord};

/// How the request was issued by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    SameOrigin,
    NoCors,
    #[default]
    Cors,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub mode: RequestMode,
}

impl ProxyRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self { method, url, headers: HeaderMap::new(), mode }
    }

    /// A plain GET as issued by `fetch()` from page scripts.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Cors)
    }

    /// A GET issued by top-level page navigation.
    pub fn navigate(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Navigate)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity under which this request's response is cached.
    ///
    /// Built from the canonical URL, so `styles.css#top` and `styles.css`
    /// share one entry. Non-http(s) URLs keep their raw form.
    pub fn key(&self) -> RequestKey {
        let url = canonicalize(self.url.as_str()).unwrap_or_else(|_| self.url.clone());
        RequestKey::new(self.method.as_str(), url.as_str())
    }
}

/// A complete response, body fully buffered so it can be both returned and cached.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    /// The final URL after redirects
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ProxyResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn to_record(&self) -> ResponseRecord {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        ResponseRecord { url: self.url.to_string(), status: self.status.as_u16(), headers, body: self.body.clone() }
    }

    pub fn from_record(record: ResponseRecord) -> Result<Self, Error> {
        let url = Url::parse(&record.url).map_err(|e| Error::CorruptEntry(format!("url {}: {e}", record.url)))?;
        let status =
            StatusCode::from_u16(record.status).map_err(|_| Error::CorruptEntry(format!("status {}", record.status)))?;

        let mut headers = HeaderMap::with_capacity(record.headers.len());
        for (name, value) in &record.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::CorruptEntry(format!("header name {name}: {e}")))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::CorruptEntry(format!("header value {name}: {e}")))?;
            headers.append(name, value);
        }

        Ok(Self { url, status, headers, body: record.body })
    }
}

/// Anything that can put a request on the wire.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error>;
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "wxcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "wxcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
        }
    }
}

/// reqwest-backed fetcher.
pub struct HttpFetcher {
    http: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    /// Create a new fetcher with the given configuration.
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
            .map_err(|e| Error::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| Error::Network(format!("{}: {}", request.url, e)))?;

        if let Some(len) = response.content_length()
            && exceeds_limit(len, self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ProxyResponse { url, status, headers, body })
    }
}

/// True when a declared content length is over `max_bytes` or does not fit in `usize`.
fn exceeds_limit(len: u64, max_bytes: usize) -> bool {
    usize::try_from(len).map_or(true, |len| len > max_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: StatusCode) -> ProxyResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/css"));
        headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
        ProxyResponse {
            url: Url::parse("http://localhost:8080/styles.css").unwrap(),
            status,
            headers,
            body: Bytes::from_static(b"body{}"),
        }
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "wxcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "custom/1.0".into(), timeout_ms: 1_500, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "custom/1.0");
        assert_eq!(config.timeout, Duration::from_millis(1_500));
    }

    #[test]
    fn test_request_key_and_mode() {
        let url = Url::parse("http://localhost:8080/index.html").unwrap();
        let nav = ProxyRequest::navigate(url.clone());
        assert!(nav.is_navigation());
        assert_eq!(nav.key(), RequestKey::get("http://localhost:8080/index.html"));

        let post = ProxyRequest::new(Method::POST, url, RequestMode::SameOrigin);
        assert!(!post.is_navigation());
        assert!(!post.key().is_cacheable());
    }

    #[test]
    fn test_request_key_ignores_fragment_and_host_case() {
        let plain = ProxyRequest::get(Url::parse("http://localhost:8080/styles.css").unwrap());
        let anchored = ProxyRequest::get(Url::parse("http://LOCALHOST:8080/styles.css#top").unwrap());

        assert_eq!(anchored.key(), plain.key());
        assert_eq!(anchored.key().url, "http://localhost:8080/styles.css");
    }

    #[test]
    fn test_exceeds_limit() {
        assert!(!exceeds_limit(1024, 5 * 1024 * 1024));
        assert!(!exceeds_limit(5 * 1024 * 1024, 5 * 1024 * 1024));
        assert!(exceeds_limit(5 * 1024 * 1024 + 1, 5 * 1024 * 1024));
        assert!(exceeds_limit(u64::MAX, usize::MAX - 1));
    }

    #[test]
    fn test_record_conversion_keeps_status_headers_body() {
        let original = response(StatusCode::OK);
        let restored = ProxyResponse::from_record(original.to_record()).unwrap();

        assert_eq!(restored.status, StatusCode::OK);
        assert_eq!(restored.url, original.url);
        assert_eq!(restored.content_type(), Some("text/css"));
        assert_eq!(restored.headers.get(header::VARY).unwrap(), "accept-encoding");
        assert_eq!(restored.body, original.body);
    }

    #[test]
    fn test_is_success() {
        assert!(response(StatusCode::OK).is_success());
        assert!(response(StatusCode::NO_CONTENT).is_success());
        assert!(!response(StatusCode::NOT_FOUND).is_success());
        assert!(!response(StatusCode::NOT_MODIFIED).is_success());
    }

    #[test]
    fn test_from_record_rejects_bad_status() {
        let mut record = response(StatusCode::OK).to_record();
        record.status = 42;
        assert!(matches!(ProxyResponse::from_record(record), Err(Error::CorruptEntry(_))));
    }

    #[tokio::test]
    async fn test_http_fetcher_new() {
        let fetcher = HttpFetcher::new(FetchConfig::default());
        assert!(fetcher.is_ok());
    }
}
