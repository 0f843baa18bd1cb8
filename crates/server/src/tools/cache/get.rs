//! cache_get tool implementation.
//!
//! Looks a request up in the current store. Never touches the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use wxcache_client::Proxy;
use wxcache_client::fetch::resolve;
use wxcache_core::{Error, RequestKey};

use crate::tools::{BodyView, json_result};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, absolute or relative to the app origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET entries are ever stored.
    #[serde(default = "default_method")]
    pub method: String,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheGetOutput {
    pub cache_name: String,
    /// Request identity, e.g. "GET http://localhost:8080/".
    pub key: String,
    /// URL the stored response reported.
    pub response_url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    #[serde(flatten)]
    pub body: BodyView,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(proxy: &Proxy, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = resolve(&proxy.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let key = RequestKey::new(params.method.trim(), url.as_str());

    let store = proxy.current_store();
    let record = store
        .match_request(&key)
        .await?
        .ok_or_else(|| Error::CacheMiss(key.to_string()))?;

    let output = CacheGetOutput {
        cache_name: store.name().to_string(),
        key: key.to_string(),
        response_url: record.url,
        status: record.status,
        body: BodyView::new(&record.body),
        headers: record.headers,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ORIGIN, active_proxy, output_json, stub};

    #[tokio::test]
    async fn test_get_impl_missing() {
        let proxy = active_proxy(stub()).await;
        let params = CacheGetParams { url: "/nonexistent.js".to_string(), method: default_method() };

        let err = get_impl(&proxy, params).await.unwrap_err();
        assert!(err.message.starts_with("CACHE_MISS"));
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let fetcher = stub();
        let proxy = active_proxy(fetcher.clone()).await;
        let before = fetcher.calls();

        let params = CacheGetParams { url: "./styles.css".to_string(), method: default_method() };
        let result = get_impl(&proxy, params).await.unwrap();
        let json = output_json(&result);

        assert_eq!(json["key"], format!("GET {ORIGIN}styles.css"));
        assert_eq!(json["status"], 200);
        assert_eq!(json["body_text"], "body{}");
        assert_eq!(fetcher.calls(), before);
    }

    #[tokio::test]
    async fn test_get_impl_non_get_is_a_miss() {
        let proxy = active_proxy(stub()).await;
        let params = CacheGetParams { url: "./styles.css".to_string(), method: "post".to_string() };

        let err = get_impl(&proxy, params).await.unwrap_err();
        assert_eq!(err.message, format!("CACHE_MISS: POST {ORIGIN}styles.css"));
    }
}
