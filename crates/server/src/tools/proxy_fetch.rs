//! proxy_fetch tool implementation.
//!
//! Routes one request through the proxy exactly as the app would issue it.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use wxcache_client::fetch::resolve;
use wxcache_client::{Method, Proxy, ProxyRequest, RequestMode, header};
use wxcache_core::Error;

use crate::tools::{BodyView, json_result};

/// Input parameters for proxy_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProxyFetchParams {
    /// Absolute URL, or a path relative to the app origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Output structure for proxy_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// URL of the response, after redirects or as stored.
    pub final_url: String,
    pub status: u16,
    /// Strategy applied; absent while the proxy is not controlling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// "network" or "cache".
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    #[serde(flatten)]
    pub body: BodyView,
}

/// Implementation of the proxy_fetch tool.
pub async fn fetch_impl(proxy: &Proxy, params: ProxyFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(proxy, &params)?;
    tracing::debug!(method = %request.method, url = %request.url, "proxy_fetch");

    let intercepted = proxy.handle_fetch(&request).await?;
    let response = &intercepted.response;

    let headers = response
        .headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
        .collect();

    let output = ProxyFetchOutput {
        url: request.url.to_string(),
        final_url: response.url.to_string(),
        status: response.status.as_u16(),
        strategy: intercepted.strategy.map(|s| s.to_string()),
        source: intercepted.source.to_string(),
        content_type: response.content_type().map(str::to_string),
        headers,
        body: BodyView::new(&response.body),
    };

    json_result(&output)
}

fn build_request(proxy: &Proxy, params: &ProxyFetchParams) -> Result<ProxyRequest, Error> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()));
    }
    let url = resolve(&proxy.config().origin, params.url.trim()).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let method = Method::from_bytes(params.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| Error::InvalidInput(format!("invalid method: {}", params.method)))?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::Cors };

    let mut request = ProxyRequest::new(method, url, mode);
    if let Some(accept) = params.accept.as_deref() {
        let value = header::HeaderValue::from_str(accept)
            .map_err(|_| Error::InvalidInput(format!("invalid accept header: {accept}")))?;
        request = request.with_header(header::ACCEPT, value);
    }
    Ok(request)
}
