//! proxy_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};
use wxcache_client::Proxy;

use crate::tools::json_result;

/// Output structure for proxy_status tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyStatusOutput {
    pub state: String,
    pub controlling: bool,
    pub cache_name: String,
    pub origin: String,
    pub assets: usize,
    pub api_hosts: Vec<String>,
    /// Background cache writes not yet finished.
    pub pending_writes: usize,
}

/// Implementation of the proxy_status tool.
pub async fn status_impl(proxy: &Proxy) -> Result<CallToolResult, McpError> {
    let config = proxy.config();
    let state = proxy.state().await;

    let output = ProxyStatusOutput {
        state: state.to_string(),
        controlling: proxy.is_controlling().await,
        cache_name: config.cache_name.clone(),
        origin: config.origin.to_string(),
        assets: config.assets.len(),
        api_hosts: config.api_hosts.clone(),
        pending_writes: proxy.pending_writes(),
    };

    json_result(&output)
}
