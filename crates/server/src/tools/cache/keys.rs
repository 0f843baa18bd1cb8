//! cache_keys tool implementation.
//!
//! Lists every cache store in creation order.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};
use wxcache_client::Proxy;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSummary {
    pub name: String,
    pub entries: usize,
    /// True for the store of the running version.
    pub current: bool,
}

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheKeysOutput {
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(proxy: &Proxy) -> Result<CallToolResult, McpError> {
    let storage = proxy.storage();
    let mut stores = Vec::new();

    for name in storage.store_names().await? {
        let entries = storage.store(&name).keys().await?.len();
        let current = name == proxy.cache_name();
        stores.push(StoreSummary { name, entries, current });
    }

    json_result(&CacheKeysOutput { stores })
}
