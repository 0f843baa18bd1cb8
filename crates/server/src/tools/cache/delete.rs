//! cache_delete tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use wxcache_client::Proxy;
use wxcache_core::Error;

use crate::tools::json_result;

/// Parameters for the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheDeleteParams {
    /// Name of the cache store to delete.
    pub name: String,
}

/// Output from the cache_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheDeleteOutput {
    /// False when no store had that name.
    pub deleted: bool,
}

/// Implementation of the cache_delete tool.
pub async fn delete_impl(proxy: &Proxy, params: CacheDeleteParams) -> Result<CallToolResult, McpError> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("name cannot be empty".into()).into());
    }

    let deleted = proxy.storage().delete_store(name).await?;
    if deleted && name == proxy.cache_name() {
        tracing::warn!(cache = name, "deleted the current cache store; assets will be refetched on demand");
    }

    json_result(&CacheDeleteOutput { deleted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_proxy, output_json, stub};

    #[tokio::test]
    async fn test_delete_stale_store() {
        let proxy = active_proxy(stub()).await;
        proxy.storage().open_store("weather-pwa-v1").await.unwrap();

        let params = CacheDeleteParams { name: "weather-pwa-v1".to_string() };
        let json = output_json(&delete_impl(&proxy, params).await.unwrap());

        assert_eq!(json["deleted"], true);
        assert_eq!(proxy.storage().store_names().await.unwrap(), vec!["weather-pwa-v2".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_unknown_store() {
        let proxy = active_proxy(stub()).await;

        let params = CacheDeleteParams { name: "nope".to_string() };
        let json = output_json(&delete_impl(&proxy, params).await.unwrap());

        assert_eq!(json["deleted"], false);
    }

    #[tokio::test]
    async fn test_delete_empty_name() {
        let proxy = active_proxy(stub()).await;

        let params = CacheDeleteParams { name: "  ".to_string() };
        assert!(delete_impl(&proxy, params).await.is_err());
    }
}
