//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{CacheDeleteParams, CacheGetParams, delete_impl, get_impl, keys_impl};
use crate::tools::proxy_fetch::{ProxyFetchParams, fetch_impl};
use crate::tools::proxy_status::status_impl;
use crate::tools::weather_current::{WeatherCurrentParams, weather_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use wxcache_client::{Proxy, WeatherApi};

/// The main MCP server handler for wxcache.
///
/// Holds the one proxy instance of this process; every tool goes through it.
#[derive(Clone)]
pub struct WxCacheServer {
    proxy: Arc<Proxy>,
    weather: Arc<WeatherApi>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl WxCacheServer {
    /// Create a new server handler.
    pub fn new(proxy: Arc<Proxy>, weather: Arc<WeatherApi>) -> Self {
        Self { proxy, weather, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "Issue a request through the offline cache proxy. Relative URLs resolve against the app origin. \
                       Returns status, headers, body, the strategy applied and whether the response came from cache."
    )]
    async fn proxy_fetch(&self, params: Parameters<ProxyFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Report the proxy lifecycle state, current cache name and pending background writes.")]
    async fn proxy_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.proxy).await
    }

    #[tool(description = "List cache store names with their entry counts, marking the current version.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.proxy).await
    }

    #[tool(description = "Look up a request in the current cache store without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.proxy, params.0).await
    }

    #[tool(description = "Delete a cache store by name, including all of its entries.")]
    async fn cache_delete(&self, params: Parameters<CacheDeleteParams>) -> Result<CallToolResult, McpError> {
        delete_impl(&self.proxy, params.0).await
    }

    #[tool(
        description = "Current weather from Open-Meteo, fetched through the proxy. Geocodes `place` when given, \
                       otherwise uses latitude/longitude, defaulting to Amsterdam."
    )]
    async fn weather_current(&self, params: Parameters<WeatherCurrentParams>) -> Result<CallToolResult, McpError> {
        weather_impl(&self.proxy, &self.weather, params.0).await
    }
}

impl ServerHandler for WxCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "wxcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
