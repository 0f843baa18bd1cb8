//! MCP tool implementations.
//!
//! This module contains all tools exposed by the wxcache server.

pub mod cache;
pub mod proxy_fetch;
pub mod proxy_status;
pub mod weather_current;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::{Deserialize, Serialize};
use wxcache_core::Error;

/// Response body as returned to tool callers: text when it is UTF-8, base64 otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BodyView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_base64: Option<String>,
    pub bytes: usize,
}

impl BodyView {
    pub fn new(body: &[u8]) -> Self {
        match std::str::from_utf8(body) {
            Ok(text) => Self { body_text: Some(text.to_string()), body_base64: None, bytes: body.len() },
            Err(_) => Self { body_text: None, body_base64: Some(STANDARD.encode(body)), bytes: body.len() },
        }
    }
}

/// Serialize a tool output as the single text content of a successful result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
