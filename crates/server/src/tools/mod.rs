//! MCP tool implementations.
//!
//! One tool per gateway event kind, plus two read-only cache inspectors.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod message;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub use cache::{CacheEntriesParams, CacheMatchParams, entries_impl, match_impl, stores_impl};
pub use fetch::{GatewayFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};
pub use message::{GatewayMessageParams, message_impl};

/// Encode a tool result as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(|e| ToolError::EncodeFailed(e.to_string()))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
