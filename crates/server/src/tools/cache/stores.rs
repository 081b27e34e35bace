//! cache_stores tool.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use larder_client::Gateway;
use larder_core::cache::StoreSummary;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStoresOutput {
    /// Lifecycle state of the gateway.
    pub state: String,
    pub static_store: String,
    pub api_store: String,
    /// Every store present on disk, current or not.
    pub stores: Vec<StoreSummary>,
}

pub async fn stores_impl(gateway: &Gateway) -> Result<CallToolResult, McpError> {
    let config = gateway.config();
    let output = CacheStoresOutput {
        state: gateway.state().await.as_str().to_string(),
        static_store: config.static_store.clone(),
        api_store: config.api_store.clone(),
        stores: gateway.db().store_summaries().await?,
    };
    json_result(&output)
}
