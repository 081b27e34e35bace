//! cache_entries tool.
//!
//! Lists what one store holds, without bodies.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;
use larder_client::Gateway;
use larder_core::{CacheEntry, Error};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesParams {
    /// Store to list (default: the current static store).
    #[serde(default)]
    pub store: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntrySummary {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub cached_at: String,
}

impl From<CacheEntry> for EntrySummary {
    fn from(entry: CacheEntry) -> Self {
        Self {
            content_type: entry.response.content_type().map(str::to_string),
            status: entry.response.status,
            body_len: entry.response.body.len(),
            url: entry.url,
            cached_at: entry.cached_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheEntriesOutput {
    pub store: String,
    pub entries: Vec<EntrySummary>,
}

pub async fn entries_impl(gateway: &Gateway, params: CacheEntriesParams) -> Result<CallToolResult, McpError> {
    let name = params.store.unwrap_or_else(|| gateway.config().static_store.clone());
    if !gateway.db().has_store(&name).await? {
        return Err(Error::CacheMiss(format!("no store named {name}")).into());
    }

    let entries = gateway.db().store(&name).entries().await?;
    json_result(&CacheEntriesOutput { store: name, entries: entries.into_iter().map(EntrySummary::from).collect() })
}
