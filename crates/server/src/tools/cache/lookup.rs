//! cache_match tool.
//!
//! Looks up the entry a request would be answered with, without touching
//! the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;
use larder_client::{Gateway, parse_method, resolve};
use larder_core::{CacheEntry, Error};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Store to search. Defaults to the current static store, then the
    /// current API store.
    #[serde(default)]
    pub store: Option<String>,

    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheMatchOutput {
    pub entry: CacheEntry,
    /// Response body decoded as UTF-8, lossily.
    pub body_text: String,
}

pub async fn match_impl(gateway: &Gateway, params: CacheMatchParams) -> Result<CallToolResult, McpError> {
    let config = gateway.config();
    let url = resolve(&config.origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let method = parse_method(params.method.as_deref().unwrap_or("GET"))?;

    let stores = match params.store {
        Some(name) => {
            if !gateway.db().has_store(&name).await? {
                return Err(Error::CacheMiss(format!("no store named {name}")).into());
            }
            vec![name]
        }
        None => vec![config.static_store.clone(), config.api_store.clone()],
    };

    for name in &stores {
        let store = gateway.db().store(name);
        if let Some(entry) = store.match_request(method.as_str(), &url).await? {
            let body_text = entry.response.text();
            return json_result(&CacheMatchOutput { entry, body_text });
        }
    }

    Err(Error::CacheMiss(format!("{method} {url}")).into())
}
