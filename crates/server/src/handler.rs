//! MCP server handler implementation.
//!
//! The tool table is the gateway's event dispatch: each tool forwards one
//! kind of event (install, activate, fetch, message) to the shared
//! [`Gateway`].
use std::sync::Arc;

use crate::tools::{
    CacheEntriesParams, CacheMatchParams, GatewayFetchParams, GatewayMessageParams, activate_impl, entries_impl,
    fetch_impl, install_impl, match_impl, message_impl, stores_impl,
};
use larder_client::Gateway;

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

#[derive(Clone)]
pub struct LarderServer {
    tool_router: ToolRouter<Self>,
    gateway: Arc<Gateway>,
}

#[tool_router]
impl LarderServer {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { tool_router: Self::tool_router(), gateway }
    }

    #[tool(description = "Pre-cache the asset manifest into the static store. Activates right away when skip-waiting is set.")]
    async fn gateway_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.gateway).await
    }

    #[tool(description = "Activate the gateway: delete every cache store that is not current and start intercepting.")]
    async fn gateway_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.gateway).await
    }

    /// Route a request through the gateway.
    ///
    /// Returns the route taken, where the answer came from, and the response.
    #[tool(
        description = "Send a request through the offline cache gateway. Returns the route, the response source (network, cache or synthesized) and the response."
    )]
    async fn gateway_fetch(&self, params: Parameters<GatewayFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.gateway, params.0).await
    }

    #[tool(description = "Post a control message (SKIP_WAITING or GET_VERSION) to the gateway.")]
    async fn gateway_message(&self, params: Parameters<GatewayMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.gateway, params.0).await
    }

    #[tool(description = "List cache stores with their entry counts and the current store names.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        stores_impl(&self.gateway).await
    }

    #[tool(description = "List the entries of one cache store (default: the current static store), without bodies.")]
    async fn cache_entries(&self, params: Parameters<CacheEntriesParams>) -> Result<CallToolResult, McpError> {
        entries_impl(&self.gateway, params.0).await
    }

    #[tool(description = "Look up the cached response for a URL without touching the network.")]
    async fn cache_match(&self, params: Parameters<CacheMatchParams>) -> Result<CallToolResult, McpError> {
        match_impl(&self.gateway, params.0).await
    }
}

impl ServerHandler for LarderServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "larder".into(),
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
