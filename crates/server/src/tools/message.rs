//! gateway_message tool.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use larder_client::{ControlMessage, Gateway};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayMessageParams {
    /// Message type: `SKIP_WAITING` or `GET_VERSION`. Others are ignored.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Output from the gateway_message tool; empty unless a reply was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct GatewayMessageOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

pub async fn message_impl(gateway: &Gateway, params: GatewayMessageParams) -> Result<CallToolResult, McpError> {
    let message = ControlMessage::from_type(&params.kind);
    let reply = gateway.handle_message(&message).await?;
    json_result(&GatewayMessageOutput { version: reply.map(|r| r.version) })
}
