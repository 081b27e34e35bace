//! gateway_install and gateway_activate tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use larder_client::Gateway;

/// Output from the gateway_install tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    /// Lifecycle state after the call.
    pub state: String,
    /// Asset URLs now in the static store.
    pub assets: Vec<String>,
    /// Stores deleted by an activation that followed the install, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_stores: Option<Vec<String>>,
}

/// Output from the gateway_activate tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub state: String,
    pub deleted_stores: Vec<String>,
}

pub async fn install_impl(gateway: &Gateway) -> Result<CallToolResult, McpError> {
    let report = gateway.install().await?;
    let output = InstallOutput {
        state: gateway.state().await.as_str().to_string(),
        assets: report.assets,
        deleted_stores: report.activation.map(|a| a.deleted_stores),
    };
    json_result(&output)
}

pub async fn activate_impl(gateway: &Gateway) -> Result<CallToolResult, McpError> {
    let report = gateway.activate().await?;
    let output = ActivateOutput { state: gateway.state().await.as_str().to_string(), deleted_stores: report.deleted_stores };
    json_result(&output)
}
