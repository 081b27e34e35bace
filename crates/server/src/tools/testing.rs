//! Shared fixtures for tool tests.

use std::sync::Arc;

use larder_client::gateway::testing::{self, ScriptedNetwork, html};
use larder_client::{Gateway, GatewayConfig};
use rmcp::model::CallToolResult;

/// Gateway with a one-page manifest on an in-memory database.
pub async fn gateway(skip_waiting: bool) -> (Arc<Gateway>, Arc<ScriptedNetwork>) {
    let net = ScriptedNetwork::new();
    net.respond("http://localhost:3000/", html("<p>accueil</p>"));

    let config = GatewayConfig { skip_waiting_on_install: skip_waiting, ..testing::config() };
    let gw = testing::gateway(&net, config).await;
    (Arc::new(gw), net)
}

/// Parse the JSON text content of a tool result.
pub fn output<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
