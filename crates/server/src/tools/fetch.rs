//! gateway_fetch tool.
//!
//! Runs one request through the gateway exactly as an intercepted page
//! request would be. Requests the gateway does not take (not yet active, or
//! a non-HTTP scheme) go straight to the network and are reported with route
//! `passthrough`.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::error::ToolError;
use larder_client::{Destination, Gateway, GatewayRequest, RequestMode, parse_method, resolve};
use larder_core::ResponseSnapshot;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination, e.g. "image", "script", "style", "document".
    #[serde(default)]
    pub destination: String,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent as-is.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GatewayFetchOutput {
    /// Route taken: api, static_asset, navigation, default or passthrough.
    pub route: String,
    /// Where the response came from: network, cache or synthesized.
    pub source: String,
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
    pub body_len: usize,
}

impl GatewayFetchOutput {
    fn new(route: &str, source: &str, response: ResponseSnapshot) -> Self {
        Self {
            route: route.to_string(),
            source: source.to_string(),
            status: response.status,
            body: response.text(),
            body_len: response.body.len(),
            status_text: response.status_text,
            headers: response.headers,
        }
    }
}

fn build_request(gateway: &Gateway, params: GatewayFetchParams) -> Result<GatewayRequest, McpError> {
    let url = resolve(&gateway.config().origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;
    let method = parse_method(&params.method)?;
    let destination: Destination = params.destination.parse().unwrap_or_default();
    let mode: RequestMode = params.mode.parse()?;

    let mut request = GatewayRequest::get(url)
        .with_method(method)
        .with_destination(destination)
        .with_mode(mode);
    for (name, value) in &params.headers {
        request = request.with_header(name, value)?;
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }
    Ok(request)
}

pub async fn fetch_impl(gateway: &Gateway, params: GatewayFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(gateway, params)?;

    let output = match gateway.handle_fetch(&request).await? {
        Some(handled) => {
            let source = handled.outcome.source();
            GatewayFetchOutput::new(handled.route.as_str(), source, handled.outcome.into_response())
        }
        None => {
            tracing::debug!(url = %request.url, "passing request through");
            GatewayFetchOutput::new("passthrough", "network", gateway.passthrough(&request).await?)
        }
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{gateway, output};
    use larder_client::gateway::testing::json;

    fn params(url: &str) -> GatewayFetchParams {
        GatewayFetchParams {
            url: url.into(),
            method: default_method(),
            destination: String::new(),
            mode: String::new(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn test_passthrough_before_install() {
        let (gw, net) = gateway(false).await;
        net.respond("http://localhost:3000/api/recettes", json("[]"));

        let out: GatewayFetchOutput = output(&fetch_impl(&gw, params("/api/recettes")).await.unwrap());
        assert_eq!(out.route, "passthrough");
        assert_eq!(out.source, "network");
        assert_eq!(out.body, "[]");
    }

    #[tokio::test]
    async fn test_offline_listing_synthesized() {
        let (gw, net) = gateway(true).await;
        gw.install().await.unwrap();
        net.set_offline(true);

        let out: GatewayFetchOutput = output(&fetch_impl(&gw, params("/api/recettes")).await.unwrap());
        assert_eq!(out.route, "api");
        assert_eq!(out.source, "synthesized");
        assert_eq!(out.status, 200);
        let body: serde_json::Value = serde_json::from_str(&out.body).unwrap();
        assert_eq!(body["offline"], true);
        assert_eq!(out.body_len, out.body.len());
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_cached_root() {
        let (gw, net) = gateway(true).await;
        gw.install().await.unwrap();
        net.set_offline(true);

        let mut p = params("/recettes/3");
        p.mode = "navigate".into();
        let out: GatewayFetchOutput = output(&fetch_impl(&gw, p).await.unwrap());
        assert_eq!(out.route, "navigation");
        assert_eq!(out.source, "cache");
        assert_eq!(out.body, "<p>accueil</p>");
    }

    #[tokio::test]
    async fn test_static_asset_route() {
        let (gw, net) = gateway(true).await;
        gw.install().await.unwrap();
        net.respond(
            "http://localhost:3000/logo.svg",
            ResponseSnapshot::new(200, "OK").with_header("Content-Type", "image/svg+xml").with_body("<svg/>"),
        );

        let mut p = params("/logo.svg");
        p.destination = "image".into();
        let first: GatewayFetchOutput = output(&fetch_impl(&gw, p.clone()).await.unwrap());
        let second: GatewayFetchOutput = output(&fetch_impl(&gw, p).await.unwrap());
        assert_eq!(first.source, "network");
        assert_eq!(second.route, "static_asset");
        assert_eq!(second.source, "cache");
    }

    #[tokio::test]
    async fn test_uncached_failure_is_error() {
        let (gw, net) = gateway(true).await;
        gw.install().await.unwrap();
        net.set_offline(true);

        let err = fetch_impl(&gw, params("/api/recettes/99")).await.unwrap_err();
        assert_eq!(err.code.0, -32004);
    }

    #[tokio::test]
    async fn test_invalid_inputs() {
        let (gw, _net) = gateway(false).await;

        let err = fetch_impl(&gw, params("")).await.unwrap_err();
        assert_eq!(err.code.0, -32602);

        let mut p = params("/");
        p.method = "GE T".into();
        assert_eq!(fetch_impl(&gw, p).await.unwrap_err().code.0, -32602);

        let mut p = params("/");
        p.mode = "teleport".into();
        assert_eq!(fetch_impl(&gw, p).await.unwrap_err().code.0, -32602);
    }
}
