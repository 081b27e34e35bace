//! Control-plane messages from the page.

use serde::{Deserialize, Serialize};

use super::{Gateway, WorkerState};
use larder_core::Error;

/// A `{type: ...}` message posted to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Activate now instead of waiting.
    SkipWaiting,
    /// Ask for the active store identifier.
    GetVersion,
    /// Anything else; ignored.
    #[serde(other)]
    Unknown,
}

impl ControlMessage {
    /// Message for a bare `type` value.
    pub fn from_type(kind: &str) -> Self {
        match kind.trim() {
            "SKIP_WAITING" => ControlMessage::SkipWaiting,
            "GET_VERSION" => ControlMessage::GetVersion,
            _ => ControlMessage::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
    pub version: String,
}

impl Gateway {
    /// Handle a control message.
    ///
    /// Only `GET_VERSION` produces a reply, and it never waits on I/O.
    pub async fn handle_message(&self, message: &ControlMessage) -> Result<Option<VersionReply>, Error> {
        match message {
            ControlMessage::GetVersion => Ok(Some(VersionReply { version: self.version().to_string() })),
            ControlMessage::SkipWaiting => {
                let installed = {
                    let mut lifecycle = self.lifecycle.write().await;
                    lifecycle.skip_waiting = true;
                    lifecycle.state == WorkerState::Installed
                };
                if installed {
                    tracing::info!("skip waiting requested; activating now");
                    self.activate().await?;
                } else {
                    tracing::debug!("skip waiting recorded for the next install");
                }
                Ok(None)
            }
            ControlMessage::Unknown => {
                tracing::debug!("ignoring unknown control message");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayConfig;
    use crate::gateway::testing::{ScriptedNetwork, config, gateway, html};

    fn waiting_config() -> GatewayConfig {
        GatewayConfig { skip_waiting_on_install: false, ..config() }
    }

    #[test]
    fn test_parse_messages() {
        let skip: ControlMessage = serde_json::from_str(r#"{"type":"SKIP_WAITING"}"#).unwrap();
        let version: ControlMessage = serde_json::from_str(r#"{"type":"GET_VERSION"}"#).unwrap();
        let other: ControlMessage = serde_json::from_str(r#"{"type":"CLEAR_EVERYTHING"}"#).unwrap();
        assert_eq!(skip, ControlMessage::SkipWaiting);
        assert_eq!(version, ControlMessage::GetVersion);
        assert_eq!(other, ControlMessage::Unknown);
    }

    #[test]
    fn test_from_type() {
        assert_eq!(ControlMessage::from_type("GET_VERSION"), ControlMessage::GetVersion);
        assert_eq!(ControlMessage::from_type(" SKIP_WAITING "), ControlMessage::SkipWaiting);
        assert_eq!(ControlMessage::from_type("get_version"), ControlMessage::Unknown);
    }

    #[tokio::test]
    async fn test_get_version_replies_static_store_name() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;

        let reply = gw.handle_message(&ControlMessage::GetVersion).await.unwrap();

        assert_eq!(reply, Some(VersionReply { version: "lwebmaker-recettes-v1.0.0".into() }));
        assert_eq!(net.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_version_resolves_immediately() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;

        // a single poll must complete: no suspension point on this path
        let reply = tokio::time::timeout(std::time::Duration::ZERO, gw.handle_message(&ControlMessage::GetVersion))
            .await
            .expect("GET_VERSION should not suspend")
            .unwrap();
        assert!(reply.is_some());
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_installed_worker() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let gw = gateway(&net, waiting_config()).await;
        gw.install().await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Installed);

        let reply = gw.handle_message(&ControlMessage::SkipWaiting).await.unwrap();

        assert!(reply.is_none());
        assert_eq!(gw.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_skip_waiting_before_install_applies_later() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let gw = gateway(&net, waiting_config()).await;

        gw.handle_message(&ControlMessage::SkipWaiting).await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Parsed);

        let report = gw.install().await.unwrap();
        assert!(report.activation.is_some());
        assert_eq!(gw.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_unknown_message_ignored() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;
        assert!(gw.handle_message(&ControlMessage::Unknown).await.unwrap().is_none());
        assert_eq!(gw.state().await, WorkerState::Parsed);
    }
}
