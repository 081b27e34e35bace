//! Offline cache gateway.
//!
//! Sits between the page and the network. Every intercepted request is
//! classified into a [`Route`] and handled by one strategy, which answers
//! from the network, from one of two versioned stores, or with a body built
//! locally:
//!
//! | route          | strategy                                          |
//! |----------------|---------------------------------------------------|
//! | `api`          | network → API store → offline listing → error     |
//! | `static_asset` | static store → network (stored if OK) → error     |
//! | `navigation`   | network → cached root page → offline HTML         |
//! | `default`      | network → static store → error                    |
//!
//! Interception only starts once the gateway is active; see [`lifecycle`].

pub mod classify;
pub mod lifecycle;
pub mod message;
pub mod offline;
pub mod strategy;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

use tokio::sync::RwLock;
use url::Url;

use crate::fetch::{Network, parse_origin};
use crate::request::GatewayRequest;
use larder_core::{AppConfig, CacheDb, Error, ResponseSnapshot};

pub use classify::Route;
pub use lifecycle::{ActivationReport, InstallReport, WorkerState};
pub use message::{ControlMessage, VersionReply};
pub use strategy::Outcome;

/// Everything the gateway needs to know, fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub origin: Url,
    /// Versioned name of the static store; also the reported version.
    pub static_store: String,
    /// Versioned name of the API store.
    pub api_store: String,
    /// Asset paths pre-fetched at install.
    pub manifest: Vec<String>,
    pub api_prefix: String,
    pub cacheable_api_paths: Vec<String>,
    pub offline_listing_path: String,
    pub offline_message: String,
    pub skip_waiting_on_install: bool,
}

impl TryFrom<&AppConfig> for GatewayConfig {
    type Error = Error;

    fn try_from(config: &AppConfig) -> Result<Self, Self::Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            origin,
            static_store: config.static_store_name(),
            api_store: config.api_store_name(),
            manifest: config.manifest.clone(),
            api_prefix: config.api_prefix.clone(),
            cacheable_api_paths: config.cacheable_api_paths.clone(),
            offline_listing_path: config.offline_listing_path.clone(),
            offline_message: config.offline_message.clone(),
            skip_waiting_on_install: config.skip_waiting_on_install,
        })
    }
}

impl GatewayConfig {
    /// The application's root page, served for offline navigations.
    pub fn root_url(&self) -> Url {
        let mut root = self.origin.clone();
        root.set_path("/");
        root
    }
}

/// An intercepted request's route and result.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub route: Route,
    pub outcome: Outcome,
}

pub(crate) struct Lifecycle {
    pub(crate) state: WorkerState,
    pub(crate) skip_waiting: bool,
}

/// The gateway: one per process, shared between request handlers.
pub struct Gateway {
    config: GatewayConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    lifecycle: RwLock<Lifecycle>,
}

impl Gateway {
    pub fn new(config: GatewayConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let lifecycle = Lifecycle { state: WorkerState::Parsed, skip_waiting: config.skip_waiting_on_install };
        Self { config, db, network, lifecycle: RwLock::new(lifecycle) }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    /// Identifier of the active static store.
    pub fn version(&self) -> &str {
        &self.config.static_store
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state
    }

    /// Handle an outgoing request.
    ///
    /// Returns `None` when the request is not intercepted: the gateway is not
    /// active yet, or the scheme is not HTTP. The caller then goes to the
    /// network itself (see [`Gateway::passthrough`]).
    pub async fn handle_fetch(&self, request: &GatewayRequest) -> Result<Option<Intercepted>, Error> {
        if self.state().await != WorkerState::Active {
            tracing::debug!(url = %request.url, "gateway not active; request not intercepted");
            return Ok(None);
        }

        let route = self.config.classify(request);
        let outcome = match route {
            Route::Passthrough => return Ok(None),
            Route::Api => self.network_first_api(request).await?,
            Route::StaticAsset => self.cache_first(request).await?,
            Route::Navigation => self.navigation(request).await?,
            Route::Default => self.network_first(request).await?,
        };

        tracing::debug!(
            url = %request.url,
            route = route.as_str(),
            source = outcome.source(),
            status = outcome.response().status,
            "request handled"
        );
        Ok(Some(Intercepted { route, outcome }))
    }

    /// Plain network round-trip for requests the gateway does not intercept.
    pub async fn passthrough(&self, request: &GatewayRequest) -> Result<ResponseSnapshot, Error> {
        self.network.fetch(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{ScriptedNetwork, config, gateway, html};

    #[test]
    fn test_config_from_app_config() {
        let config = config();
        assert_eq!(config.origin.as_str(), "http://localhost:3000/");
        assert_eq!(config.static_store, "lwebmaker-recettes-v1.0.0");
        assert_eq!(config.api_store, "lwebmaker-api-v1.0.0");
        assert_eq!(config.root_url().as_str(), "http://localhost:3000/");
    }

    #[test]
    fn test_config_rejects_bad_origin() {
        let app = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(GatewayConfig::try_from(&app), Err(Error::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_not_intercepted_before_activation() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;

        let request = GatewayRequest::get(Url::parse("http://localhost:3000/api/recettes").unwrap());
        assert!(gw.handle_fetch(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_http_not_intercepted_when_active() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>root</p>"));
        let gw = gateway(&net, config()).await;
        gw.install().await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Active);

        let request = GatewayRequest::get(Url::parse("chrome-extension://abc/popup.html").unwrap());
        assert!(gw.handle_fetch(&request).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_passthrough_goes_to_network() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/api/categories", html("[]"));
        let gw = gateway(&net, config()).await;

        let request = GatewayRequest::get(Url::parse("http://localhost:3000/api/categories").unwrap());
        let response = gw.passthrough(&request).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(net.calls_to("http://localhost:3000/api/categories"), 1);
    }
}
