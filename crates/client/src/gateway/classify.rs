//! Request classification.
//!
//! Pure functions of the request and the gateway configuration. Order of the
//! checks is the routing precedence: scheme, API prefix, destination, mode.

use serde::{Deserialize, Serialize};
use url::Url;

use super::GatewayConfig;
use crate::request::{GatewayRequest, RequestMode};

/// Where an intercepted request is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Non-HTTP scheme; left to the runtime.
    Passthrough,
    /// Network first, API store fallback, synthesized listing body.
    Api,
    /// Cache first, network on miss.
    StaticAsset,
    /// Network first, cached root page or offline HTML.
    Navigation,
    /// Network first, cache fallback.
    Default,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Passthrough => "passthrough",
            Route::Api => "api",
            Route::StaticAsset => "static_asset",
            Route::Navigation => "navigation",
            Route::Default => "default",
        }
    }
}

impl GatewayConfig {
    /// Pick the route for a request.
    ///
    /// An image fetched from under the API prefix is routed as API.
    pub fn classify(&self, request: &GatewayRequest) -> Route {
        if !request.is_http() {
            Route::Passthrough
        } else if request.url.path().starts_with(&self.api_prefix) {
            Route::Api
        } else if request.destination.is_static_asset() {
            Route::StaticAsset
        } else if request.mode == RequestMode::Navigate {
            Route::Navigation
        } else {
            Route::Default
        }
    }

    /// Whether a successful API response for this URL should be stored.
    pub fn is_cacheable_api(&self, url: &Url) -> bool {
        let url = url.as_str();
        self.cacheable_api_paths.iter().any(|p| url.contains(p.as_str()))
    }

    /// Whether this URL is the recipes-listing endpoint.
    ///
    /// Query strings (filters, paging) don't matter; sub-resources such as a
    /// single recipe do.
    pub fn is_offline_listing(&self, url: &Url) -> bool {
        let listing = self.offline_listing_path.trim_end_matches('/');
        url.path().trim_end_matches('/') == listing
    }
}
