//! Caching strategies, one per [`Route`](super::Route).
//!
//! Each strategy returns where its answer came from, or the error that
//! reached the caller because no fallback applied. Only network failures
//! (see [`Error::is_network`]) fall back; store errors and anything else the
//! network layer rejects go straight to the caller.

use reqwest::Method;

use super::{Gateway, offline};
use crate::request::GatewayRequest;
use larder_core::{CacheStore, Error, ResponseSnapshot};

/// A response and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Live from the network.
    Network(ResponseSnapshot),
    /// From a cache store.
    Cached(ResponseSnapshot),
    /// Built locally because nothing else could answer.
    Synthesized(ResponseSnapshot),
}

impl Outcome {
    pub fn response(&self) -> &ResponseSnapshot {
        match self {
            Outcome::Network(r) | Outcome::Cached(r) | Outcome::Synthesized(r) => r,
        }
    }

    pub fn into_response(self) -> ResponseSnapshot {
        match self {
            Outcome::Network(r) | Outcome::Cached(r) | Outcome::Synthesized(r) => r,
        }
    }

    pub fn source(&self) -> &'static str {
        match self {
            Outcome::Network(_) => "network",
            Outcome::Cached(_) => "cache",
            Outcome::Synthesized(_) => "synthesized",
        }
    }
}

impl Gateway {
    /// Static assets: store first, network on miss.
    ///
    /// OK responses from the network are stored before being returned. A
    /// network failure on a never-cached asset goes back to the caller.
    pub(crate) async fn cache_first(&self, request: &GatewayRequest) -> Result<Outcome, Error> {
        let store = self.static_store();
        if let Some(entry) = store.match_request(request.method.as_str(), &request.url).await? {
            tracing::debug!(url = %request.url, "static cache hit");
            return Ok(Outcome::Cached(entry.response));
        }

        tracing::debug!(url = %request.url, "static cache miss");
        let response = self.network.fetch(request).await.inspect_err(|e| {
            tracing::warn!(url = %request.url, "static asset unavailable: {e}");
        })?;

        if response.is_ok() && request.method == Method::GET {
            store.put(request.method.as_str(), &request.url, &response).await?;
        }
        Ok(Outcome::Network(response))
    }

    /// API requests: network first.
    ///
    /// A non-2xx status counts as a failure, same as an unreachable network.
    /// Failures fall back to the API store, then, for the recipes listing
    /// only, to a synthesized empty listing.
    pub(crate) async fn network_first_api(&self, request: &GatewayRequest) -> Result<Outcome, Error> {
        let store = self.db.store(&self.config.api_store);

        let failure = match self.network.fetch(request).await {
            Ok(response) if response.is_ok() => {
                if request.method == Method::GET && self.config.is_cacheable_api(&request.url) {
                    store.put(request.method.as_str(), &request.url, &response).await?;
                }
                return Ok(Outcome::Network(response));
            }
            Ok(response) => Error::HttpStatus(response.status),
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(url = %request.url, "API request failed, trying cache: {failure}");

        if let Some(entry) = store.match_request(request.method.as_str(), &request.url).await? {
            return Ok(Outcome::Cached(entry.response));
        }

        if self.config.is_offline_listing(&request.url) {
            tracing::info!(url = %request.url, "serving offline recipes listing");
            return Ok(Outcome::Synthesized(offline::listing(&self.config.offline_message)));
        }

        Err(failure)
    }

    fn static_store(&self) -> CacheStore {
        self.db.store(&self.config.static_store)
    }

    /// Page loads: network first.
    ///
    /// Whatever status the network returns is passed through. When the
    /// network is unreachable, the cached root page is served, else the
    /// built-in offline page. Never fails on network errors.
    pub(crate) async fn navigation(&self, request: &GatewayRequest) -> Result<Outcome, Error> {
        let failure = match self.network.fetch(request).await {
            Ok(response) => return Ok(Outcome::Network(response)),
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(url = %request.url, "navigation offline, serving cached home page: {failure}");

        match self.static_store().match_request(Method::GET.as_str(), &self.config.root_url()).await? {
            Some(entry) => Ok(Outcome::Cached(entry.response)),
            None => Ok(Outcome::Synthesized(offline::page())),
        }
    }

    /// Everything else: network first, static store on failure.
    pub(crate) async fn network_first(&self, request: &GatewayRequest) -> Result<Outcome, Error> {
        let failure = match self.network.fetch(request).await {
            Ok(response) => return Ok(Outcome::Network(response)),
            Err(e) if e.is_network() => e,
            Err(e) => return Err(e),
        };

        match self.static_store().match_request(request.method.as_str(), &request.url).await? {
            Some(entry) => Ok(Outcome::Cached(entry.response)),
            None => Err(failure),
        }
    }
}
