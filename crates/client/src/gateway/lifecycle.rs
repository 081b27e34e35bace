//! Install and activation.
//!
//! ```text
//! Parsed ──install──▶ Installing ──▶ Installed ──activate──▶ Activating ──▶ Active
//!    ▲                    │
//!    └──── Redundant ◀────┘ (manifest incomplete; install may be retried)
//! ```
//!
//! Install fills the static store from the manifest, all or nothing.
//! Activation deletes every store whose name is not one of the two current
//! names; it is the only eviction there is.

use serde::{Deserialize, Serialize};
use url::Url;

use super::Gateway;
use crate::fetch::resolve;
use crate::request::GatewayRequest;
use larder_core::{Error, ResponseSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Active,
    /// The last install failed.
    Redundant,
}

impl WorkerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
            WorkerState::Redundant => "redundant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallReport {
    /// Asset URLs stored in the static store.
    pub assets: Vec<String>,
    /// Present when activation followed immediately and succeeded. When it
    /// failed the gateway stays `Installed` and `activate` can be retried.
    pub activation: Option<ActivationReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationReport {
    /// Stores removed because their name is no longer current.
    pub deleted_stores: Vec<String>,
}

impl Gateway {
    async fn transition(&self, allowed: &[WorkerState], next: WorkerState) -> Result<WorkerState, Error> {
        let mut lifecycle = self.lifecycle.write().await;
        let current = lifecycle.state;
        if !allowed.contains(&current) {
            return Err(Error::InvalidState(format!(
                "cannot move from {} to {}",
                current.as_str(),
                next.as_str()
            )));
        }
        lifecycle.state = next;
        Ok(current)
    }

    async fn set_state(&self, state: WorkerState) {
        self.lifecycle.write().await.state = state;
    }

    /// Pre-populate the static store with the manifest.
    ///
    /// Every asset is attempted even after a failure so the log names all of
    /// them, but the store is only written when the whole manifest came back
    /// OK. On failure the state becomes `Redundant` and the runtime may call
    /// `install` again later.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(&[WorkerState::Parsed, WorkerState::Redundant], WorkerState::Installing)
            .await?;
        tracing::info!(store = %self.config.static_store, assets = self.config.manifest.len(), "installing");

        let batch = match self.fetch_manifest().await {
            Ok(batch) => batch,
            Err(e) => {
                self.set_state(WorkerState::Redundant).await;
                return Err(e);
            }
        };

        // put_all creates the store inside its own transaction
        if let Err(e) = self.db.store(&self.config.static_store).put_all(&batch).await {
            self.set_state(WorkerState::Redundant).await;
            return Err(e);
        }

        let skip_waiting = {
            let mut lifecycle = self.lifecycle.write().await;
            lifecycle.state = WorkerState::Installed;
            lifecycle.skip_waiting
        };
        tracing::info!(store = %self.config.static_store, "installed");

        let assets = batch.iter().map(|(url, _)| url.to_string()).collect();
        let activation = if skip_waiting {
            match self.activate().await {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::warn!(version = %self.version(), "installed, but activation failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        Ok(InstallReport { assets, activation })
    }

    async fn fetch_manifest(&self) -> Result<Vec<(Url, ResponseSnapshot)>, Error> {
        let mut batch = Vec::with_capacity(self.config.manifest.len());
        let mut failed = Vec::new();

        for path in &self.config.manifest {
            let url = match resolve(&self.config.origin, path) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(asset = %path, "invalid manifest entry: {e}");
                    failed.push(path.clone());
                    continue;
                }
            };

            match self.network.fetch(&GatewayRequest::get(url.clone())).await {
                Ok(response) if response.is_ok() => batch.push((url, response)),
                Ok(response) => {
                    tracing::warn!(asset = %url, status = response.status, "manifest asset not cached");
                    failed.push(path.clone());
                }
                Err(e) => {
                    tracing::warn!(asset = %url, "manifest asset not cached: {e}");
                    failed.push(path.clone());
                }
            }
        }

        if !failed.is_empty() {
            return Err(Error::InstallFailed(format!(
                "{} of {} manifest assets unavailable: {}",
                failed.len(),
                self.config.manifest.len(),
                failed.join(", ")
            )));
        }

        Ok(batch)
    }

    /// Drop stale stores and start intercepting.
    ///
    /// Allowed once installed; calling it again while active re-runs the
    /// sweep.
    pub async fn activate(&self) -> Result<ActivationReport, Error> {
        let previous = self
            .transition(&[WorkerState::Installed, WorkerState::Active], WorkerState::Activating)
            .await?;
        tracing::info!(version = %self.version(), "activating");

        match self.prune_stores().await {
            Ok(report) => {
                self.set_state(WorkerState::Active).await;
                tracing::info!(version = %self.version(), deleted = report.deleted_stores.len(), "active");
                Ok(report)
            }
            Err(e) => {
                self.set_state(previous).await;
                Err(e)
            }
        }
    }

    async fn prune_stores(&self) -> Result<ActivationReport, Error> {
        let current = [self.config.static_store.as_str(), self.config.api_store.as_str()];
        let mut report = ActivationReport::default();

        for name in self.db.store_names().await? {
            if current.contains(&name.as_str()) {
                continue;
            }
            if self.db.delete_store(&name).await? {
                tracing::info!(store = %name, "deleted stale store");
                report.deleted_stores.push(name);
            }
        }

        for name in current {
            self.db.open_store(name).await?;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::{FlakyDb, ScriptedNetwork, config, gateway, html, json};
    use crate::gateway::{GatewayConfig, Outcome};
    use larder_core::{AppConfig, CacheDb};

    fn full_manifest_config(skip_waiting: bool) -> GatewayConfig {
        let app = AppConfig { skip_waiting_on_install: skip_waiting, ..Default::default() };
        GatewayConfig::try_from(&app).unwrap()
    }

    fn script_manifest(net: &ScriptedNetwork) {
        for path in [
            "/",
            "/static/js/bundle.js",
            "/static/css/main.css",
            "/manifest.json",
            "/icons/icon-192x192.png",
            "/icons/icon-512x512.png",
        ] {
            net.respond(&format!("http://localhost:3000{path}"), html(path));
        }
    }

    #[tokio::test]
    async fn test_install_caches_manifest_and_activates() {
        let net = ScriptedNetwork::new();
        script_manifest(&net);
        let gw = gateway(&net, full_manifest_config(true)).await;

        let report = gw.install().await.unwrap();

        assert_eq!(report.assets.len(), 6);
        assert!(report.activation.is_some());
        assert_eq!(gw.state().await, WorkerState::Active);

        let store = gw.db().open_store("lwebmaker-recettes-v1.0.0").await.unwrap();
        assert_eq!(store.len().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_install_waits_without_skip_waiting() {
        let net = ScriptedNetwork::new();
        script_manifest(&net);
        let gw = gateway(&net, full_manifest_config(false)).await;

        let report = gw.install().await.unwrap();

        assert!(report.activation.is_none());
        assert_eq!(gw.state().await, WorkerState::Installed);

        gw.activate().await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_install_is_atomic() {
        let net = ScriptedNetwork::new();
        script_manifest(&net);
        net.respond("http://localhost:3000/icons/icon-512x512.png", ResponseSnapshot::new(404, "Not Found"));
        let gw = gateway(&net, full_manifest_config(true)).await;

        let result = gw.install().await;

        match result {
            Err(Error::InstallFailed(msg)) => assert!(msg.contains("icon-512x512.png")),
            other => panic!("expected InstallFailed, got {other:?}"),
        }
        assert_eq!(gw.state().await, WorkerState::Redundant);
        // every asset was still attempted
        assert_eq!(net.calls(), 6);

        let store = gw.db().open_store("lwebmaker-recettes-v1.0.0").await.unwrap();
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_install_retry_after_failure() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;

        net.set_offline(true);
        assert!(gw.install().await.is_err());
        assert_eq!(gw.state().await, WorkerState::Redundant);

        net.set_offline(false);
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        gw.install().await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let gw = gateway(&net, config()).await;
        gw.install().await.unwrap();

        assert!(matches!(gw.install().await, Err(Error::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_activate_before_install_rejected() {
        let net = ScriptedNetwork::new();
        let gw = gateway(&net, config()).await;
        assert!(matches!(gw.activate().await, Err(Error::InvalidState(_))));
        assert_eq!(gw.state().await, WorkerState::Parsed);
    }

    #[tokio::test]
    async fn test_activation_prunes_only_stale_stores() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let gw = gateway(&net, config()).await;
        gw.db().open_store("lwebmaker-recettes-v0.9.0").await.unwrap();
        gw.db().open_store("something-else").await.unwrap();

        let report = gw.install().await.unwrap().activation.unwrap();

        let mut deleted = report.deleted_stores.clone();
        deleted.sort();
        assert_eq!(deleted, vec!["lwebmaker-recettes-v0.9.0", "something-else"]);

        let mut names = gw.db().store_names().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["lwebmaker-api-v1.0.0", "lwebmaker-recettes-v1.0.0"]);

        let static_store = gw.db().open_store("lwebmaker-recettes-v1.0.0").await.unwrap();
        assert_eq!(static_store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_version_bump_orphans_old_api_store() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        net.respond("http://localhost:3000/api/recettes", json(r#"{"recettes":[{"titre":"Crêpes"}]}"#));
        let db = CacheDb::open_in_memory().await.unwrap();

        // old worker populates its API store
        let old = Gateway::new(config(), db.clone(), net.clone());
        old.install().await.unwrap();
        let request = GatewayRequest::get(Url::parse("http://localhost:3000/api/recettes").unwrap());
        let handled = old.handle_fetch(&request).await.unwrap().unwrap();
        assert!(matches!(handled.outcome, Outcome::Network(_)));
        let old_api = db.open_store("lwebmaker-api-v1.0.0").await.unwrap();
        assert_eq!(old_api.len().await.unwrap(), 1);

        // new worker with a bumped API version
        let bumped = GatewayConfig { api_store: "lwebmaker-api-v1.1.0".into(), ..config() };
        let new = Gateway::new(bumped, db.clone(), net.clone());
        let report = new.install().await.unwrap().activation.unwrap();

        assert_eq!(report.deleted_stores, vec!["lwebmaker-api-v1.0.0".to_string()]);
        assert!(!db.has_store("lwebmaker-api-v1.0.0").await.unwrap());
        assert!(db.has_store("lwebmaker-api-v1.1.0").await.unwrap());
        let new_api = db.open_store("lwebmaker-api-v1.1.0").await.unwrap();
        assert!(new_api.is_empty().await.unwrap());
        assert!(db.has_store("lwebmaker-recettes-v1.0.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_install_store_failure_leaves_redundant() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let (gw, disk) = FlakyDb::gateway(&net, config()).await;
        disk.refuse("INSERT", "cache_entries").await;

        let result = gw.install().await;

        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(gw.state().await, WorkerState::Redundant);
        assert!(gw.db().store("lwebmaker-recettes-v1.0.0").is_empty().await.unwrap());
        assert!(!gw.db().has_store("lwebmaker-recettes-v1.0.0").await.unwrap());

        disk.allow("INSERT", "cache_entries").await;
        gw.install().await.unwrap();
        assert_eq!(gw.state().await, WorkerState::Active);
        assert_eq!(gw.db().store("lwebmaker-recettes-v1.0.0").len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_activation_keeps_install() {
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:3000/", html("<p>home</p>"));
        let (gw, disk) = FlakyDb::gateway(&net, config()).await;
        gw.db().open_store("lwebmaker-recettes-v0.9.0").await.unwrap();
        disk.refuse("DELETE", "cache_stores").await;

        let report = gw.install().await.unwrap();

        assert_eq!(report.assets, vec!["http://localhost:3000/".to_string()]);
        assert!(report.activation.is_none());
        assert_eq!(gw.state().await, WorkerState::Installed);

        disk.allow("DELETE", "cache_stores").await;
        let activation = gw.activate().await.unwrap();
        assert_eq!(activation.deleted_stores, vec!["lwebmaker-recettes-v0.9.0".to_string()]);
        assert_eq!(gw.state().await, WorkerState::Active);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(WorkerState::Active.as_str(), "active");
        assert_eq!(serde_json::to_string(&WorkerState::Redundant).unwrap(), r#""redundant""#);
    }
}
