//! Test doubles for gateway tests.
//!
//! Compiled for this crate's tests and, behind the `testing` feature, for
//! downstream crates that drive a [`Gateway`] without a real network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use larder_core::cache::hash::cache_url;
use larder_core::{AppConfig, CacheDb, Error, ResponseSnapshot};

use super::{Gateway, GatewayConfig};
use crate::fetch::Network;
use crate::request::GatewayRequest;

/// Network double answering from a fixed table.
///
/// Unknown URLs get a 404; `set_offline(true)` makes every call fail like an
/// unreachable network. URLs passed to `reject` fail with a non-network
/// error, the way the real client refuses a request it cannot send.
#[derive(Default)]
pub struct ScriptedNetwork {
    responses: Mutex<HashMap<String, ResponseSnapshot>>,
    rejected: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, response: ResponseSnapshot) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn reject(&self, url: &str) {
        self.rejected.lock().unwrap().insert(url.to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &GatewayRequest) -> Result<ResponseSnapshot, Error> {
        let url = cache_url(&request.url);
        self.calls.lock().unwrap().push(url.clone());

        if self.rejected.lock().unwrap().contains(&url) {
            return Err(Error::InvalidUrl(format!("{url}: request refused")));
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{url}: network unreachable")));
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&url)
            .cloned()
            .unwrap_or_else(|| ResponseSnapshot::new(404, "Not Found")))
    }
}

pub fn html(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, "OK")
        .with_header("Content-Type", "text/html")
        .with_body(body)
}

pub fn json(body: &str) -> ResponseSnapshot {
    ResponseSnapshot::new(200, "OK")
        .with_header("Content-Type", "application/json")
        .with_body(body)
}

/// Default configuration with the manifest reduced to the root page.
pub fn config() -> GatewayConfig {
    let app = AppConfig { manifest: vec!["/".into()], ..Default::default() };
    GatewayConfig::try_from(&app).unwrap()
}

pub async fn gateway(net: &Arc<ScriptedNetwork>, config: GatewayConfig) -> Gateway {
    let db = CacheDb::open_in_memory().await.unwrap();
    Gateway::new(config, db, net.clone())
}

/// Installed and active gateway whose static store holds the root page.
pub async fn active_gateway(net: &Arc<ScriptedNetwork>) -> Gateway {
    net.respond("http://localhost:3000/", html("<p>cached home</p>"));
    let gw = gateway(net, config()).await;
    gw.install().await.unwrap();
    gw
}

/// File-backed database whose writes can be made to fail from a second
/// connection, the way a full disk or a locked file would.
#[cfg(test)]
pub struct FlakyDb {
    dir: tempfile::TempDir,
}

#[cfg(test)]
impl FlakyDb {
    const FILE: &'static str = "larder.sqlite";

    pub async fn gateway(net: &Arc<ScriptedNetwork>, config: GatewayConfig) -> (Gateway, Self) {
        let dir = tempfile::tempdir().unwrap();
        let db = CacheDb::open(dir.path().join(Self::FILE)).await.unwrap();
        (Gateway::new(config, db, net.clone()), Self { dir })
    }

    /// Abort every `op` (`INSERT` or `DELETE`) on `table`.
    pub async fn refuse(&self, op: &'static str, table: &'static str) {
        let sql = format!(
            "CREATE TRIGGER IF NOT EXISTS refuse_{op}_{table} BEFORE {op} ON {table}
             BEGIN SELECT RAISE(ABORT, 'disk I/O error'); END;"
        );
        self.execute(sql).await;
    }

    pub async fn allow(&self, op: &'static str, table: &'static str) {
        self.execute(format!("DROP TRIGGER IF EXISTS refuse_{op}_{table};")).await;
    }

    async fn execute(&self, sql: String) {
        let conn = tokio_rusqlite::Connection::open(self.dir.path().join(Self::FILE))
            .await
            .unwrap();
        conn.call(move |conn| conn.execute_batch(&sql)).await.unwrap();
    }
}
