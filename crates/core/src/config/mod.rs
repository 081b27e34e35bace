//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (LARDER_*)
//! 2. TOML config file (if LARDER_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (LARDER_*)
/// 2. TOML config file (if LARDER_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding the cache stores.
    ///
    /// Set via LARDER_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the application; manifest paths and the root page resolve
    /// against it.
    ///
    /// Set via LARDER_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Optional HTTP request timeout in milliseconds. Unset means no timeout.
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Prefix of the static store name.
    #[serde(default = "default_static_cache_prefix")]
    pub static_cache_prefix: String,

    /// Version tag of the static store. Changing it orphans the old store.
    #[serde(default = "default_cache_version")]
    pub static_cache_version: String,

    /// Prefix of the API store name.
    #[serde(default = "default_api_cache_prefix")]
    pub api_cache_prefix: String,

    /// Version tag of the API store, independent of the static one.
    #[serde(default = "default_cache_version")]
    pub api_cache_version: String,

    /// Asset paths pre-fetched into the static store at install time.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Requests whose path starts with this prefix are API requests.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// URL substrings of API responses worth persisting.
    ///
    /// Set via LARDER_CACHEABLE_API_PATHS environment variable.
    #[serde(default = "default_cacheable_api_paths")]
    pub cacheable_api_paths: Vec<String>,

    /// Path of the recipes-listing endpoint that gets a synthesized offline body.
    #[serde(default = "default_offline_listing_path")]
    pub offline_listing_path: String,

    /// Message placed in the synthesized offline listing body.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Activate right after a successful install instead of waiting.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Delay between install attempts when the manifest cannot be retrieved.
    #[serde(default = "default_install_retry_ms")]
    pub install_retry_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./larder-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_user_agent() -> String {
    "larder/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_static_cache_prefix() -> String {
    "lwebmaker-recettes".into()
}

fn default_api_cache_prefix() -> String {
    "lwebmaker-api".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/static/js/bundle.js",
        "/static/css/main.css",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_cacheable_api_paths() -> Vec<String> {
    vec!["/api/recettes".into(), "/api/auth/me".into()]
}

fn default_offline_listing_path() -> String {
    "/api/recettes".into()
}

fn default_offline_message() -> String {
    "Données hors ligne indisponibles".into()
}

fn default_true() -> bool {
    true
}

fn default_install_retry_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: None,
            static_cache_prefix: default_static_cache_prefix(),
            static_cache_version: default_cache_version(),
            api_cache_prefix: default_api_cache_prefix(),
            api_cache_version: default_cache_version(),
            manifest: default_manifest(),
            api_prefix: default_api_prefix(),
            cacheable_api_paths: default_cacheable_api_paths(),
            offline_listing_path: default_offline_listing_path(),
            offline_message: default_offline_message(),
            skip_waiting_on_install: true,
            install_retry_ms: default_install_retry_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn install_retry(&self) -> Duration {
        Duration::from_millis(self.install_retry_ms)
    }

    /// Name of the static store: prefix and version tag.
    pub fn static_store_name(&self) -> String {
        format!("{}-{}", self.static_cache_prefix, self.static_cache_version)
    }

    /// Name of the API store: prefix and version tag.
    pub fn api_store_name(&self) -> String {
        format!("{}-{}", self.api_cache_prefix, self.api_cache_version)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `LARDER_`
    /// 2. TOML file from `LARDER_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file or environment cannot be parsed,
    /// or if validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LARDER_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LARDER_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
