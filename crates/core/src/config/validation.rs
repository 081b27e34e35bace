//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - a store prefix or version tag is empty, or both stores share a name
    /// - `api_prefix` or `offline_listing_path` does not start with `/`
    /// - `manifest` or `cacheable_api_paths` contains an empty entry
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is set below 100ms
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = url::Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        for (field, value) in [
            ("static_cache_prefix", &self.static_cache_prefix),
            ("static_cache_version", &self.static_cache_version),
            ("api_cache_prefix", &self.api_cache_prefix),
            ("api_cache_version", &self.api_cache_version),
        ] {
            if value.trim().is_empty() {
                return Err(invalid(field, "must not be empty"));
            }
        }
        if self.static_store_name() == self.api_store_name() {
            return Err(invalid("api_cache_prefix", "static and API stores must have different names"));
        }

        if !self.api_prefix.starts_with('/') {
            return Err(invalid("api_prefix", "must start with '/'"));
        }
        if !self.offline_listing_path.starts_with('/') {
            return Err(invalid("offline_listing_path", "must start with '/'"));
        }

        if self.manifest.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("manifest", "entries must not be empty"));
        }
        if self.cacheable_api_paths.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("cacheable_api_paths", "entries must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 100MB"));
        }

        if let Some(timeout_ms) = self.timeout_ms
            && timeout_ms < 100
        {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.manifest.is_empty() {
            tracing::warn!("manifest is empty; the static store starts without pre-fetched assets");
        }

        Ok(())
    }
}
