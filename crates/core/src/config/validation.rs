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
    /// - a cache name is empty, or both names are equal
    /// - `origin` is not an absolute http(s) URL
    /// - a path prefix does not start with `/`
    /// - `logout_pattern` is not a valid regex
    /// - a pre-cache entry is empty
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_cache.is_empty() {
            return Err(invalid("core_cache", "must not be empty"));
        }
        if self.runtime_cache.is_empty() {
            return Err(invalid("runtime_cache", "must not be empty"));
        }
        if self.core_cache == self.runtime_cache {
            return Err(invalid("runtime_cache", "must differ from core_cache"));
        }

        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }

        for (field, prefix) in [
            ("static_prefix", &self.static_prefix),
            ("admin_prefix", &self.admin_prefix),
            ("api_prefix", &self.api_prefix),
        ] {
            if !prefix.starts_with('/') {
                return Err(invalid(field, "must start with '/'"));
            }
        }

        if let Err(e) = regex::Regex::new(&self.logout_pattern) {
            return Err(invalid("logout_pattern", e.to_string()));
        }

        if self.precache_urls.iter().any(|u| u.trim().is_empty()) {
            return Err(invalid("precache_urls", "entries must not be empty"));
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if self.precache_urls.is_empty() {
            tracing::warn!("precache_urls is empty; the core namespace will be created with no entries");
        }

        Ok(())
    }
}
