//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (CURALINK_SW_*)
//! 2. TOML config file (if CURALINK_SW_CONFIG_FILE set)
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
/// 1. Environment variables (CURALINK_SW_*)
/// 2. TOML config file (if CURALINK_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every cache namespace.
    ///
    /// Set via CURALINK_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the pre-cache paths are resolved against.
    ///
    /// Set via CURALINK_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Name of the versioned core namespace.
    #[serde(default = "default_core_cache")]
    pub core_cache: String,

    /// Name of the versioned runtime namespace.
    #[serde(default = "default_runtime_cache")]
    pub runtime_cache: String,

    /// Paths fetched and stored in the core namespace at install time.
    ///
    /// Set via CURALINK_SW_PRECACHE_URLS environment variable.
    #[serde(default = "default_precache_urls")]
    pub precache_urls: Vec<String>,

    /// Path prefix of static assets.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Path prefix of the admin site, never intercepted.
    #[serde(default = "default_admin_prefix")]
    pub admin_prefix: String,

    /// Path prefix of the JSON API, never intercepted.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Regex searched anywhere in the path; matches are never intercepted.
    #[serde(default = "default_logout_pattern")]
    pub logout_pattern: String,

    /// User-Agent string for network fetches.
    ///
    /// Set via CURALINK_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via CURALINK_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via CURALINK_SW_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Background-sync tag that triggers the appointment sync.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Push notification presentation.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Defaults used when a push payload omits fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub default_title: String,

    #[serde(default = "default_notification_body")]
    pub default_body: String,

    #[serde(default = "default_icon")]
    pub icon: String,

    #[serde(default = "default_badge")]
    pub badge: String,

    /// Vibration pattern in milliseconds (on, off, on, ...).
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./curalink-sw-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_core_cache() -> String {
    "curalink-v1".into()
}

fn default_runtime_cache() -> String {
    "curalink-runtime-v1".into()
}

fn default_precache_urls() -> Vec<String> {
    vec!["/".into(), "/static/manifest.json".into()]
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_admin_prefix() -> String {
    "/admin/".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_logout_pattern() -> String {
    "/accounts/logout/".into()
}

fn default_user_agent() -> String {
    "curalink-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_sync_tag() -> String {
    "sync-appointments".into()
}

fn default_notification_title() -> String {
    "CuraLink Notification".into()
}

fn default_notification_body() -> String {
    "You have a new notification".into()
}

fn default_icon() -> String {
    "/static/icons/icon-192x192.png".into()
}

fn default_badge() -> String {
    "/static/icons/icon-96x96.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            default_title: default_notification_title(),
            default_body: default_notification_body(),
            icon: default_icon(),
            badge: default_badge(),
            vibrate: default_vibrate(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            origin: default_origin(),
            core_cache: default_core_cache(),
            runtime_cache: default_runtime_cache(),
            precache_urls: default_precache_urls(),
            static_prefix: default_static_prefix(),
            admin_prefix: default_admin_prefix(),
            api_prefix: default_api_prefix(),
            logout_pattern: default_logout_pattern(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            sync_tag: default_sync_tag(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed origin. Only fails on configs that skipped `validate()`.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `CURALINK_SW_`
    /// 2. TOML file from `CURALINK_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("CURALINK_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("CURALINK_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
