//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OUTPOST_*)
//! 2. TOML config file (if OUTPOST_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! `cache_name` is the versioned identity of the current generation. It is
//! set once per build, read-only afterwards, and bumping it is the sole
//! mechanism that supersedes old generations.

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
/// 1. Environment variables (OUTPOST_*)
/// 2. TOML config file (if OUTPOST_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version-stamped name of the current cache generation.
    ///
    /// Set via OUTPOST_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Path to the SQLite generation store.
    ///
    /// Set via OUTPOST_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin the manifest and fallback paths resolve against.
    ///
    /// Set via OUTPOST_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Reserved path prefix that marks a request as an API call.
    ///
    /// Set via OUTPOST_API_PREFIX environment variable.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Application shell root document, the fallback of last resort.
    ///
    /// Set via OUTPOST_SHELL_URL environment variable.
    #[serde(default = "default_shell_url")]
    pub shell_url: String,

    /// Offline fallback document for failed navigations.
    ///
    /// Set via OUTPOST_OFFLINE_URL environment variable.
    #[serde(default = "default_offline_url")]
    pub offline_url: String,

    /// Static manifest: every URL essential for offline operation.
    ///
    /// Set via OUTPOST_MANIFEST environment variable.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Storage quota in bytes; None models a host without usage estimation
    /// and disables the quota guard.
    ///
    /// Set via OUTPOST_QUOTA_LIMIT_BYTES environment variable.
    #[serde(default = "default_quota_limit_bytes")]
    pub quota_limit_bytes: Option<u64>,

    /// Fraction of the quota at which eviction triggers.
    ///
    /// Set via OUTPOST_QUOTA_TRIGGER_RATIO environment variable.
    #[serde(default = "default_quota_trigger_ratio")]
    pub quota_trigger_ratio: f64,

    /// User-Agent string for network fetches.
    ///
    /// Set via OUTPOST_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OUTPOST_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network fetch timeout in milliseconds.
    ///
    /// Set via OUTPOST_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_name() -> String {
    "outpost-cache-v1".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./outpost-cache.sqlite")
}

fn default_origin() -> String {
    "http://localhost:3000".into()
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_shell_url() -> String {
    "/".into()
}

fn default_offline_url() -> String {
    "/offline.html".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/offline.html".into()]
}

fn default_quota_limit_bytes() -> Option<u64> {
    Some(50 * 1024 * 1024)
}

fn default_quota_trigger_ratio() -> f64 {
    0.9
}

fn default_user_agent() -> String {
    "outpost/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            db_path: default_db_path(),
            origin: default_origin(),
            api_prefix: default_api_prefix(),
            shell_url: default_shell_url(),
            offline_url: default_offline_url(),
            manifest: default_manifest(),
            quota_limit_bytes: default_quota_limit_bytes(),
            quota_trigger_ratio: default_quota_trigger_ratio(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve a manifest or fallback path against the configured origin.
    ///
    /// Absolute URLs pass through untouched.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the origin or the path cannot be
    /// combined into a URL.
    pub fn resolve(&self, path: &str) -> Result<String, ConfigError> {
        let base = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        let joined = base
            .join(path)
            .map_err(|e| ConfigError::Invalid { field: "manifest".into(), reason: format!("{path}: {e}") })?;
        Ok(joined.to_string())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OUTPOST_`
    /// 2. TOML file from `OUTPOST_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("OUTPOST_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OUTPOST_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_name, "outpost-cache-v1");
        assert_eq!(config.db_path, PathBuf::from("./outpost-cache.sqlite"));
        assert_eq!(config.api_prefix, "/api/");
        assert_eq!(config.shell_url, "/");
        assert_eq!(config.offline_url, "/offline.html");
        assert_eq!(config.manifest, vec!["/".to_string(), "/offline.html".to_string()]);
        assert_eq!(config.quota_limit_bytes, Some(50 * 1024 * 1024));
        assert_eq!(config.quota_trigger_ratio, 0.9);
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_resolve_path_against_origin() {
        let config = AppConfig { origin: "https://shop.example".into(), ..Default::default() };
        assert_eq!(config.resolve("/offline.html").unwrap(), "https://shop.example/offline.html");
    }

    #[test]
    fn test_resolve_absolute_passes_through() {
        let config = AppConfig::default();
        assert_eq!(
            config.resolve("https://cdn.example/icon.png").unwrap(),
            "https://cdn.example/icon.png"
        );
    }
}
