//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFLINE_SHELL_*)
//! 2. TOML config file (if OFFLINE_SHELL_CONFIG_FILE set)
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
/// 1. Environment variables (OFFLINE_SHELL_*)
/// 2. TOML config file (if OFFLINE_SHELL_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the cache store owned by this release.
    ///
    /// Set via OFFLINE_SHELL_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Application shell URLs pre-populated at setup, in order.
    ///
    /// Paths are resolved against `origin`. Usually set in the TOML file.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Path prefix routed network-only with the offline fallback.
    ///
    /// Set via OFFLINE_SHELL_API_PREFIX environment variable.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Origin the application is served from.
    ///
    /// Set via OFFLINE_SHELL_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Message placed in the synthetic offline payload.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Path to SQLite cache database.
    ///
    /// Set via OFFLINE_SHELL_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFLINE_SHELL_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Transport timeout in milliseconds.
    ///
    /// Set via OFFLINE_SHELL_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_version_tag() -> String {
    "atc-v1".into()
}

fn default_manifest() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_origin() -> String {
    "http://localhost:8000".into()
}

fn default_offline_message() -> String {
    "You appear to be offline.".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offline-shell-cache.sqlite")
}

fn default_user_agent() -> String {
    "offline-shell/0.1".into()
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            manifest: default_manifest(),
            api_prefix: default_api_prefix(),
            origin: default_origin(),
            offline_message: default_offline_message(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFLINE_SHELL_`
    /// 2. TOML file from `OFFLINE_SHELL_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("OFFLINE_SHELL_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFLINE_SHELL_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parsed `origin`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let url = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version_tag, "atc-v1");
        assert_eq!(config.manifest, vec!["/", "/index.html", "/manifest.json"]);
        assert_eq!(config.api_prefix, "/api/");
        assert_eq!(config.origin, "http://localhost:8000");
        assert_eq!(config.offline_message, "You appear to be offline.");
        assert_eq!(config.db_path, PathBuf::from("./offline-shell-cache.sqlite"));
        assert_eq!(config.user_agent, "offline-shell/0.1");
        assert_eq!(config.timeout_ms, 20_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        assert_eq!(config.origin_url().unwrap().as_str(), "http://localhost:8000/");

        let config = AppConfig { origin: "ftp://example.com".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "shell.toml",
                r#"
                version_tag = "atc-v7"
                manifest = ["/", "/app.js"]
                "#,
            )?;
            jail.set_env("OFFLINE_SHELL_CONFIG_FILE", "shell.toml");
            jail.set_env("OFFLINE_SHELL_VERSION_TAG", "atc-v8");
            jail.set_env("OFFLINE_SHELL_TIMEOUT_MS", "5000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.version_tag, "atc-v8");
            assert_eq!(config.manifest, vec!["/", "/app.js"]);
            assert_eq!(config.timeout_ms, 5000);
            assert_eq!(config.api_prefix, "/api/");
            Ok(())
        });
    }
}
