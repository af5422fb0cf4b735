//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `version_tag` is empty, and
    /// `ConfigError::Invalid` if:
    /// - `api_prefix` does not start with `/`
    /// - `origin` is not an http(s) URL
    /// - a `manifest` entry is blank or listed twice
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version_tag.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "version_tag".into(),
                hint: "Set OFFLINE_SHELL_VERSION_TAG environment variable".into(),
            });
        }

        if !self.api_prefix.starts_with('/') {
            return Err(ConfigError::Invalid { field: "api_prefix".into(), reason: "must start with '/'".into() });
        }

        self.origin_url()?;

        let mut seen = HashSet::new();
        for entry in &self.manifest {
            if entry.trim().is_empty() {
                return Err(ConfigError::Invalid { field: "manifest".into(), reason: "entries must not be empty".into() });
            }
            if !seen.insert(entry.trim()) {
                return Err(ConfigError::Invalid { field: "manifest".into(), reason: format!("duplicate entry: {entry}") });
            }
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.manifest.is_empty() {
            tracing::warn!(version_tag = %self.version_tag, "manifest is empty; setup will only create the store");
        }

        Ok(())
    }
}
