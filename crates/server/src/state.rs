//! Shared server state: configuration, the cache database and the version
//! registration.

use std::collections::HashSet;

use shell_client::{FetchConfig, HttpNetwork, resolve};
use shell_core::{AppConfig, CacheDb, Error, InterceptorConfig, Network};
use url::Url;

use crate::registration::{InstallOutcome, Registration};

/// State shared by every tool call.
pub struct AppState<N = HttpNetwork> {
    pub config: AppConfig,
    pub origin: Url,
    pub storage: CacheDb,
    pub registration: Registration<N, CacheDb>,
}

impl AppState {
    /// Open the configured database and build the HTTP transport.
    pub async fn open(config: AppConfig) -> Result<Self, Error> {
        let storage = CacheDb::open(&config.db_path).await?;
        Self::open_with(config, storage)
    }

    /// Build state over an already opened database.
    pub fn open_with(config: AppConfig, storage: CacheDb) -> Result<Self, Error> {
        let network = HttpNetwork::new(FetchConfig {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            ..Default::default()
        })?;
        Self::with_network(config, storage, network)
    }
}

impl<N: Network + Clone> AppState<N> {
    pub fn with_network(config: AppConfig, storage: CacheDb, network: N) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let registration = Registration::new(network, storage.clone());
        Ok(Self { config, origin, storage, registration })
    }

    /// Resolve a request target against the origin.
    pub fn resolve(&self, input: &str) -> Result<Url, Error> {
        resolve(&self.origin, input).map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// Interceptor settings from configuration, with optional overrides.
    pub fn interceptor_config(
        &self, version: Option<String>, manifest: Option<Vec<String>>,
    ) -> Result<InterceptorConfig, Error> {
        let version = version.unwrap_or_else(|| self.config.version_tag.clone());
        if version.trim().is_empty() {
            return Err(Error::InvalidInput("version cannot be empty".into()));
        }

        let entries = manifest.unwrap_or_else(|| self.config.manifest.clone());
        let mut seen = HashSet::new();
        let mut urls = Vec::with_capacity(entries.len());
        for entry in &entries {
            let url = self.resolve(entry)?;
            if !seen.insert(url.clone()) {
                return Err(Error::InvalidInput(format!("duplicate manifest entry: {url}")));
            }
            urls.push(url);
        }

        Ok(InterceptorConfig::new(version, urls)
            .with_api_prefix(self.config.api_prefix.clone())
            .with_offline_message(self.config.offline_message.clone()))
    }

    /// Install the configured version.
    pub async fn install_configured(&self) -> Result<InstallOutcome, Error> {
        let config = self.interceptor_config(None, None)?;
        self.registration.install(config).await
    }
}
