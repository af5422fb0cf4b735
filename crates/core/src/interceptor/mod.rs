//! The request interceptor.
//!
//! One [`Interceptor`] exists per release version. The host drives it
//! through three entry points:
//!
//! - [`Interceptor::on_setup`]: pre-populate the version's store from the
//!   manifest. The version must not take control unless this succeeds.
//! - [`Interceptor::on_activate`]: purge every store belonging to another
//!   version, then claim open clients.
//! - [`Interceptor::on_request`] / [`Interceptor::dispatch`]: route one
//!   request through the API or asset policy.
//!
//! Each returned future is the phase's "hold open until done": the phase is
//! complete when the host has awaited it.
//!
//! ### Asset cache writes
//!
//! On a cache miss with a 2xx GET response, the copy is written to the store
//! on a detached tokio task. The response is handed back without waiting for
//! that write, and a failed write is only logged. [`FetchOutcome::cache_write`]
//! exposes the task handle for callers that want to observe it.

mod routing;

use async_trait::async_trait;
use futures_util::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use url::Url;

use crate::Error;
use crate::cache::{Cache, CacheStorage};
use crate::http::{Request, Response};
use crate::network::Network;

pub use routing::Route;

/// Immutable per-version settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorConfig {
    /// Name of the store this version owns.
    pub version_tag: String,
    /// Absolute URLs pre-populated at setup, in order.
    pub manifest: Vec<Url>,
    /// Requests whose path starts with this are routed network-only.
    pub api_prefix: String,
    /// Message carried by the synthetic offline response.
    pub offline_message: String,
}

impl InterceptorConfig {
    pub fn new(version_tag: impl Into<String>, manifest: Vec<Url>) -> Self {
        Self {
            version_tag: version_tag.into(),
            manifest,
            api_prefix: "/api/".into(),
            offline_message: "You appear to be offline.".into(),
        }
    }

    pub fn with_api_prefix(mut self, api_prefix: impl Into<String>) -> Self {
        self.api_prefix = api_prefix.into();
        self
    }

    pub fn with_offline_message(mut self, message: impl Into<String>) -> Self {
        self.offline_message = message.into();
        self
    }
}

/// Host-side control over the clients a version serves.
#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Ask to be activated without waiting for existing clients to close.
    async fn skip_waiting(&self);

    /// Take control of already-open clients immediately.
    async fn claim(&self);
}

/// Result of a clean activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub version_tag: String,
    /// Stale stores deleted during cleanup.
    pub purged: Vec<String>,
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    OfflineFallback,
}

/// A handled request.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: Response,
    pub source: ResponseSource,
    /// Detached store write started for this response, if any.
    ///
    /// Dropping the handle does not cancel the write.
    pub cache_write: Option<JoinHandle<()>>,
}

/// Fetch-routing policy and cache lifecycle for one version.
pub struct Interceptor<N, S> {
    config: InterceptorConfig,
    network: N,
    storage: S,
}

impl<N: Network, S: CacheStorage> Interceptor<N, S> {
    pub fn new(config: InterceptorConfig, network: N, storage: S) -> Self {
        Self { config, network, storage }
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.config
    }

    pub fn version_tag(&self) -> &str {
        &self.config.version_tag
    }

    /// Populate this version's store with every manifest asset.
    ///
    /// All assets are fetched concurrently; only when every one of them came
    /// back 2xx are they written, in a single bulk put. Signals
    /// `skip_waiting` once the store is populated.
    ///
    /// # Errors
    ///
    /// `Error::SetupFailed` if any asset fails at the transport level or
    /// returns a non-2xx status. Store errors propagate unchanged.
    pub async fn on_setup<C: ClientControl + ?Sized>(&self, clients: &C) -> Result<(), Error> {
        let version = self.version_tag();
        tracing::info!(version, assets = self.config.manifest.len(), "setting up cache");

        let store = self.storage.open(version).await?;

        let entries = try_join_all(self.config.manifest.iter().map(|url| self.precache(url.clone())))
            .await
            .inspect_err(|e| tracing::error!(version, error = %e, "setup failed"))?;

        store.put_all(entries).await?;
        clients.skip_waiting().await;

        tracing::info!(version, "setup complete");
        Ok(())
    }

    async fn precache(&self, url: Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url);
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::SetupFailed { url: request.url.to_string(), reason: e.to_string() })?;

        if !response.is_success() {
            return Err(Error::SetupFailed {
                url: request.url.to_string(),
                reason: format!("status {}", response.status),
            });
        }

        Ok((request, response))
    }

    /// Delete every store not named by this version, then claim clients.
    ///
    /// Deletions run concurrently and independently; `claim` is signalled
    /// after all of them settled, whatever their outcome.
    ///
    /// # Errors
    ///
    /// `Error::CleanupFailed` naming the stores that could not be deleted.
    /// Failing to enumerate stores propagates unchanged.
    pub async fn on_activate<C: ClientControl + ?Sized>(&self, clients: &C) -> Result<ActivationReport, Error> {
        let cleanup = self.purge_stale_stores().await;
        clients.claim().await;
        cleanup
    }

    async fn purge_stale_stores(&self) -> Result<ActivationReport, Error> {
        let version = self.version_tag();
        let stale: Vec<String> = self
            .storage
            .keys()
            .await?
            .into_iter()
            .filter(|name| name != version)
            .collect();

        let results = join_all(
            stale
                .iter()
                .map(|name| async move { (name, self.storage.delete(name).await) }),
        )
        .await;

        let mut purged = Vec::new();
        let mut failed = Vec::new();
        for (name, result) in results {
            match result {
                Ok(true) => {
                    tracing::info!(version, store = %name, "deleted stale cache store");
                    purged.push(name.clone());
                }
                Ok(false) => tracing::debug!(version, store = %name, "stale cache store already gone"),
                Err(e) => {
                    tracing::warn!(version, store = %name, error = %e, "failed to delete stale cache store");
                    failed.push(name.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(ActivationReport { version_tag: version.to_string(), purged })
        } else {
            Err(Error::CleanupFailed { stores: failed })
        }
    }

    /// Handle one request and return only its response.
    ///
    /// Any background store write keeps running after this returns.
    pub async fn on_request(&self, request: Request) -> Result<Response, Error> {
        self.dispatch(request).await.map(|outcome| outcome.response)
    }

    /// Handle one request.
    ///
    /// # Errors
    ///
    /// API requests never fail. Asset requests fail with `Error::Network`
    /// when the store has no entry and the network is unreachable, and with
    /// store errors if the lookup itself fails.
    pub async fn dispatch(&self, request: Request) -> Result<FetchOutcome, Error> {
        match Route::classify(&request, &self.config.api_prefix) {
            Route::Api => Ok(self.network_with_fallback(&request).await),
            Route::Asset => self.cache_first(request).await,
        }
    }

    async fn network_with_fallback(&self, request: &Request) -> FetchOutcome {
        match self.network.fetch(request).await {
            Ok(response) => FetchOutcome { response, source: ResponseSource::Network, cache_write: None },
            Err(e) => {
                tracing::warn!(method = %request.method, url = %request.url, error = %e, "network unavailable, serving offline payload");
                FetchOutcome {
                    response: Response::offline(&self.config.offline_message),
                    source: ResponseSource::OfflineFallback,
                    cache_write: None,
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> Result<FetchOutcome, Error> {
        let version = self.version_tag();

        if let Some(store) = self.storage.lookup(version).await?
            && let Some(response) = store.match_request(&request).await?
        {
            tracing::debug!(method = %request.method, url = %request.url, "cache hit");
            return Ok(FetchOutcome { response, source: ResponseSource::Cache, cache_write: None });
        }

        tracing::debug!(method = %request.method, url = %request.url, "cache miss");
        let response = self.network.fetch(&request).await?;

        let cache_write = if response.is_success() && request.is_get() {
            match self.storage.open(version).await {
                Ok(store) => Some(spawn_cache_write(store, request, response.clone())),
                Err(e) => {
                    tracing::warn!(version, url = %request.url, error = %e, "failed to open store for response");
                    None
                }
            }
        } else {
            None
        };

        Ok(FetchOutcome { response, source: ResponseSource::Network, cache_write })
    }
}

fn spawn_cache_write<C: Cache>(store: C, request: Request, response: Response) -> JoinHandle<()> {
    tokio::spawn(async move {
        match store.put(&request, &response).await {
            Ok(()) => tracing::debug!(url = %request.url, "stored response"),
            Err(e) => tracing::warn!(url = %request.url, error = %e, "failed to store response"),
        }
    })
}
