//! Host-side version registration.
//!
//! Drives the interceptor lifecycle the way a browser drives a worker
//! registration: a new version is set up first, and only a version whose
//! setup succeeded is activated and starts receiving requests. A failed
//! setup leaves the previously active version in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shell_core::{
    CacheStorage, ClientControl, Error, FetchOutcome, Interceptor, InterceptorConfig, Network, Request,
    ResponseSource,
};
use tokio::sync::{Mutex, RwLock};

/// Client-control signals recorded for one version.
#[derive(Debug, Default)]
struct VersionClients {
    skipped_waiting: AtomicBool,
    claimed: AtomicBool,
}

#[async_trait]
impl ClientControl for VersionClients {
    async fn skip_waiting(&self) {
        self.skipped_waiting.store(true, Ordering::SeqCst);
    }

    async fn claim(&self) {
        self.claimed.store(true, Ordering::SeqCst);
    }
}

/// What happened when a version was installed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutcome {
    /// The version now active.
    pub version_tag: String,
    /// The version it replaced, if any.
    pub previous: Option<String>,
    /// Whether the version asked to skip waiting for clients to close.
    pub skipped_waiting: bool,
    /// Whether the version claimed open clients on activation.
    pub claimed: bool,
    /// Stale stores deleted during activation.
    pub purged: Vec<String>,
    /// Set when activation cleanup left stale stores behind.
    pub cleanup_error: Option<String>,
}

/// The active interceptor version plus the collaborators new versions share.
pub struct Registration<N, S> {
    network: N,
    storage: S,
    active: RwLock<Option<Arc<Interceptor<N, S>>>>,
    /// Serializes installs.
    install_lock: Mutex<()>,
}

impl<N, S> Registration<N, S>
where
    N: Network + Clone,
    S: CacheStorage + Clone,
{
    pub fn new(network: N, storage: S) -> Self {
        Self { network, storage, active: RwLock::new(None), install_lock: Mutex::new(()) }
    }

    /// Tag of the version currently serving requests.
    pub async fn active_version(&self) -> Option<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|v| v.version_tag().to_string())
    }

    /// Set up a new version and, if that succeeds, activate it.
    ///
    /// # Errors
    ///
    /// Returns the setup error; the previously active version (if any)
    /// keeps serving. Activation cleanup failures are not errors here, they
    /// are reported in [`InstallOutcome::cleanup_error`].
    ///
    /// Concurrent installs queue behind each other; requests keep being
    /// served by the active version meanwhile.
    pub async fn install(&self, config: InterceptorConfig) -> Result<InstallOutcome, Error> {
        let _queued = self.install_lock.lock().await;
        let version = Arc::new(Interceptor::new(config, self.network.clone(), self.storage.clone()));
        let clients = VersionClients::default();

        if let Err(e) = version.on_setup(&clients).await {
            let current = self.active_version().await;
            tracing::warn!(version = version.version_tag(), current = ?current, "install failed; keeping current version");
            return Err(e);
        }

        let (purged, cleanup_error) = match version.on_activate(&clients).await {
            Ok(report) => (report.purged, None),
            Err(e) => {
                tracing::warn!(version = version.version_tag(), error = %e, "activation cleanup incomplete");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let previous = self
            .active
            .write()
            .await
            .replace(version.clone())
            .map(|v| v.version_tag().to_string());

        tracing::info!(version = version.version_tag(), previous = ?previous, "version activated");

        Ok(InstallOutcome {
            version_tag: version.version_tag().to_string(),
            previous,
            skipped_waiting: clients.skipped_waiting.load(Ordering::SeqCst),
            claimed: clients.claimed.load(Ordering::SeqCst),
            purged,
            cleanup_error,
        })
    }

    /// Route a request through the active version.
    ///
    /// With no active version the request goes straight to the network.
    pub async fn dispatch(&self, request: Request) -> Result<FetchOutcome, Error> {
        let active = self.active.read().await.clone();
        match active {
            Some(version) => version.dispatch(request).await,
            None => {
                tracing::debug!(url = %request.url, "no active version; passing request through");
                let response = self.network.fetch(&request).await?;
                Ok(FetchOutcome { response, source: ResponseSource::Network, cache_write: None })
            }
        }
    }
}
