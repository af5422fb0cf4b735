//! The network collaborator.
//!
//! The interceptor never talks to a transport directly; it goes through
//! [`Network`] so the host can plug in reqwest, a test double, or anything
//! else that can turn a [`Request`] into a [`Response`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::http::{Request, Response};

/// Transport-level failures. An HTTP error status is not one of these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// Connection refused, DNS failure, reset, unusable request, etc.
    #[error("transport error: {0}")]
    Transport(String),

    /// The transport gave up waiting.
    #[error("request timeout: {0}")]
    Timeout(String),
}

/// Abstract `fetch(request) -> response | transport-error` capability.
#[async_trait]
pub trait Network: Send + Sync {
    /// Perform a single attempt. Implementations must not retry.
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

#[async_trait]
impl<N: Network + ?Sized> Network for Arc<N> {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        (**self).fetch(request).await
    }
}
