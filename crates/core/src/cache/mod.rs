//! Versioned, persistent response cache.
//!
//! The interceptor talks to storage through the [`CacheStorage`] and
//! [`Cache`] traits. [`CacheDb`] is the SQLite implementation:
//!
//! - One named store per version tag, enumerated in creation order
//! - Entries keyed by SHA-256 of method and URL
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Deleting a store cascades to its entries

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

use async_trait::async_trait;

pub use crate::Error;
use crate::http::{Request, Response};

pub use connection::CacheDb;
pub use entries::{EntryMeta, Store};

/// Named-store registry: the persistent store collaborator.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    type Cache: Cache;

    /// Open the named store, creating it if absent.
    async fn open(&self, name: &str) -> Result<Self::Cache, Error>;

    /// Open the named store only if it already exists.
    async fn lookup(&self, name: &str) -> Result<Option<Self::Cache>, Error>;

    /// Names of all existing stores in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a whole store. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;
}

/// A single opened store.
///
/// Handles are cheap to clone and may be moved onto detached tasks.
#[async_trait]
pub trait Cache: Clone + Send + Sync + 'static {
    /// Stored response for the request's method and URL, if any.
    async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Insert or overwrite the entry for `request`.
    async fn put(&self, request: &Request, response: &Response) -> Result<(), Error>;

    /// Insert or overwrite several entries atomically.
    async fn put_all(&self, entries: Vec<(Request, Response)>) -> Result<(), Error>;
}
