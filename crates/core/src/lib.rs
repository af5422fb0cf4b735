//! Core types and shared functionality for offline-shell.
//!
//! This crate provides:
//! - The request interceptor and its routing policy
//! - Request/response model and collaborator traits
//! - Cache storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod interceptor;
pub mod network;

pub use cache::{Cache, CacheDb, CacheStorage, EntryMeta, Store};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Request, Response};
pub use interceptor::{
    ActivationReport, ClientControl, FetchOutcome, Interceptor, InterceptorConfig, ResponseSource, Route,
};
pub use network::{Network, NetworkError};
