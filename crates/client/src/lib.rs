//! Network transport for offline-shell.
//!
//! This crate provides the reqwest-backed implementation of the
//! interceptor's network collaborator and URL resolution against the
//! application origin.

pub mod fetch;

pub use fetch::{FetchConfig, HttpNetwork, UrlError, canonicalize, resolve};
