//! Cache-related MCP tools.
//!
//! This module provides read-only tools for inspecting the cache stores.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::{CacheListParams, list_impl};
