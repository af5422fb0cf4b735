//! Per-request routing decision.

use serde::{Deserialize, Serialize};

use crate::http::Request;

/// Which caching policy handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Network only; transport failures become the offline payload.
    Api,
    /// Cache first; misses are fetched and stored in the background.
    Asset,
}

impl Route {
    /// Classify by URL path prefix alone. Method, headers and host play no part.
    pub fn classify(request: &Request, api_prefix: &str) -> Self {
        if request.url.path().starts_with(api_prefix) { Route::Api } else { Route::Asset }
    }
}
