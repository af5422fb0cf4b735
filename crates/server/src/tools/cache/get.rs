//! cache_get tool implementation.
//!
//! Retrieves one cached response by request identity.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shell_core::{Error, Network, Request};

use crate::state::AppState;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL. Paths resolve against the origin.
    pub url: String,

    /// Request method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Store to read (default: the active version, else the configured tag).
    #[serde(default)]
    pub store: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub store: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl<N: Network + Clone>(
    state: &AppState<N>, params: CacheGetParams,
) -> Result<CallToolResult, McpError> {
    let store = match params.store {
        Some(store) => store,
        None => state
            .registration
            .active_version()
            .await
            .unwrap_or_else(|| state.config.version_tag.clone()),
    };

    let request = Request::new(&params.method, state.resolve(&params.url)?);
    let miss = || Error::CacheMiss(format!("{} {} in {store}", request.method, request.url));

    if !state.storage.has_store(&store).await? {
        return Err(miss().into());
    }

    let response = state
        .storage
        .open_store(&store)
        .await?
        .get_entry(&request)
        .await?
        .ok_or_else(miss)?;

    let output = CacheGetOutput {
        method: request.method.clone(),
        url: request.cache_url(),
        status: response.status,
        body: response.text(),
        headers: response.headers,
        store,
    };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
