//! cache_list tool implementation.
//!
//! Lists cache stores and the entries each one holds.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shell_core::{EntryMeta, Error, Network};

use crate::state::AppState;

/// Parameters for the cache_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheListParams {
    /// Only list this store.
    #[serde(default)]
    pub store: Option<String>,
}

/// One store and its entries.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StoreListing {
    pub name: String,
    pub entries: Vec<EntryMeta>,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    /// Version currently serving requests.
    pub active_version: Option<String>,
    pub stores: Vec<StoreListing>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl<N: Network + Clone>(
    state: &AppState<N>, params: CacheListParams,
) -> Result<CallToolResult, McpError> {
    let names = match params.store {
        Some(name) if state.storage.has_store(&name).await? => vec![name],
        Some(name) => return Err(Error::CacheMiss(format!("no store named {name}")).into()),
        None => state.storage.store_names().await?,
    };

    let mut stores = Vec::with_capacity(names.len());
    for name in names {
        let entries = state.storage.open_store(&name).await?.list_entries().await?;
        stores.push(StoreListing { name, entries });
    }

    let output = CacheListOutput { active_version: state.registration.active_version().await, stores };
    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
