//! shell_install tool implementation.
//!
//! Registers a new interceptor version: populate its store from the
//! manifest, then activate it and purge older stores.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shell_core::{Error, Network};

use crate::state::AppState;

/// Parameters for the shell_install tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ShellInstallParams {
    /// Version tag of the release (default: the configured tag).
    #[serde(default)]
    pub version: Option<String>,

    /// Manifest override. Paths resolve against the configured origin.
    #[serde(default)]
    pub manifest: Option<Vec<String>>,
}

/// Implementation of the shell_install tool.
pub async fn install_impl<N: Network + Clone>(
    state: &AppState<N>, params: ShellInstallParams,
) -> Result<CallToolResult, McpError> {
    let config = state.interceptor_config(params.version, params.manifest)?;
    let outcome = state.registration.install(config).await?;

    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
