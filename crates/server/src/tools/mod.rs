//! MCP tool implementations.
//!
//! This module contains all tools exposed by the offline-shell server.

pub mod cache;
pub mod shell_fetch;
pub mod shell_install;

#[cfg(test)]
pub(crate) mod tests {
    use rmcp::model::CallToolResult;
    use shell_core::{AppConfig, CacheDb};

    use crate::registration::tests::StubNetwork;
    use crate::state::AppState;

    pub(crate) async fn test_state(network: StubNetwork) -> AppState<StubNetwork> {
        let storage = CacheDb::open_in_memory().await.unwrap();
        AppState::with_network(AppConfig::default(), storage, network).unwrap()
    }

    pub(crate) fn result_text(result: &CallToolResult) -> String {
        let content = serde_json::to_value(&result.content[0]).unwrap();
        content.get("text").and_then(|v| v.as_str()).unwrap().to_string()
    }
}
