//! shell_fetch tool implementation.
//!
//! Hands one request to the active interceptor version and reports the
//! response along with where it came from.

use std::collections::BTreeMap;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shell_core::{Error, Network, Request, ResponseSource};

use crate::state::AppState;

/// Parameters for the shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchParams {
    /// Target URL. Paths such as `/index.html` resolve against the origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, sent as UTF-8.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output from the shell_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ShellFetchOutput {
    pub url: String,
    pub method: String,
    /// `cache`, `network` or `offline_fallback`.
    pub source: ResponseSource,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

/// Implementation of the shell_fetch tool.
pub async fn fetch_impl<N: Network + Clone>(
    state: &AppState<N>, params: ShellFetchParams,
) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = state.resolve(&params.url)?;
    let mut request = Request::new(&params.method, url);
    for (name, value) in params.headers {
        request = request.with_header(name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body);
    }

    let method = request.method.clone();
    let url = request.url.to_string();
    let outcome = state.registration.dispatch(request).await?;
    let response = outcome.response;

    let output = ShellFetchOutput {
        url,
        method,
        source: outcome.source,
        status: response.status,
        body: response.text(),
        body_bytes: response.body.len(),
        headers: response.headers,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::tests::StubNetwork;
    use crate::tools::tests::{result_text, test_state};
    use shell_core::Response;

    fn params(url: &str) -> ShellFetchParams {
        ShellFetchParams { url: url.into(), method: default_method(), headers: BTreeMap::new(), body: None }
    }

    async fn fetch(state: &AppState<StubNetwork>, params: ShellFetchParams) -> ShellFetchOutput {
        let result = fetch_impl(state, params).await.unwrap();
        serde_json::from_str(&result_text(&result)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let state = test_state(StubNetwork::shell()).await;
        let result = fetch_impl(&state, params("  ")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_serves_shell_from_cache_offline() {
        let network = StubNetwork::shell();
        let state = test_state(network.clone()).await;
        state.install_configured().await.unwrap();
        network.set_offline(true);

        let output = fetch(&state, params("/index.html")).await;

        assert_eq!(output.source, ResponseSource::Cache);
        assert_eq!(output.url, "http://localhost:8000/index.html");
        assert_eq!(output.body, "index");
    }

    #[tokio::test]
    async fn test_fetch_api_offline_payload() {
        let network = StubNetwork::shell();
        let state = test_state(network.clone()).await;
        state.install_configured().await.unwrap();
        network.set_offline(true);

        let output = fetch(&state, params("/api/status")).await;

        assert_eq!(output.source, ResponseSource::OfflineFallback);
        assert_eq!(output.status, 200);
        assert_eq!(output.body, r#"{"error":"You appear to be offline."}"#);
        assert!(
            output
                .headers
                .contains(&("content-type".to_string(), "application/json".to_string()))
        );
    }

    #[tokio::test]
    async fn test_fetch_api_error_status_passthrough() {
        let network = StubNetwork::shell();
        network.serve("/api/feedback", Response::new(422, r#"{"detail":"rating required"}"#));
        let state = test_state(network).await;
        state.install_configured().await.unwrap();

        let mut request = params("/api/feedback");
        request.method = "post".into();
        request.body = Some(r#"{"rating":null}"#.into());
        let output = fetch(&state, request).await;

        assert_eq!(output.method, "POST");
        assert_eq!(output.source, ResponseSource::Network);
        assert_eq!(output.status, 422);
    }

    #[tokio::test]
    async fn test_fetch_asset_miss_offline_is_error() {
        let network = StubNetwork::shell();
        let state = test_state(network.clone()).await;
        state.install_configured().await.unwrap();
        network.set_offline(true);

        let err = fetch_impl(&state, params("/icons/icon-512.png")).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }
}
