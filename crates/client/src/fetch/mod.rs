//! HTTP transport for the interceptor's network collaborator.
//!
//! ### Forwarding
//! - Method, headers and body are sent as given
//! - Redirects are followed (max 5 by default)
//! - Any HTTP status is a successful fetch; only transport failures
//!   (connect, DNS, reset, timeout) are errors
//!
//! ### URL handling
//! - [`canonicalize`]: trim, default scheme, lowercase host, drop fragment
//! - [`resolve`]: join manifest paths and request targets onto the origin

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};
use shell_core::{Network, NetworkError, Request, Response};

pub use url::{UrlError, canonicalize, resolve};

/// Configuration for the HTTP transport.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offline-shell/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "offline-shell/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

/// reqwest-backed [`Network`].
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new transport with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, NetworkError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| NetworkError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn build(&self, request: &Request) -> Result<reqwest::RequestBuilder, NetworkError> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::Transport(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }
        Ok(builder)
    }
}

fn transport_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() { NetworkError::Timeout(err.to_string()) } else { NetworkError::Transport(err.to_string()) }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let start = Instant::now();

        let response = self.build(request)?.send().await.map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .collect();

        let body = response.bytes().await.map_err(transport_error)?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status,
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn network() -> HttpNetwork {
        HttpNetwork::new(FetchConfig::default()).unwrap()
    }

    fn target(server: &MockServer, path: &str) -> ::url::Url {
        resolve(&::url::Url::parse(&server.uri()).unwrap(), path).unwrap()
    }

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "offline-shell/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/index.html"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html>shell</html>")
                    .insert_header("content-type", "text/html"),
            )
            .mount(&server)
            .await;

        let response = network()
            .fetch(&Request::get(target(&server, "/index.html")))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.text(), "<html>shell</html>");
    }

    #[tokio::test]
    async fn test_non_ascii_header_values_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs/contract.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", "inline; filename=\"résumé.pdf\"")
                    .set_body_string("%PDF"),
            )
            .mount(&server)
            .await;

        let response = network()
            .fetch(&Request::get(target(&server, "/docs/contract.pdf")))
            .await
            .unwrap();

        assert_eq!(response.header("content-disposition"), Some("inline; filename=\"résumé.pdf\""));
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contracts"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down for maintenance"))
            .mount(&server)
            .await;

        let response = network()
            .fetch(&Request::get(target(&server, "/api/contracts")))
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.text(), "down for maintenance");
    }

    #[tokio::test]
    async fn test_forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/search"))
            .and(header_eq("authorization", "Bearer t0ken"))
            .and(body_string(r#"{"q":"annual leave"}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"answer":"20 days"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::new("POST", target(&server, "/api/search"))
            .with_header("Authorization", "Bearer t0ken")
            .with_body(r#"{"q":"annual leave"}"#);
        let response = network().fetch(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.text(), r#"{"answer":"20 days"}"#);
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = ::url::Url::parse(&format!("http://127.0.0.1:{port}/api/status")).unwrap();
        let result = network().fetch(&Request::get(url)).await;
        assert!(matches!(result, Err(NetworkError::Transport(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = FetchConfig { timeout: Duration::from_millis(100), ..Default::default() };
        let result = HttpNetwork::new(config)
            .unwrap()
            .fetch(&Request::get(target(&server, "/slow")))
            .await;

        assert!(matches!(result, Err(NetworkError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_invalid_method() {
        let request = Request::new("NOT A METHOD", ::url::Url::parse("http://localhost:1/").unwrap());
        let result = network().fetch(&request).await;
        assert!(matches!(result, Err(NetworkError::Transport(_))));
    }
}
