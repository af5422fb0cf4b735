//! Request and response model shared by the interceptor, the store and the
//! network transport.
//!
//! Headers are kept as an ordered list of `(name, value)` pairs with names
//! lowercased, which is also how they are persisted.

use bytes::Bytes;
use url::Url;

/// An outgoing request from the controlled scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Request {
    /// Build a request with the given method and no headers or body.
    pub fn new(method: impl AsRef<str>, url: Url) -> Self {
        Self { method: method.as_ref().trim().to_ascii_uppercase(), url, headers: Vec::new(), body: Bytes::new() }
    }

    /// Shorthand for a bodyless GET.
    pub fn get(url: Url) -> Self {
        Self::new("GET", url)
    }

    /// Append a header, lowercasing its name.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// URL used for cache identity: fragments never take part in matching.
    pub fn cache_url(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as returned by the network or replayed from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// Append a header, lowercasing its name.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.push((name.as_ref().to_ascii_lowercase(), value.into()));
        self
    }

    /// Synthetic `200 application/json` response carrying `{"error": message}`.
    ///
    /// Stands in for API calls whose network attempt failed at the transport
    /// level, so callers see a parseable payload instead of a failed fetch.
    pub fn offline(message: &str) -> Self {
        let body = serde_json::json!({ "error": message }).to_string();
        Self::new(200, body).with_header("content-type", "application/json")
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of the named header, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
