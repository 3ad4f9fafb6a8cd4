//! HTTP client abstraction used by the probe pipeline.
//!
//! The `HttpClient` trait hides the transport so the pipeline can be exercised
//! against a recording mock. Implementations must return every HTTP status as a
//! normal response; only transport-level failures become errors.

use async_trait::async_trait;
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A single outbound request issued by a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers(mut self, headers: &[(String, String)]) -> Self {
        self.headers.extend_from_slice(headers);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response from an HTTP request, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Canonical reason phrase for the status ("OK", "Not Found", ...)
    pub status_text: String,
    /// Lowercase header names; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn content_type(&self) -> &str {
        self.headers.get("content-type").map(String::as_str).unwrap_or_default()
    }
}

/// Transport-level failure of a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response was received (DNS, connect, TLS, timeout)
    #[error("{0}")]
    Request(String),

    /// The status line and headers arrived but reading the body failed
    #[error("failed to read response body: {message}")]
    Body {
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        message: String,
    },
}

/// Trait for executing HTTP requests.
///
/// # Example
/// ```ignore
/// let client = ReqwestHttpClient::new();
/// let response = client.execute(HttpRequest::new(Method::HEAD, url)).await?;
/// println!("Status: {} {}", response.status, response.status_text);
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request.
    ///
    /// # Errors
    /// Returns an error only when no complete response could be obtained:
    /// network failures, timeouts, or a body that could not be read.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

// ============================================================================
// Production Implementation using reqwest
// ============================================================================

/// Production HTTP client using reqwest.
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a preconfigured reqwest client (user agent, proxies, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Flatten an error and its sources into one line.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn collect_headers(headers: &reqwest::header::HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    collected
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req = self.client.request(request.method.clone(), request.url.clone());

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            req = req.body(body);
        }

        let response = req.send().await.map_err(|e| {
            let message = describe(&e);
            tracing::debug!(error = %message, "HTTP request failed");
            TransportError::Request(message)
        })?;

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();
        let headers = collect_headers(response.headers());

        let body = response.text().await.map_err(|e| TransportError::Body {
            status: status.as_u16(),
            status_text: status_text.clone(),
            headers: headers.clone(),
            message: describe(&e),
        })?;

        tracing::debug!(status = status.as_u16(), response_len = body.len(), "HTTP request completed");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text,
            headers,
            body,
        })
    }
}

// ============================================================================
// Test/Mock Implementation
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockCall, MockHttpClient};

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Record of a call made to the mock HTTP client.
    pub type MockCall = HttpRequest;

    /// Mock HTTP client for testing.
    ///
    /// Responses are keyed by `"{METHOD} {path}"` and returned in FIFO order.
    /// A request with no queued response fails with a transport error.
    ///
    /// # Example
    /// ```ignore
    /// let mock = MockHttpClient::new();
    /// mock.add_response("HEAD /mcp", Ok(HttpResponse::new(200)));
    /// ```
    #[derive(Clone, Default)]
    pub struct MockHttpClient {
        responses: Arc<Mutex<HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>>>,
        calls: Arc<Mutex<Vec<MockCall>>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a response for a method and path, e.g. `"POST /mcp"`.
        pub fn add_response(&self, key: &str, response: Result<HttpResponse, TransportError>) {
            self.responses
                .lock()
                .entry(key.to_string())
                .or_default()
                .push_back(response);
        }

        /// Get all calls that have been made to this mock client.
        pub fn get_calls(&self) -> Vec<MockCall> {
            self.calls.lock().clone()
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.calls.lock().len()
        }

        /// Methods of recorded calls, in order.
        pub fn methods(&self) -> Vec<String> {
            self.calls.lock().iter().map(|call| call.method.to_string()).collect()
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let key = format!("{} {}", request.method, request.url.path());
            self.calls.lock().push(request);

            self.responses
                .lock()
                .get_mut(&key)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Err(TransportError::Request(format!("No mock response configured for {key}"))))
        }
    }
}
