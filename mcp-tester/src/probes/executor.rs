//! Probe execution engine.
//!
//! `ProbeExecutor` runs the two-step pipeline against a target endpoint: a
//! connectivity check (HEAD, falling back to GET) and a functionality check
//! (POST of a small synthetic payload, falling back to GET). Each step makes at
//! most one fallback request. The steps run strictly in sequence.

use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::classify::{ResponseShape, classify, server_name};
use super::http::{HttpClient, HttpRequest, HttpResponse, TransportError};
use super::models::{
    FunctionalityResponse, FunctionalitySummary, HTML_SUCCESS, ProbeOutcome, ProbeRequest, ProbeResult, SERVER_REACHABLE,
    SERVER_RETURNED_ERRORS, SERVER_URL_REQUIRED, ServerInfo,
};
use crate::errors::ProbeError;

const PROBE_INPUT: &str = "Hello, can you respond to confirm you're working?";
const PROBE_MAX_TOKENS: u32 = 50;

/// Timeouts applied to probe requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSettings {
    /// Bound on the connectivity GET issued when HEAD is unusable
    pub fallback_timeout: Duration,
    /// Bound on every other request; `None` leaves it to the transport
    pub request_timeout: Option<Duration>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            fallback_timeout: Duration::from_secs(10),
            request_timeout: None,
        }
    }
}

/// Executes diagnostic probes against user-supplied endpoints.
///
/// Holds no per-probe state; one executor serves any number of concurrent
/// probes.
#[derive(Clone)]
pub struct ProbeExecutor {
    client: Arc<dyn HttpClient>,
    settings: ProbeSettings,
}

impl ProbeExecutor {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self::with_settings(client, ProbeSettings::default())
    }

    pub fn with_settings(client: Arc<dyn HttpClient>, settings: ProbeSettings) -> Self {
        Self { client, settings }
    }

    /// Run the full pipeline. Never fails: every problem is folded into the
    /// returned [`ProbeOutcome`].
    #[instrument(skip_all, fields(target = request.target_url.as_deref().unwrap_or_default()))]
    pub async fn run_probe(&self, request: &ProbeRequest) -> ProbeOutcome {
        let Some(target) = request.target() else {
            debug!("Rejecting probe without a server URL");
            return ProbeOutcome::Rejected {
                message: SERVER_URL_REQUIRED.to_string(),
            };
        };

        let start = Instant::now();
        match self.probe(target, request.bearer()).await {
            Ok(result) => {
                info!(
                    success = result.success,
                    is_html = result.is_html(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Probe completed"
                );
                ProbeOutcome::Completed(Box::new(result))
            }
            Err(err) => {
                warn!(error = %err, elapsed_ms = start.elapsed().as_millis() as u64, "Probe failed");
                ProbeOutcome::Failed(err)
            }
        }
    }

    async fn probe(&self, target: &str, credential: Option<&str>) -> Result<ProbeResult, ProbeError> {
        let url = parse_target(target)?;

        let connectivity = self.probe_connectivity(&url, credential).await?;
        if connectivity.status >= 500 {
            return Err(ProbeError::ServerError {
                status: connectivity.status,
                status_text: connectivity.status_text,
            });
        }

        let functionality = self.probe_functionality(&url, credential).await?;
        let success = connectivity.is_success() || functionality.is_success();
        let shape = classify(&functionality, target);

        Ok(assemble(target, success, connectivity, functionality, shape))
    }

    /// Reachability check: HEAD, or a time-bounded GET when HEAD fails or is
    /// answered with 405.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn probe_connectivity(&self, url: &Url, credential: Option<&str>) -> Result<HttpResponse, ProbeError> {
        let headers = auth_headers(credential);

        let head = HttpRequest::new(Method::HEAD, url.clone())
            .headers(&headers)
            .timeout(self.settings.request_timeout);

        match self.client.execute(head).await {
            Ok(response) if response.status != 405 => return Ok(response),
            Ok(_) => info!("HEAD request not supported, falling back to GET"),
            Err(e) => info!(error = %e, "HEAD request failed, falling back to GET"),
        }

        let get = HttpRequest::new(Method::GET, url.clone())
            .headers(&headers)
            .timeout(Some(self.settings.fallback_timeout));
        self.client.execute(get).await.map_err(ProbeError::from)
    }

    /// Functionality check: POST the diagnostic payload, or GET with the same
    /// headers when POST fails or is answered with 405.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn probe_functionality(&self, url: &Url, credential: Option<&str>) -> Result<HttpResponse, ProbeError> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        headers.extend(auth_headers(credential));

        let payload = json!({
            "input": PROBE_INPUT,
            "config": { "max_tokens": PROBE_MAX_TOKENS },
        });
        let post = HttpRequest::new(Method::POST, url.clone())
            .headers(&headers)
            .body(payload.to_string())
            .timeout(self.settings.request_timeout);

        match self.client.execute(post).await {
            Ok(response) if response.status != 405 => return Ok(response),
            Ok(_) => info!("POST request not supported, trying GET"),
            Err(e) => info!(error = %e, "POST request failed, trying GET"),
        }

        let get = HttpRequest::new(Method::GET, url.clone())
            .headers(&headers)
            .timeout(self.settings.request_timeout);
        self.client.execute(get).await.map_err(ProbeError::from)
    }
}

impl From<TransportError> for ProbeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Request(message) => ProbeError::Transport { message },
            TransportError::Body {
                status,
                status_text,
                headers,
                message,
            } => ProbeError::IncompleteResponse {
                status,
                status_text,
                headers,
                message,
            },
        }
    }
}

fn parse_target(target: &str) -> Result<Url, ProbeError> {
    let url = Url::parse(target).map_err(|e| ProbeError::InvalidUrl {
        url: target.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ProbeError::InvalidUrl {
            url: target.to_string(),
            reason: format!("unsupported scheme '{scheme}'"),
        }),
    }
}

fn auth_headers(credential: Option<&str>) -> Vec<(String, String)> {
    credential
        .map(|key| vec![("Authorization".to_string(), format!("Bearer {key}"))])
        .unwrap_or_default()
}

fn assemble(
    target: &str,
    success: bool,
    connectivity: HttpResponse,
    functionality: HttpResponse,
    shape: ResponseShape,
) -> ProbeResult {
    let is_html = shape.is_html();
    let message = match (success, is_html) {
        (true, true) => HTML_SUCCESS,
        (true, false) => SERVER_REACHABLE,
        (false, _) => SERVER_RETURNED_ERRORS,
    };

    let response = match shape {
        ResponseShape::Html(html) => FunctionalityResponse::Html(html),
        ResponseShape::Json(summary) => {
            let mut info = ServerInfo::new(success, server_name(target), summary.raw);
            info.version = summary.version;
            info.features = summary.features;
            FunctionalityResponse::Info(info)
        }
        ResponseShape::Opaque(raw) => FunctionalityResponse::Info(ServerInfo::new(success, server_name(target), raw)),
    };

    ProbeResult {
        success,
        message: message.to_string(),
        connectivity: connectivity.into(),
        functionality: FunctionalitySummary {
            status: functionality.status,
            status_text: functionality.status_text,
            response,
            is_html,
            headers: functionality.headers,
        },
    }
}
