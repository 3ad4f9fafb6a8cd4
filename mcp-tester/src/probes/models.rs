//! Data models for the probe pipeline.
//!
//! Wire names follow the browser client's expectations (`serverUrl`,
//! `statusText`, `isHtml`, `_rawResponse`), hence the serde renames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::http::HttpResponse;
use crate::errors::{ErrorDetail, ProbeError};

pub const SERVER_URL_REQUIRED: &str = "Server URL is required";
pub const FAILED_TO_TEST_SERVER: &str = "Failed to test server";
pub const HTML_SUCCESS: &str = "Server responded with HTML content (displaying webpage)";
pub const SERVER_REACHABLE: &str = "MCP server is reachable";
pub const SERVER_RETURNED_ERRORS: &str = "Server accessible but returned errors";
const SERVER_UNREACHABLE: &str = "Failed to connect to MCP server";

/// Request to probe a target endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRequest {
    #[serde(rename = "serverUrl", default)]
    pub target_url: Option<String>,
    #[serde(rename = "apiKey", default)]
    pub credential: Option<String>,
}

impl ProbeRequest {
    pub fn new(target_url: impl Into<String>) -> Self {
        Self {
            target_url: Some(target_url.into()),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    /// Target URL, treating an empty string as missing.
    pub fn target(&self) -> Option<&str> {
        self.target_url.as_deref().filter(|url| !url.is_empty())
    }

    /// Bearer credential, treating an empty string as missing.
    pub fn bearer(&self) -> Option<&str> {
        self.credential.as_deref().filter(|key| !key.is_empty())
    }
}

/// Capability tag derived from the shape of a JSON response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Capability {
    #[serde(rename = "Text Generation")]
    TextGeneration,
    #[serde(rename = "Text Processing")]
    TextProcessing,
    #[serde(rename = "Language Model")]
    LanguageModel,
    #[serde(rename = "Sequential Processing")]
    SequentialProcessing,
    #[serde(rename = "AI Reasoning")]
    AiReasoning,
    #[serde(rename = "Memory")]
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Success,
    Failed,
}

/// Normalized summary of a non-HTML functionality response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub status: ProbeStatus,
    pub message: String,
    pub server: String,
    #[serde(rename = "_rawResponse")]
    pub raw_response: String,
    /// Reported version, kept as the JSON value the server sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Capability>,
}

impl ServerInfo {
    pub fn new(success: bool, server: String, raw_response: String) -> Self {
        let (status, message) = if success {
            (ProbeStatus::Success, SERVER_REACHABLE)
        } else {
            (ProbeStatus::Failed, SERVER_UNREACHABLE)
        };
        Self {
            status,
            message: message.to_string(),
            server,
            raw_response,
            version: None,
            features: Vec::new(),
        }
    }
}

/// What the functionality check returned: raw HTML or a server summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FunctionalityResponse {
    Html(String),
    Info(ServerInfo),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivitySummary {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
}

impl From<HttpResponse> for ConnectivitySummary {
    fn from(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionalitySummary {
    pub status: u16,
    pub status_text: String,
    pub response: FunctionalityResponse,
    pub is_html: bool,
    pub headers: BTreeMap<String, String>,
}

/// Result of a probe that reached the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    pub message: String,
    pub connectivity: ConnectivitySummary,
    pub functionality: FunctionalitySummary,
}

impl ProbeResult {
    pub fn is_html(&self) -> bool {
        self.functionality.is_html
    }

    /// Feature tags of the functionality response, empty for HTML.
    pub fn features(&self) -> &[Capability] {
        match &self.functionality.response {
            FunctionalityResponse::Info(info) => &info.features,
            FunctionalityResponse::Html(_) => &[],
        }
    }
}

/// Final outcome of [`run_probe`](super::ProbeExecutor::run_probe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Input validation failed; no request was sent
    Rejected { message: String },
    /// Both checks ran (or the functionality check was reached)
    Completed(Box<ProbeResult>),
    /// The pipeline aborted
    Failed(ProbeError),
}

impl ProbeOutcome {
    pub fn message(&self) -> &str {
        match self {
            ProbeOutcome::Rejected { message } => message,
            ProbeOutcome::Completed(result) => &result.message,
            ProbeOutcome::Failed(_) => FAILED_TO_TEST_SERVER,
        }
    }

    pub fn error_detail(&self) -> Option<ErrorDetail> {
        match self {
            ProbeOutcome::Failed(err) => Some(err.detail()),
            _ => None,
        }
    }
}
