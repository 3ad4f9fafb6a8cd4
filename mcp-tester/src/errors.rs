use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

/// Service-level errors returned by HTTP handlers and startup code.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Request body could not be understood
    #[error("{message}")]
    BadRequest { message: String },

    /// Configuration failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::InvalidConfig { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::InvalidConfig { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::BadRequest { .. } => tracing::debug!("Client error: {}", self),
            Error::InvalidConfig { .. } => tracing::error!("Internal service error: {:#}", self),
        }

        let body = json!({
            "success": false,
            "message": self.user_message(),
        });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Failures of the probe pipeline.
///
/// Every variant is reported to the caller as a `500` with the message
/// `"Failed to test server"` and an `error` object built by [`ProbeError::detail`].
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Target could not be parsed as an absolute http(s) URL
    #[error("Invalid URL: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, DNS or timeout failure with no response at all
    #[error("{message}")]
    Transport { message: String },

    /// Status line and headers arrived but the body could not be read
    #[error("{message}")]
    IncompleteResponse {
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
        message: String,
    },

    /// Connectivity check answered with a 5xx status
    #[error("Server error: {status} {status_text}")]
    ServerError { status: u16, status_text: String },
}

/// The `error` object of a failed probe response.
///
/// Carries the upstream status and headers when a response was partially
/// received, otherwise only the failure message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    #[serde(rename_all = "camelCase")]
    Response {
        status: u16,
        status_text: String,
        headers: BTreeMap<String, String>,
    },
    Message { message: String },
}

impl ProbeError {
    pub fn detail(&self) -> ErrorDetail {
        match self {
            ProbeError::IncompleteResponse {
                status,
                status_text,
                headers,
                ..
            } => ErrorDetail::Response {
                status: *status,
                status_text: status_text.clone(),
                headers: headers.clone(),
            },
            other => ErrorDetail::Message { message: other.to_string() },
        }
    }
}
