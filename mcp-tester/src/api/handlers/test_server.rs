//! HTTP handler for the endpoint probe.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::AppState;
use crate::errors::Error;
use crate::probes::models::{FAILED_TO_TEST_SERVER, ProbeOutcome, ProbeRequest};

/// POST /api/test-mcp - Probe the endpoint named in the body.
///
/// A body sent without a JSON content type is treated as empty, so it is
/// rejected for the missing URL rather than for its encoding.
#[tracing::instrument(skip_all)]
pub async fn test_server(
    State(state): State<AppState>,
    payload: Result<Json<ProbeRequest>, JsonRejection>,
) -> Result<ProbeOutcome, Error> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(JsonRejection::MissingJsonContentType(_)) => ProbeRequest::default(),
        Err(rejection) => {
            return Err(Error::BadRequest {
                message: rejection.body_text(),
            });
        }
    };

    Ok(state.executor.run_probe(&request).await)
}

impl IntoResponse for ProbeOutcome {
    fn into_response(self) -> Response {
        match self {
            ProbeOutcome::Rejected { message } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "message": message,
                })),
            )
                .into_response(),
            ProbeOutcome::Completed(result) => (StatusCode::OK, Json(result)).into_response(),
            ProbeOutcome::Failed(err) => {
                tracing::error!("Error testing MCP server: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": FAILED_TO_TEST_SERVER,
                        "error": err.detail(),
                    })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::probes::{HttpResponse, MockHttpClient, TransportError};
    use crate::test_utils::create_test_app;
    use axum::http::StatusCode;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;

    const ENDPOINT: &str = "/api/test-mcp";

    #[test_log::test(tokio::test)]
    async fn test_missing_server_url_is_rejected_without_probing() {
        let mock = MockHttpClient::new();
        let app = create_test_app(&mock);

        for body in [json!({}), json!({ "serverUrl": "" }), json!({ "apiKey": "k" })] {
            let response = app.post(ENDPOINT).json(&body).await;

            response.assert_status(StatusCode::BAD_REQUEST);
            response.assert_json(&json!({ "success": false, "message": "Server URL is required" }));
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_body_without_json_content_type_counts_as_empty() {
        let mock = MockHttpClient::new();
        let app = create_test_app(&mock);

        let response = app.post(ENDPOINT).text(r#"{"serverUrl":"https://example.com/mcp"}"#).await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "success": false, "message": "Server URL is required" }));
        assert_eq!(mock.call_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_malformed_json_is_a_bad_request() {
        let mock = MockHttpClient::new();
        let app = create_test_app(&mock);

        let response = app
            .post(ENDPOINT)
            .text("{\"serverUrl\": ")
            .content_type("application/json")
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["success"], false);
        assert!(!body["message"].as_str().unwrap().is_empty());

        let response = app.post(ENDPOINT).json(&json!({ "serverUrl": 42 })).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[test_log::test(tokio::test)]
    async fn test_successful_probe_response_shape() {
        let mock = MockHttpClient::new();
        mock.add_response("HEAD /mcp", Ok(HttpResponse::new(200).with_header("server", "demo")));
        mock.add_response(
            "POST /mcp",
            Ok(HttpResponse::new(200)
                .with_header("content-type", "application/json")
                .with_body(r#"{"model":"gpt-3.5","response":"hi"}"#)),
        );
        let app = create_test_app(&mock);

        let response = app
            .post(ENDPOINT)
            .json(&json!({ "serverUrl": "https://example.com/mcp", "apiKey": "secret" }))
            .await;

        response.assert_status_ok();
        response.assert_json(&json!({
            "success": true,
            "message": "MCP server is reachable",
            "connectivity": {
                "status": 200,
                "statusText": "OK",
                "headers": { "server": "demo" }
            },
            "functionality": {
                "status": 200,
                "statusText": "OK",
                "response": {
                    "status": "success",
                    "message": "MCP server is reachable",
                    "server": "example.com",
                    "_rawResponse": "{\"model\":\"gpt-3.5\",\"response\":\"hi\"}",
                    "version": "gpt-3.5",
                    "features": ["Text Processing", "Language Model"]
                },
                "isHtml": false,
                "headers": { "content-type": "application/json" }
            }
        }));

        let calls = mock.get_calls();
        assert!(
            calls
                .iter()
                .all(|call| call.headers.contains(&("Authorization".to_string(), "Bearer secret".to_string())))
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_html_probe_returns_raw_page() {
        let page = "<html><head></head><body>docs</body></html>";
        let mock = MockHttpClient::new();
        mock.add_response("HEAD /", Ok(HttpResponse::new(200)));
        mock.add_response(
            "POST /",
            Ok(HttpResponse::new(200).with_header("content-type", "text/html").with_body(page)),
        );
        let app = create_test_app(&mock);

        let response = app.post(ENDPOINT).json(&json!({ "serverUrl": "https://docs.example.com" })).await;

        response.assert_status_ok();
        let body: Value = response.json();
        assert_eq!(body["message"], "Server responded with HTML content (displaying webpage)");
        assert_eq!(body["functionality"]["isHtml"], true);
        assert_eq!(body["functionality"]["response"], page);
    }

    #[test_log::test(tokio::test)]
    async fn test_upstream_server_error_is_500() {
        let mock = MockHttpClient::new();
        mock.add_response("HEAD /mcp", Ok(HttpResponse::new(502)));
        let app = create_test_app(&mock);

        let response = app.post(ENDPOINT).json(&json!({ "serverUrl": "https://example.com/mcp" })).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({
            "success": false,
            "message": "Failed to test server",
            "error": { "message": "Server error: 502 Bad Gateway" }
        }));
        assert_eq!(mock.methods(), vec!["HEAD"]);
    }

    #[test_log::test(tokio::test)]
    async fn test_unreadable_body_reports_upstream_status() {
        let mut headers = BTreeMap::new();
        headers.insert("content-length".to_string(), "100".to_string());
        let truncated = || TransportError::Body {
            status: 200,
            status_text: "OK".to_string(),
            headers: headers.clone(),
            message: "connection closed before message completed".to_string(),
        };

        let mock = MockHttpClient::new();
        mock.add_response("HEAD /mcp", Ok(HttpResponse::new(200)));
        mock.add_response("POST /mcp", Err(truncated()));
        mock.add_response("GET /mcp", Err(truncated()));
        let app = create_test_app(&mock);

        let response = app.post(ENDPOINT).json(&json!({ "serverUrl": "https://example.com/mcp" })).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({
            "success": false,
            "message": "Failed to test server",
            "error": {
                "status": 200,
                "statusText": "OK",
                "headers": { "content-length": "100" }
            }
        }));
    }

    #[test_log::test(tokio::test)]
    async fn test_invalid_url_is_500_with_message() {
        let mock = MockHttpClient::new();
        let app = create_test_app(&mock);

        let response = app.post(ENDPOINT).json(&json!({ "serverUrl": "example.com/mcp" })).await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = response.json();
        assert_eq!(body["message"], "Failed to test server");
        assert!(body["error"]["message"].as_str().unwrap().starts_with("Invalid URL"));
        assert_eq!(mock.call_count(), 0);
    }
}
