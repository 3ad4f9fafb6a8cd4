//! Response shape classification.
//!
//! Everything here is pure: the pipeline hands over a finished response and
//! the target URL and gets back a tagged [`ResponseShape`]. The JSON sniffing
//! is a heuristic over common LLM/MCP response fields, not a contract.

use serde_json::{Map, Value};
use url::Url;

use super::http::HttpResponse;
use super::models::Capability;

const HTML_CONTENT_TYPES: [&str; 2] = ["text/html", "application/xhtml+xml"];
const HTML_PREFIXES: [&str; 3] = ["<!DOCTYPE", "<html", "<?xml"];
const TEXT_FIELDS: [&str; 4] = ["response", "output", "completion", "generated_text"];
const MEMORY_FIELDS: [&str; 3] = ["memory", "history", "conversation_id"];

const SMITHERY_HOST: &str = "smithery.ai";
const SMITHERY_MARKER: &str = "@smithery-ai/";
const UNKNOWN_SERVER: &str = "Unknown MCP Server";

/// Shape of a functionality response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// An HTML (or XML) page, passed through untouched
    Html(String),
    /// A body that parsed as JSON
    Json(JsonSummary),
    /// Anything else, kept as raw text
    Opaque(String),
}

impl ResponseShape {
    pub fn is_html(&self) -> bool {
        matches!(self, ResponseShape::Html(_))
    }
}

/// Facts extracted from a JSON body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonSummary {
    pub version: Option<Value>,
    pub features: Vec<Capability>,
    pub raw: String,
}

/// Classify a functionality response.
pub fn classify(response: &HttpResponse, target_url: &str) -> ResponseShape {
    if is_html(response.content_type(), &response.body) {
        return ResponseShape::Html(response.body.clone());
    }

    match serde_json::from_str::<Value>(&response.body) {
        Ok(value) => {
            let (version, features) = summarize(&value, target_url);
            ResponseShape::Json(JsonSummary {
                version,
                features,
                raw: response.body.clone(),
            })
        }
        Err(e) => {
            tracing::debug!(error = %e, "Could not parse response as JSON");
            ResponseShape::Opaque(response.body.clone())
        }
    }
}

/// Detect HTML by content type first, then by sniffing the body.
pub fn is_html(content_type: &str, body: &str) -> bool {
    if HTML_CONTENT_TYPES.iter().any(|ct| content_type.contains(ct)) {
        return true;
    }

    let body = body.trim();
    HTML_PREFIXES.iter().any(|prefix| body.starts_with(prefix)) || (body.contains("<head") && body.contains("<body"))
}

/// Extract a version and capability tags from a parsed JSON body.
///
/// Only objects carry fields. Any other truthy value is treated as an object
/// without fields, so only the URL-based checks can tag it; falsy values
/// yield nothing.
pub fn summarize(value: &Value, target_url: &str) -> (Option<Value>, Vec<Capability>) {
    match value {
        Value::Object(fields) => (extract_version(fields), extract_features(fields, target_url)),
        other if is_truthy(other) => (None, extract_features(&Map::new(), target_url)),
        _ => (None, Vec::new()),
    }
}

/// `version` and `model_version` are reported as sent; a non-string `model`
/// becomes `"Unknown"`.
fn extract_version(fields: &Map<String, Value>) -> Option<Value> {
    if let Some(version) = truthy_field(fields, "version").or_else(|| truthy_field(fields, "model_version")) {
        return Some(version.clone());
    }
    truthy_field(fields, "model").map(|model| match model {
        Value::String(name) => Value::String(name.clone()),
        _ => Value::String("Unknown".to_string()),
    })
}

/// Capability tags in check order; each tag appears at most once.
fn extract_features(fields: &Map<String, Value>, target_url: &str) -> Vec<Capability> {
    let mut features = Vec::new();
    let mut tag = |capability: Capability| {
        if !features.contains(&capability) {
            features.push(capability);
        }
    };

    if matches!(fields.get("choices"), Some(Value::Array(_))) {
        tag(Capability::TextGeneration);
    }

    if TEXT_FIELDS.iter().any(|name| truthy_field(fields, name).is_some()) {
        tag(Capability::TextProcessing);
    }

    let model = truthy_field(fields, "model");
    if let Some(Value::String(name)) = model
        && name.contains("gpt")
    {
        tag(Capability::LanguageModel);
    }

    // Name-based checks apply only when the model is a string or absent
    let model_name = match model {
        None => Some(String::new()),
        Some(Value::String(name)) => Some(name.to_lowercase()),
        Some(_) => None,
    };
    if let Some(model_name) = model_name {
        if model_name.contains("sequential") || target_url.to_lowercase().contains("sequential") {
            tag(Capability::SequentialProcessing);
        }

        if model_name.contains("reasoning")
            || truthy_field(fields, "reasoning").is_some()
            || truthy_field(fields, "thoughts").is_some()
        {
            tag(Capability::AiReasoning);
        }
    }

    if MEMORY_FIELDS.iter().any(|name| truthy_field(fields, name).is_some()) {
        tag(Capability::Memory);
    }

    features
}

/// Human-readable server name for a target URL.
pub fn server_name(target_url: &str) -> String {
    let Ok(url) = Url::parse(target_url) else {
        return UNKNOWN_SERVER.to_string();
    };
    let host = url.host_str().unwrap_or_default();

    if host.contains(SMITHERY_HOST) {
        return smithery_name(target_url)
            .map(|name| format!("{name} (Smithery)"))
            .unwrap_or_else(|| "Smithery MCP Server".to_string());
    }

    if host.is_empty() {
        UNKNOWN_SERVER.to_string()
    } else {
        host.to_string()
    }
}

/// `.../@smithery-ai/sequential-thinking/...` becomes `Sequential Thinking`.
fn smithery_name(target_url: &str) -> Option<String> {
    let start = target_url.find(SMITHERY_MARKER)? + SMITHERY_MARKER.len();
    let segment = target_url[start..].split('/').next().filter(|s| !s.is_empty())?;
    Some(title_case(&segment.replace('-', " ")))
}

/// Uppercase every word character that starts a word. Word characters are
/// ASCII letters, digits and `_`.
fn title_case(text: &str) -> String {
    let mut previous_is_word = false;
    text.chars()
        .map(|c| {
            let is_word = c.is_ascii_alphanumeric() || c == '_';
            let mapped = if is_word && !previous_is_word {
                c.to_uppercase().collect::<String>()
            } else {
                c.to_string()
            };
            previous_is_word = is_word;
            mapped
        })
        .collect()
}

fn truthy_field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|value| is_truthy(value))
}

/// JSON truthiness: null, false, zero and the empty string are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
