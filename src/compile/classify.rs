//! Classification of failed compile-worker responses.
//!
//! The checks run in a fixed order: the 404 "target not found" marker, then
//! HTML detection, then JSON parsing, and finally raw text. HTML bodies are
//! never handed to the JSON parser.

use crate::constants::{
    LOG_TRUNCATION_MARKER, MAX_LOG_CHARS, MAX_RAW_ERROR_CHARS, TARGET_NOT_FOUND_MARKER,
};
use crate::errors::Error;
use serde_json::Value;

/// The shape of one failed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The compile target is missing from the repository.
    FileNotFound { path: String },
    /// An HTML page, typically from a proxy or load balancer.
    Html,
    /// A JSON error from the worker. `log` is already truncated.
    Structured { message: String, log: Option<String> },
    /// Anything else. `text` is already truncated.
    Raw { text: String },
}

impl FailureKind {
    pub fn into_error(self, status: u16) -> Error {
        match self {
            FailureKind::FileNotFound { path } => Error::FileNotFound { path },
            FailureKind::Html => Error::ServiceUnavailableHtml { status },
            FailureKind::Structured { message, log } => Error::StructuredCompile { message, log },
            FailureKind::Raw { text } => Error::RawService { status, text },
        }
    }
}

/// Classifies a non-2xx response body.
///
/// `target` is the requested compile target; when it is `None` (e.g. for
/// cache clears) a 404 is never reported as a missing file.
///
/// # Examples
/// ```
/// use papersync::compile::{classify_failure, FailureKind};
///
/// let kind = classify_failure(404, r#"{"error":"Target file not found: main.tex"}"#, Some("main.tex"));
/// assert_eq!(kind, FailureKind::FileNotFound { path: "main.tex".to_string() });
///
/// let kind = classify_failure(502, "<!DOCTYPE html><html>Bad gateway</html>", Some("main.tex"));
/// assert_eq!(kind, FailureKind::Html);
/// ```
pub fn classify_failure(status: u16, body: &str, target: Option<&str>) -> FailureKind {
    if let Some(target) = target {
        if status == 404 && mentions_missing_target(body) {
            return FailureKind::FileNotFound {
                path: target.to_string(),
            };
        }
    }

    if looks_like_html(body) {
        return FailureKind::Html;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => {
            let message = ["error", "message"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .filter(|m| !m.trim().is_empty())
                .unwrap_or("Compilation failed")
                .to_string();
            let log = fields.get("log").and_then(Value::as_str).map(truncate_log);
            FailureKind::Structured { message, log }
        }
        Ok(Value::String(message)) => FailureKind::Structured { message, log: None },
        Ok(_) => FailureKind::Structured {
            message: "Compilation failed".to_string(),
            log: None,
        },
        Err(_) => FailureKind::Raw {
            text: truncate_raw(body),
        },
    }
}

/// Whether the body (raw, or the JSON `error` field) carries the missing-target marker.
fn mentions_missing_target(body: &str) -> bool {
    let marker = TARGET_NOT_FOUND_MARKER.to_ascii_lowercase();
    if body.to_ascii_lowercase().contains(&marker) {
        return true;
    }
    if looks_like_html(body) {
        return false;
    }
    // Catches markers hidden behind JSON escapes.
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_ascii_lowercase))
        .is_some_and(|error| error.contains(&marker))
}

/// Whether the body is an HTML document rather than an API response.
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html")
}

/// Caps a compiler log at `MAX_LOG_CHARS` characters, marking the cut.
pub fn truncate_log(log: &str) -> String {
    match log.char_indices().nth(MAX_LOG_CHARS) {
        Some((cut, _)) => format!("{}{}", &log[..cut], LOG_TRUNCATION_MARKER),
        None => log.to_string(),
    }
}

/// Caps an unstructured error body at `MAX_RAW_ERROR_CHARS` characters with an ellipsis.
pub fn truncate_raw(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        return "empty response body".to_string();
    }
    match text.char_indices().nth(MAX_RAW_ERROR_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
