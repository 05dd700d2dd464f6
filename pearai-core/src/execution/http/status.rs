//! Classification of non-success HTTP responses.

use crate::error::LlmError;

/// Turn a non-success status and its body into an `ApiError`.
///
/// JSON bodies are kept as `details`; their `error`/`detail`/`message`
/// string, when present, becomes the message. Otherwise the raw body text is
/// used, falling back to the status' canonical reason.
pub fn classify_http_error(status: u16, body: &str) -> LlmError {
    let details = serde_json::from_str::<serde_json::Value>(body).ok();
    let from_json = details.as_ref().and_then(|v| {
        ["error", "detail", "message"]
            .iter()
            .find_map(|key| v.get(key).and_then(|m| m.as_str()))
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("request failed")
                .to_string()
        } else {
            trimmed.to_string()
        }
    });

    LlmError::ApiError {
        code: status,
        message,
        details,
    }
}
