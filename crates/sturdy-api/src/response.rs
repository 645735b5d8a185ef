//! Response body interpretation shared by the JSON and multipart entry points.

use reqwest::StatusCode;
use serde_json::Value;

use sturdy_core::error::{AppError, ErrorKind};
use sturdy_core::result::AppResult;

/// Interprets a successful response body.
///
/// JSON content is parsed; anything else comes back as text, except that a
/// body consisting solely of digits is coerced to a number — a handful of
/// platform endpoints return a bare numeric identifier as plain text.
pub(crate) fn parse_success_body(content_type: Option<&str>, text: &str) -> AppResult<Value> {
    if content_type.is_some_and(|ct| ct.contains("application/json")) {
        return serde_json::from_str(text).map_err(|e| {
            AppError::with_source(ErrorKind::Serialization, "Malformed JSON response body", e)
        });
    }

    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = text.parse::<i64>() {
            return Ok(Value::from(n));
        }
    }

    Ok(Value::String(text.to_string()))
}

/// Extracts the user-facing message for a non-success response.
///
/// Prefers the `message` field of a JSON error body; falls back to the
/// status line.
pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("message") {
            if !message.is_empty() {
                return message.clone();
            }
        }
    }

    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}
