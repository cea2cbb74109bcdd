//! Error body returned by the optimizer service.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error payload of a non-2xx optimizer response.
///
/// Every field is optional; services behind gateways do not always send one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Keys that may carry the human-readable message, in order of preference
const MESSAGE_KEYS: &[&str] = &["message", "detail", "error"];

impl ApiError {
    /// Best-effort parse of an error body. Returns `None` for bodies that are
    /// not JSON objects or carry neither a code nor a message.
    ///
    /// The message is the first string found under `message`, `detail` or
    /// `error`; a numeric `code` is kept as its decimal text.
    pub fn from_body(body: &str) -> Option<Self> {
        let parsed: serde_json::Value = serde_json::from_str(body).ok()?;
        let object = parsed.as_object()?;

        let code = object.get("code").and_then(|code| match code {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
        let message = MESSAGE_KEYS
            .iter()
            .find_map(|key| object.get(*key).and_then(|v| v.as_str()))
            .map(str::to_string);

        if code.is_none() && message.is_none() {
            return None;
        }
        Some(Self { code, message })
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{}: {}", code, message),
            (Some(code), None) => f.write_str(code),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("unknown error"),
        }
    }
}
