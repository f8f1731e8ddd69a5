use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed-shape response body: `{"error": bool, "message"?: string, "data"?: any}`.
///
/// Failures carry `message`, successes carry `data`. Nothing enforces the
/// split; empty fields are simply left out of the serialized object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub error: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            error: false,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            data: None,
        }
    }
}
