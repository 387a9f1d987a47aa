//! API data models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body accepted by the generate proxy. Neither field is checked: `contents`
/// is forwarded untouched and `model` only becomes a path segment.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyRequest {
    #[serde(default)]
    pub model: Value,
    #[serde(default)]
    pub contents: Value,
}

impl ProxyRequest {
    /// Model as it appears in `models/{model}:generateContent`.
    ///
    /// Strings are used as-is, an absent model prints as `undefined` and any
    /// other value as its compact JSON text.
    pub fn model_segment(&self) -> String {
        match &self.model {
            Value::String(model) => model.clone(),
            Value::Null => "undefined".to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON error body returned with 500 responses
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
