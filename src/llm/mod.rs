pub mod providers;
pub mod response;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use providers::GeminiProvider;

/// Default base URL of the Gemini REST API
pub const DEFAULT_ENDPOINT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model used by the converter unless configured otherwise
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Message used when an upstream failure carries no readable error envelope
pub const GENERIC_API_FAILURE: &str = "API Request Failed";

/// Errors raised while talking to the generative API
#[derive(Debug, Error)]
pub enum LLMError {
    /// Network or protocol failure before a response was read.
    /// Built through `From`, which drops the URL (it carries the key).
    #[error("{0}")]
    Transport(reqwest::Error),

    /// The endpoint could not be built from the configured base, model and key
    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(String),

    /// The API answered with a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body was not the JSON we expected
    #[error("Failed to decode API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Transport(err.without_url())
    }
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
}

/// One content block: an ordered list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single part of content (only text is used here)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }
}

/// Top-level Gemini API response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Feedback about the prompt (e.g., if it was blocked)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub total_token_count: Option<u32>,
}

/// Error envelope returned by the API on failure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorEnvelope {
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ApiErrorEnvelope {
    /// Human-readable message, falling back to a generic one
    pub fn message(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(GENERIC_API_FAILURE)
            .to_string()
    }
}

/// Trait for generative API backends
#[async_trait]
pub trait LLM: Send + Sync {
    /// Issue one typed `generateContent` call. Non-success statuses become `LLMError::Api`.
    async fn generate_content(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LLMError>;

    /// Forward `{"contents": contents}` and hand back the reply JSON untouched,
    /// whatever the upstream status was.
    async fn relay(
        &self,
        model: &str,
        api_key: &str,
        contents: serde_json::Value,
    ) -> Result<serde_json::Value, LLMError>;
}
