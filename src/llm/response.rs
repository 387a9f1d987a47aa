//! Post-processing of the model's reply: pull out the text, strip markdown
//! fencing and parse what is left as JSON.

use super::GenerateContentResponse;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

const JSON_FENCE: &str = "```json";
const FENCE: &str = "```";

/// Ways the reply envelope can lack the text we need
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("Response contained no candidates{}", blocked_suffix(.block_reason))]
    NoCandidates { block_reason: Option<String> },

    #[error("First candidate has no content (finish reason: {})", or_unknown(.finish_reason))]
    NoContent { finish_reason: Option<String> },

    #[error("First candidate has no content parts")]
    NoParts,

    #[error("First content part has no text")]
    NoText,
}

fn blocked_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!(" (prompt blocked: {})", r))
        .unwrap_or_default()
}

fn or_unknown(reason: &Option<String>) -> &str {
    reason.as_deref().unwrap_or("unknown")
}

/// Text of the first part of the first candidate's content
pub fn extract_text(response: &GenerateContentResponse) -> Result<&str, ExtractError> {
    let candidate = response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .ok_or_else(|| ExtractError::NoCandidates {
            block_reason: response
                .prompt_feedback
                .as_ref()
                .and_then(|f| f.block_reason.clone()),
        })?;

    let content = candidate
        .content
        .as_ref()
        .ok_or_else(|| ExtractError::NoContent {
            finish_reason: candidate.finish_reason.clone(),
        })?;

    content
        .parts
        .first()
        .ok_or(ExtractError::NoParts)?
        .text
        .as_deref()
        .ok_or(ExtractError::NoText)
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker, then trim.
pub fn strip_code_fences(text: &str) -> String {
    text.replace(JSON_FENCE, "").replace(FENCE, "").trim().to_string()
}

/// Parse cleaned text as JSON. Any well-formed JSON is accepted.
pub fn parse_result(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// Pretty-print with two-space indentation
pub fn render_pretty(value: &Value) -> String {
    // Serializing a Value cannot fail: keys are always strings.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Season record in the shape the instruction prompt asks for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRecord {
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode_number: u32,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "videoUrl", default)]
    pub video_url: String,
    #[serde(default)]
    pub overview: String,
}

/// Counts derived from a parsed result, for display only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSummary {
    pub seasons: usize,
    pub episodes: usize,
}

/// Summarize a parsed result if it has the expected season/episode shape.
///
/// The shape is never enforced; anything else yields `None`.
pub fn summarize(value: &Value) -> Option<ResultSummary> {
    let seasons: Vec<SeasonRecord> = serde_json::from_value(value.clone()).ok()?;
    Some(ResultSummary {
        seasons: seasons.len(),
        episodes: seasons.iter().map(|s| s.episodes.len()).sum(),
    })
}
