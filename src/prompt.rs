use crate::llm::{Content, GenerateContentRequest, Part};
use std::path::Path;
use tracing::{debug, warn};

/// Lead-in placed before the user's pasted list
pub const RAW_LIST_PREFIX: &str = "Here is the raw list of URLs to process:\n";

/// Default instruction block sent ahead of the pasted URL list
pub fn default_instruction() -> &'static str {
    r#"You are a Data Extraction Specialist.
Your Task: Analyze the provided list of video URLs.
1. Extract the Series Name, Season Number (e.g., S01), and Episode Number (e.g., E05) from the filename.
2. Generate a clean "title" based on the filename (e.g., "Series Name Episode 5").
3. "overview" field should remain an empty string "".
4. Group the episodes by Season.

REQUIRED OUTPUT FORMAT (Strict JSON Array):
[
  {
    "season_number": 1,
    "episodes": [
      {
        "episode_number": 1,
        "title": "Cleaned Title Here",
        "videoUrl": "Original Link Here",
        "overview": ""
      }
    ]
  }
]

RULES:
- Return ONLY valid JSON.
- Do not include markdown formatting (like ```json).
- If the text provided is not a URL, ignore it."#
}

/// Resolve the instruction text, preferring a readable prompt file
pub async fn load_instruction(prompt_path: Option<&Path>) -> String {
    let Some(path) = prompt_path else {
        return default_instruction().to_string();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) if !content.trim().is_empty() => {
            debug!("Using instruction prompt from {}", path.display());
            content.trim().to_string()
        }
        Ok(_) => {
            warn!("Prompt file {} is empty, using built-in instruction", path.display());
            default_instruction().to_string()
        }
        Err(e) => {
            warn!(
                "Failed to load prompt from {}: {}, using built-in instruction",
                path.display(),
                e
            );
            default_instruction().to_string()
        }
    }
}

/// One content block: the instruction part followed by the pasted list
pub fn build_request(instruction: &str, raw_text: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: None,
            parts: vec![
                Part::text(instruction),
                Part::text(format!("{}{}", RAW_LIST_PREFIX, raw_text)),
            ],
        }],
    }
}
