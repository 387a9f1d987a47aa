//! Season Extractor
//!
//! Sends a pasted list of video URLs to the Gemini API with a fixed instruction
//! prompt and turns the reply into a season/episode JSON hierarchy. A small
//! proxy server offers the same call with a server-held API key.

pub mod api;
pub mod clipboard;
pub mod config;
pub mod converter;
pub mod llm;
pub mod prompt;

// Re-export main types for easy access
pub use crate::api::{ApiServer, AppState};
pub use crate::clipboard::{Clipboard, ClipboardError, Osc52Clipboard};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::converter::{ConvertError, ConvertInput, Converter, ConverterState, RenderOp};
pub use crate::llm::{GeminiProvider, LLMError, LLM};
