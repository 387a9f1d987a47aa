//! Converter screen state and the pure transitions between states.
//!
//! Every transition takes the current state and returns the next one plus the
//! render instructions a front-end needs to apply, and at most one side effect
//! for the driver to perform.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::llm::response::{extract_text, parse_result, render_pretty, strip_code_fences, ExtractError};
use crate::llm::{GenerateContentRequest, GenerateContentResponse, LLMError};
use crate::prompt::build_request;

pub const STATUS_ANALYZING: &str = "Analyzing filenames with Gemini...";
pub const STATUS_SUCCESS: &str = "Conversion Successful!";
pub const COPY_LABEL: &str = "Copy JSON";
pub const COPIED_LABEL: &str = "Copied!";

const ERROR_COLOR: &str = "#ff6b6b";
const NORMAL_COLOR: &str = "#a0a0a0";

/// Everything that can end a conversion attempt
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Please enter a valid Gemini API Key.")]
    MissingApiKey,

    #[error("Please paste some URLs.")]
    MissingInput,

    #[error("{0}")]
    Api(#[from] LLMError),

    #[error("{0}")]
    Extract(#[from] ExtractError),

    #[error("{0}")]
    Parse(#[from] serde_json::Error),
}

impl ConvertError {
    /// Local validation failures never reach the network
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::MissingApiKey | Self::MissingInput)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Normal,
    Success,
    Error,
}

impl StatusKind {
    /// Colour cue shown with the status text
    pub fn color(self) -> &'static str {
        match self {
            StatusKind::Error => ERROR_COLOR,
            StatusKind::Normal | StatusKind::Success => NORMAL_COLOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusLine {
    pub text: String,
    pub kind: StatusKind,
}

impl StatusLine {
    fn new(text: impl Into<String>, kind: StatusKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    fn error(err: &ConvertError) -> Self {
        Self::new(format!("Error: {}", err), StatusKind::Error)
    }
}

/// Visible state of the converter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterState {
    pub status: StatusLine,
    pub result_visible: bool,
    pub output: String,
    pub copy_label: String,
}

impl Default for ConverterState {
    fn default() -> Self {
        Self {
            status: StatusLine::default(),
            result_visible: false,
            output: String::new(),
            copy_label: COPY_LABEL.to_string(),
        }
    }
}

/// What a front-end has to change on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    SetStatus(StatusLine),
    HideResults,
    ShowResults(String),
    SetCopyLabel(String),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    /// The single outbound call a valid trigger produces
    CallApi {
        api_key: String,
        request: GenerateContentRequest,
    },
    WriteClipboard(String),
    /// Put `label` back on the copy button once `after` has elapsed
    RevertCopyLabel { after: Duration, label: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ConverterState,
    pub render: Vec<RenderOp>,
    pub effect: Effect,
}

/// User input for one conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertInput {
    pub api_key: String,
    pub raw_text: String,
}

/// Input that passed validation (both fields trimmed and non-empty)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidInput {
    api_key: String,
    raw_text: String,
}

pub fn validate(input: &ConvertInput) -> Result<ValidInput, ConvertError> {
    let api_key = input.api_key.trim();
    let raw_text = input.raw_text.trim();

    if api_key.is_empty() {
        return Err(ConvertError::MissingApiKey);
    }
    if raw_text.is_empty() {
        return Err(ConvertError::MissingInput);
    }

    Ok(ValidInput {
        api_key: api_key.to_string(),
        raw_text: raw_text.to_string(),
    })
}

/// Show an error status; everything else stays as it was
pub fn reject(state: &ConverterState, err: &ConvertError) -> Transition {
    let status = StatusLine::error(err);
    Transition {
        state: ConverterState {
            status: status.clone(),
            ..state.clone()
        },
        render: vec![RenderOp::SetStatus(status)],
        effect: Effect::None,
    }
}

/// Announce the request, hide stale results and ask for the API call
pub fn begin_convert(state: &ConverterState, input: ValidInput, instruction: &str) -> Transition {
    let status = StatusLine::new(STATUS_ANALYZING, StatusKind::Normal);
    Transition {
        state: ConverterState {
            status: status.clone(),
            result_visible: false,
            ..state.clone()
        },
        render: vec![RenderOp::SetStatus(status), RenderOp::HideResults],
        effect: Effect::CallApi {
            request: build_request(instruction, &input.raw_text),
            api_key: input.api_key,
        },
    }
}

/// Turn the API outcome into parsed JSON: extract, strip fences, parse
pub fn process_reply(
    outcome: Result<GenerateContentResponse, LLMError>,
) -> Result<Value, ConvertError> {
    let response = outcome?;
    let text = extract_text(&response)?;
    let cleaned = strip_code_fences(text);
    Ok(parse_result(&cleaned)?)
}

pub fn finish_convert(state: &ConverterState, result: &Result<Value, ConvertError>) -> Transition {
    let value = match result {
        Ok(value) => value,
        Err(err) => return reject(state, err),
    };

    let output = render_pretty(value);
    let status = StatusLine::new(STATUS_SUCCESS, StatusKind::Success);
    Transition {
        state: ConverterState {
            status: status.clone(),
            result_visible: true,
            output: output.clone(),
            ..state.clone()
        },
        render: vec![RenderOp::ShowResults(output), RenderOp::SetStatus(status)],
        effect: Effect::None,
    }
}

/// Copy whatever text is currently displayed
pub fn begin_copy(state: &ConverterState) -> Transition {
    Transition {
        state: state.clone(),
        render: Vec::new(),
        effect: Effect::WriteClipboard(state.output.clone()),
    }
}

/// Show "Copied!" and remember whatever label was showing before
pub fn copy_succeeded(state: &ConverterState, feedback: Duration) -> Transition {
    Transition {
        state: ConverterState {
            copy_label: COPIED_LABEL.to_string(),
            ..state.clone()
        },
        render: vec![RenderOp::SetCopyLabel(COPIED_LABEL.to_string())],
        effect: Effect::RevertCopyLabel {
            after: feedback,
            label: state.copy_label.clone(),
        },
    }
}

pub fn revert_copy_label(state: &ConverterState, label: &str) -> Transition {
    Transition {
        state: ConverterState {
            copy_label: label.to_string(),
            ..state.clone()
        },
        render: vec![RenderOp::SetCopyLabel(label.to_string())],
        effect: Effect::None,
    }
}
