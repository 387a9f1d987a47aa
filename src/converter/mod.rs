//! Converter front-end logic
//!
//! Drives the pure transitions in [`state`] against a generative API backend
//! and a clipboard. Front-ends only need to apply the emitted [`RenderOp`]s.

pub mod state;

pub use state::{
    ConvertError, ConvertInput, ConverterState, Effect, RenderOp, StatusKind, StatusLine,
    COPIED_LABEL, COPY_LABEL,
};

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clipboard::{Clipboard, ClipboardError};
use crate::llm::response::summarize;
use crate::llm::LLM;

/// Converter session: one screen's worth of state plus its collaborators
pub struct Converter<L: LLM, C: Clipboard> {
    llm: L,
    clipboard: C,
    model: String,
    instruction: String,
    copy_feedback: Duration,
    state: ConverterState,
}

impl<L: LLM, C: Clipboard> Converter<L, C> {
    pub fn new(llm: L, clipboard: C, model: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            llm,
            clipboard,
            model: model.into(),
            instruction: instruction.into(),
            copy_feedback: Duration::from_millis(2000),
            state: ConverterState::default(),
        }
    }

    pub fn with_copy_feedback(mut self, feedback: Duration) -> Self {
        self.copy_feedback = feedback;
        self
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }

    fn apply<F>(&mut self, transition: state::Transition, render: &mut F) -> Effect
    where
        F: FnMut(&RenderOp),
    {
        for op in &transition.render {
            render(op);
        }
        self.state = transition.state;
        transition.effect
    }

    /// Run one conversion. At most one API call is made, and none at all when
    /// the input fails validation.
    pub async fn convert<F>(&mut self, input: &ConvertInput, mut render: F) -> Result<Value, ConvertError>
    where
        F: FnMut(&RenderOp),
    {
        let valid = match state::validate(input) {
            Ok(valid) => valid,
            Err(err) => {
                debug!("Rejected conversion input: {}", err);
                self.apply(state::reject(&self.state, &err), &mut render);
                return Err(err);
            }
        };

        let transition = state::begin_convert(&self.state, valid, &self.instruction);
        let (api_key, request) = match self.apply(transition, &mut render) {
            Effect::CallApi { api_key, request } => (api_key, request),
            _ => unreachable!("begin_convert always requests a call"),
        };

        info!("🔍 Requesting season breakdown from {}", self.model);
        let outcome = self.llm.generate_content(&self.model, &api_key, &request).await;
        let result = state::process_reply(outcome);

        match &result {
            Ok(value) => match summarize(value) {
                Some(summary) => info!(
                    "✅ Parsed {} season(s) with {} episode(s)",
                    summary.seasons, summary.episodes
                ),
                None => info!("✅ Parsed reply (not in season/episode shape)"),
            },
            Err(err) => error!("Conversion failed: {}", err),
        }

        let transition = state::finish_convert(&self.state, &result);
        self.apply(transition, &mut render);
        result
    }

    /// Copy the displayed text, show feedback, and revert the label after the
    /// configured delay.
    pub async fn copy<F>(&mut self, mut render: F) -> Result<(), ClipboardError>
    where
        F: FnMut(&RenderOp),
    {
        if let Effect::WriteClipboard(text) = self.apply(state::begin_copy(&self.state), &mut render) {
            if let Err(e) = self.clipboard.write_text(&text) {
                warn!("Copy failed: {}", e);
                return Err(e);
            }
        }

        let transition = state::copy_succeeded(&self.state, self.copy_feedback);
        if let Effect::RevertCopyLabel { after, label } = self.apply(transition, &mut render) {
            tokio::time::sleep(after).await;
            self.apply(state::revert_copy_label(&self.state, &label), &mut render);
        }
        Ok(())
    }
}
