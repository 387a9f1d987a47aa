//! API request handlers

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::models::ProxyRequest;
use super::server::AppState;
use crate::llm::LLMError;

pub const MISSING_API_KEY: &str = "API key is not configured on the server.";

/// Failures of one proxied call. All of them surface as a 500 JSON error.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("{0}")]
    Body(String),

    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("API key is not configured on the server.")]
    MissingApiKey,

    #[error("{0}")]
    Upstream(#[from] LLMError),
}

/// Handle health check requests
pub async fn health_check(state: &AppState) -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "season-extractor",
        "version": env!("CARGO_PKG_VERSION"),
        "api_key_configured": state.api_key.is_some(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Parse the body, resolve the server key and forward exactly once.
///
/// The upstream JSON comes back verbatim whatever its status was.
pub async fn proxy_generate(state: &AppState, body: &[u8]) -> Result<Value, ProxyError> {
    let request: ProxyRequest = serde_json::from_slice(body)?;

    let api_key = state.api_key.as_deref().ok_or(ProxyError::MissingApiKey)?;

    let model = request.model_segment();
    debug!("Forwarding generate request for model {}", model);
    let data = state.llm.relay(&model, api_key, request.contents).await?;
    info!("📨 Relayed generate response for model {}", model);

    Ok(data)
}
