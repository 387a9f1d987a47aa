//! Proxy API
//!
//! Forwards `generateContent` calls to the Gemini API using a key held on the
//! server, so browsers never see it.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::GeminiProvider;

pub mod handlers;
pub mod models;
pub mod server;

pub use server::{create_router, AppState};

/// API server for the generate proxy
pub struct ApiServer {
    config: Arc<Config>,
}

impl ApiServer {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Build the shared state: one provider, and the key resolved once
    pub fn app_state(&self) -> Result<AppState> {
        let llm = GeminiProvider::new(&self.config.llm)?;

        let api_key: Option<Arc<str>> = self.config.server.api_key.as_deref().map(Arc::from);
        if api_key.is_none() {
            warn!("⚠️ No server API key configured (GOOGLE_API_KEY); generate requests will fail");
        }

        Ok(AppState {
            llm: Arc::new(llm),
            api_key,
        })
    }

    /// Start the API server and run until shutdown
    pub async fn start(self) -> Result<()> {
        info!(
            "🚀 Starting proxy on {}:{}",
            self.config.server.host, self.config.server.port
        );
        let state = self.app_state()?;
        server::start_http_server(state, &self.config.server).await
    }
}
