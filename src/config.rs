use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::llm::{DEFAULT_ENDPOINT_BASE, DEFAULT_MODEL};

/// Configuration for the season extractor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generative API settings
    pub llm: LLMConfig,

    /// Proxy server settings
    pub server: ServerConfig,

    /// Converter front-end settings
    pub ui: UiConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

/// Generative API settings shared by the converter and the proxy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    pub endpoint_base: String,

    /// Model the converter asks for
    pub model: String,

    /// Request timeout in seconds. `None` leaves it to the transport defaults.
    pub timeout_seconds: Option<u64>,

    /// Optional file replacing the built-in instruction prompt
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Server-held API key. Never written back to disk.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Directory with the static front-end, served at `/` when set
    pub static_dir: Option<PathBuf>,

    /// Allowed CORS origins. Empty means any origin.
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How long the "Copied!" label stays before reverting
    pub copy_feedback_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            endpoint_base: DEFAULT_ENDPOINT_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_seconds: None,
            prompt_file: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8788,
            api_key: None,
            static_dir: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            copy_feedback_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "season_extractor=info,warn".to_string(),
        }
    }
}

impl LLMConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

impl UiConfig {
    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }
}

impl Config {
    /// Load configuration from an explicit file, or the first file found in the
    /// default locations, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_default_locations(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn from_default_locations() -> Self {
        let config_paths = ["season-extractor.toml", "config/season-extractor.toml"];

        for path in &config_paths {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            match Self::from_file(path) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("{:#}", e),
            }
        }

        tracing::debug!("No configuration file found, using defaults");
        Self::default()
    }

    /// Load configuration from defaults plus environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Override settings from a variable lookup (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(api_key) = lookup("GOOGLE_API_KEY").filter(|k| !k.is_empty()) {
            self.server.api_key = Some(api_key);
        }

        if let Some(model) = lookup("SEASON_EXTRACTOR_MODEL") {
            self.llm.model = model;
        }

        if let Some(endpoint) = lookup("SEASON_EXTRACTOR_ENDPOINT") {
            self.llm.endpoint_base = endpoint;
        }

        if let Some(host) = lookup("SEASON_EXTRACTOR_HOST") {
            self.server.host = host;
        }

        if let Some(port) = lookup("SEASON_EXTRACTOR_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid SEASON_EXTRACTOR_PORT: {}", port),
            }
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must not be empty"));
        }

        url::Url::parse(&self.llm.endpoint_base)
            .map_err(|e| anyhow!("llm.endpoint_base is not a valid URL: {}", e))?;

        if self.llm.timeout_seconds == Some(0) {
            return Err(anyhow!("llm.timeout_seconds must be greater than 0"));
        }

        if let Some(dir) = &self.server.static_dir {
            if !dir.is_dir() {
                return Err(anyhow!("server.static_dir is not a directory: {}", dir.display()));
            }
        }

        tracing::debug!("Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Season Extractor Configuration:\n\
            - Endpoint: {}\n\
            - Model: {}\n\
            - Timeout: {}\n\
            - Listen: {}:{}\n\
            - Server API key: {}\n\
            - Static dir: {}",
            self.llm.endpoint_base,
            self.llm.model,
            self.llm
                .timeout_seconds
                .map(|s| format!("{}s", s))
                .unwrap_or_else(|| "transport default".to_string()),
            self.server.host,
            self.server.port,
            if self.server.api_key.is_some() { "configured" } else { "missing" },
            self.server
                .static_dir
                .as_ref()
                .map(|d| d.display().to_string())
                .unwrap_or_else(|| "none".to_string()),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_endpoint_base(mut self, endpoint_base: impl Into<String>) -> Self {
        self.config.llm.endpoint_base = endpoint_base.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.config.llm.model = model.into();
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.llm.timeout_seconds = Some(seconds);
        self
    }

    pub fn with_server_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.server.api_key = Some(api_key.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_static_dir(mut self, dir: PathBuf) -> Self {
        self.config.server.static_dir = Some(dir);
        self
    }

    pub fn with_copy_feedback_ms(mut self, millis: u64) -> Self {
        self.config.ui.copy_feedback_ms = millis;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
