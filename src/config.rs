use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Shop backend connection. The internal API key is sent as `x-api-key`.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_internal_api_key")]
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            api_key: default_internal_api_key(),
            timeout_secs: default_timeout_secs(),
            search_limit: default_search_limit(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: crate::llm::Provider,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: crate::llm::Provider::default(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
            api_key_env: None,
            base_url: None,
        }
    }
}

// Defaults
fn default_bind() -> String {
    std::env::var("ACTION_SERVER_BIND").unwrap_or_else(|_| "0.0.0.0:5055".into())
}
fn default_backend_url() -> String {
    std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3001".into())
}
fn default_internal_api_key() -> String {
    std::env::var("INTERNAL_API_KEY").unwrap_or_default()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_search_limit() -> u32 {
    5
}
fn default_true() -> bool {
    true
}
fn default_model() -> String {
    std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".into())
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_llm_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| Error::config(format!("Failed to parse config: {e}")))
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match std::fs::metadata(path) {
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found; using defaults");
                Ok(Self::default())
            }
            _ => Self::load(path),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.backend.base_url.starts_with("http://")
            && !self.backend.base_url.starts_with("https://")
        {
            return Err(Error::config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                self.backend.base_url
            )));
        }
        if self.backend.timeout_secs == 0 {
            return Err(Error::config("backend.timeout_secs must be greater than 0"));
        }
        Ok(())
    }
}
