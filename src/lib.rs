pub mod actions;
pub mod assistant;
pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod llm;
pub mod output;
pub mod safety;
pub mod server;
pub mod tracker;

/// CLI override for LLM provider/model.
pub struct LlmOverride {
    pub provider: llm::Provider,
    pub model: String,
}

impl LlmOverride {
    /// Apply the override on top of the `[llm]` config section.
    pub fn apply(self, config: &mut config::LlmConfig) {
        config.provider = self.provider;
        config.model = self.model;
    }
}
