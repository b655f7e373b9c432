//! Generative answers for open-ended questions, policy summaries and
//! product recommendations.

use crate::backend::Product;
use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::llm::{LlmClient, Turn};
use crate::safety::SYSTEM_PROMPT;
use tracing::{error, info, warn};

pub struct Assistant {
    client: Option<LlmClient>,
}

impl Assistant {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// An assistant that never calls out; every request reports the module inactive.
    pub fn disabled() -> Self {
        Self { client: None }
    }

    /// Disabled when turned off in config or when no API key is present.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        if !config.enabled {
            info!("generative assistant disabled in config");
            return Ok(Self::disabled());
        }
        let client = LlmClient::from_config(config)?;
        if !client.has_api_key() {
            error!("no API key found for the generative assistant; AI answers disabled");
            return Ok(Self::disabled());
        }
        info!(model = client.model(), "generative assistant initialized");
        Ok(Self::new(client))
    }

    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    async fn ask(&self, history: &[Turn], prompt: &str) -> Result<String> {
        let Some(client) = &self.client else {
            return Err(Error::ai("AI module not active"));
        };
        match client.complete(SYSTEM_PROMPT, history, prompt).await {
            Ok(text) => {
                let preview: String = text.chars().take(50).collect();
                info!(%preview, "assistant responded");
                Ok(text.trim().to_string())
            }
            Err(e) => {
                warn!("assistant generation failed: {e}");
                Err(e)
            }
        }
    }

    /// Answer a free-form question given the recent conversation.
    pub async fn handle_open_ended_query(&self, message: &str, history: &[Turn]) -> Result<String> {
        self.ask(history, message).await
    }

    /// Answer `query` using only `context` (e.g. a CMS page).
    pub async fn generate_response_with_context(&self, query: &str, context: &str) -> Result<String> {
        let prompt = format!(
            "{query}\n\nUse only the following information:\n---\n{context}\n---"
        );
        self.ask(&[], &prompt).await
    }

    /// Phrase a recommendation or comparison over `products`.
    pub async fn generate_response_with_products(
        &self,
        query: &str,
        products: &[Product],
    ) -> Result<String> {
        let prompt = format!(
            "{query}\n\nProducts from our catalog:\n{}\n\nTalk about style, fit and materials. \
             Do not mention prices or stock.",
            product_context(products)
        );
        self.ask(&[], &prompt).await
    }
}

fn product_context(products: &[Product]) -> String {
    products
        .iter()
        .map(|p| format!("- {} ({}): {}", p.name, p.category, p.description))
        .collect::<Vec<_>>()
        .join("\n")
}
