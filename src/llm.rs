use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// LLM provider. Selects the API format and endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Generative Language API (`generateContent`).
    #[default]
    Gemini,
    /// Any OpenAI-compatible chat-completions API (together.ai, local ollama, etc.)
    #[serde(rename = "openai")]
    OpenAi,
}

impl Provider {
    fn default_base_url(&self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Self::OpenAi => "http://localhost:11434/v1",
        }
    }

    fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::Gemini => "GEMINI_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior conversation turn passed along with a prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    http: HttpClient,
}

// -- Gemini format --

/// Provider-side content blocking is turned off; screening happens in
/// [`crate::safety`] instead.
const GEMINI_SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    system_instruction: GeminiContent<'a>,
    contents: Vec<GeminiContent<'a>>,
    safety_settings: Vec<GeminiSafetySetting>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GeminiSafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

// -- OpenAI-compatible format --

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Msg<'a>>,
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        api_key: String,
        model: String,
        max_tokens: u32,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = HttpClient::new(concat!("shopbot-actions/", env!("CARGO_PKG_VERSION")), timeout)?;
        let base_url = base_url
            .unwrap_or_else(|| provider.default_base_url().into())
            .trim_end_matches('/')
            .to_string();
        Ok(Self {
            provider,
            api_key,
            model,
            max_tokens,
            base_url,
            http,
        })
    }

    /// Build from config, reading the API key from the specified env var.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let env_var = config
            .api_key_env
            .clone()
            .unwrap_or_else(|| config.provider.default_api_key_env().into());
        let api_key = std::env::var(&env_var).unwrap_or_default();
        Self::new(
            config.provider.clone(),
            api_key,
            config.model.clone(),
            config.max_tokens,
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Send a system prompt, prior turns and the new user message; return the reply text.
    pub async fn complete(
        &self,
        system: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String> {
        debug!(provider = ?self.provider, model = %self.model, turns = history.len(), "sending LLM request");

        match self.provider {
            Provider::Gemini => self.complete_gemini(system, history, user_message).await,
            Provider::OpenAi => self.complete_openai(system, history, user_message).await,
        }
    }

    async fn complete_gemini(
        &self,
        system: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String> {
        let mut contents: Vec<GeminiContent<'_>> = history
            .iter()
            .map(|t| GeminiContent {
                role: Some(match t.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }),
                parts: vec![GeminiPart { text: &t.text }],
            })
            .collect();
        contents.push(GeminiContent {
            role: Some("user"),
            parts: vec![GeminiPart { text: user_message }],
        });

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system }],
            },
            contents,
            safety_settings: GEMINI_SAFETY_CATEGORIES
                .iter()
                .map(|&category| GeminiSafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response_text = self
            .http
            .post_json_raw(&url, &body, &[("x-goog-api-key", &self.api_key)])
            .await
            .map_err(|e| {
                warn!("Gemini API error: {e}");
                e
            })?;

        let resp: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse Gemini response: {e}")))?;

        gemini_text(resp)
    }

    async fn complete_openai(
        &self,
        system: &str,
        history: &[Turn],
        user_message: &str,
    ) -> Result<String> {
        let mut messages = vec![Msg {
            role: "system",
            content: system,
        }];
        messages.extend(history.iter().map(|t| Msg {
            role: match t.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &t.text,
        }));
        messages.push(Msg {
            role: "user",
            content: user_message,
        });

        let request = OpenAiRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages,
        };

        let body = serde_json::to_string(&request)
            .map_err(|e| Error::parse(format!("serialize request: {e}")))?;

        let url = format!("{}/chat/completions", self.base_url);
        let response_text = self
            .http
            .post_json_raw(
                &url,
                &body,
                &[("Authorization", &format!("Bearer {}", self.api_key))],
            )
            .await
            .map_err(|e| {
                warn!("LLM API error: {e}");
                e
            })?;

        let resp: OpenAiResponse = serde_json::from_str(&response_text)
            .map_err(|e| Error::parse(format!("parse LLM response: {e}")))?;

        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| Error::ai("empty response from LLM"))
    }
}

fn gemini_text(resp: GeminiResponse) -> Result<String> {
    if let Some(reason) = resp.prompt_feedback.and_then(|f| f.block_reason) {
        warn!(%reason, "Gemini blocked the prompt");
        return Err(Error::Blocked(reason));
    }

    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::ai("Gemini returned no candidates"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if let Some(reason) = candidate.finish_reason.filter(|r| r == "SAFETY") {
            return Err(Error::Blocked(reason));
        }
        return Err(Error::ai("Gemini response has no text content"));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<String> {
        gemini_text(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn gemini_joins_candidate_parts() {
        let text = parse(
            r#"{"candidates":[{"content":{"parts":[{"text":"Linen "},{"text":"breathes well."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(text, "Linen breathes well.");
    }

    #[test]
    fn gemini_block_reason_is_blocked_error() {
        let err = parse(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#).unwrap_err();
        assert!(matches!(err, Error::Blocked(ref r) if r == "OTHER"));
    }

    #[test]
    fn gemini_safety_finish_without_text_is_blocked() {
        let err = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
    }

    #[test]
    fn gemini_no_candidates_is_ai_error() {
        let err = parse(r#"{"candidates":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Ai(_)));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client = LlmClient::new(
            Provider::OpenAi,
            String::new(),
            "m".into(),
            10,
            Some("http://localhost:1/v1/".into()),
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:1/v1");
        assert!(!client.has_api_key());
    }
}
