//! Hosted chat-completion client.
//!
//! [`LanguageModel`] is a single-capability adapter: turn a prompt into
//! text. [`LanguageModel::complete`] reports failures; the provided
//! [`LanguageModel::generate`] never fails and substitutes
//! [`GENERATION_FALLBACK`] instead.
//!
//! [`HuggingFaceChatModel`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint, by default the Hugging Face router serving
//! `meta-llama/Meta-Llama-3-8B-Instruct`. Each call sends a fixed system
//! instruction followed by the prompt as the user message, with fixed
//! `max_tokens` and `temperature`. There are no retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::LlmConfig;

pub const SYSTEM_PROMPT: &str = "You are a helpful Ayurveda advisor.";

/// Returned by [`LanguageModel::generate`] when the call fails.
pub const GENERATION_FALLBACK: &str = "⚠️ Error generating response.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} is not set. Add it to your environment variables.")]
    MissingToken(String),
    #[error("chat-completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat-completion endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid chat-completion response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("chat-completion response contained no message content")]
    EmptyResponse,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    async fn generate(&self, prompt: &str) -> String {
        match self.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(model = self.model_name(), error = %e, "generation failed");
                GENERATION_FALLBACK.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct HuggingFaceChatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    token: String,
    system_prompt: String,
    max_new_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for HuggingFaceChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceChatModel")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl HuggingFaceChatModel {
    /// Build a client from configuration.
    ///
    /// Reads the access token from the environment variable named by
    /// `config.token_env` and fails immediately if it is missing or empty.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| LlmError::MissingToken(config.token_env.clone()))?;

        Self::with_token(config, token)
    }

    pub fn with_token(config: &LlmConfig, token: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        tracing::info!(model = %config.model, base_url = %config.base_url, "chat model ready");

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token: token.into(),
            system_prompt: config.system_prompt.clone(),
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_new_tokens,
            temperature: self.temperature,
            stream: false,
        }
    }
}

#[async_trait]
impl LanguageModel for HuggingFaceChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_completion(&body)
    }
}

/// Extract `choices[0].message.content`, trimmed.
fn parse_completion(body: &str) -> Result<String, LlmError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(content)
}
