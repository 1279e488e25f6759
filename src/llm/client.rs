//! HTTP completion client for OpenAI, Anthropic and Ollama.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::{Config, LlmService};
use crate::error::LlmError;

use super::retry::retry_with_backoff;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 4096;

/// Plain text completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Agent: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Completion client for the configured provider.
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    service: LlmService,
    api_key: Option<String>,
    temperature: f32,
    max_retries: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
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
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl LlmClient {
    /// Build a client from `config`. `api_key` must already be resolved.
    pub fn new(config: &Config, api_key: Option<String>) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self {
            http,
            service: config.service.clone(),
            api_key,
            temperature: config.temperature,
            max_retries: config.max_retries,
        })
    }

    pub fn service(&self) -> &LlmService {
        &self.service
    }

    async fn complete_once(&self, prompt: &str) -> Result<String, LlmError> {
        let provider = self.service.provider();
        let endpoint = self.service.endpoint().trim_end_matches('/').to_string();
        let messages = [Message {
            role: "user",
            content: prompt,
        }];

        let request = match &self.service {
            LlmService::OpenAi { model, .. } => self
                .http
                .post(format!("{endpoint}/chat/completions"))
                .bearer_auth(self.api_key.as_deref().unwrap_or_default())
                .json(&json!({
                    "model": model,
                    "messages": messages,
                    "temperature": self.temperature,
                })),
            LlmService::Anthropic { model, .. } => self
                .http
                .post(format!("{endpoint}/v1/messages"))
                .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": model,
                    "max_tokens": ANTHROPIC_MAX_TOKENS,
                    "messages": messages,
                    "temperature": self.temperature,
                })),
            LlmService::Ollama { model, .. } => self
                .http
                .post(format!("{endpoint}/api/chat"))
                .json(&json!({
                    "model": model,
                    "messages": messages,
                    "stream": false,
                    "options": { "temperature": self.temperature },
                })),
        };

        debug!("Sending completion request to {} ({})", provider, endpoint);

        let response = request
            .send()
            .await
            .map_err(|source| LlmError::Request { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        let text = match &self.service {
            LlmService::OpenAi { .. } => {
                let parsed: OpenAiResponse = response
                    .json()
                    .await
                    .map_err(|source| LlmError::Request { provider, source })?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .unwrap_or_default()
            }
            LlmService::Anthropic { .. } => {
                let parsed: AnthropicResponse = response
                    .json()
                    .await
                    .map_err(|source| LlmError::Request { provider, source })?;
                parsed
                    .content
                    .into_iter()
                    .filter(|b| b.kind == "text")
                    .map(|b| b.text)
                    .collect::<Vec<_>>()
                    .join("")
            }
            LlmService::Ollama { .. } => {
                let parsed: OllamaResponse = response
                    .json()
                    .await
                    .map_err(|source| LlmError::Request { provider, source })?;
                parsed.message.content
            }
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion(provider));
        }
        Ok(text)
    }
}

#[async_trait]
impl Agent for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        retry_with_backoff(
            self.max_retries,
            || self.complete_once(prompt),
            LlmError::is_transient,
            |attempts, last| LlmError::RetriesExhausted {
                attempts,
                last: Box::new(last),
            },
        )
        .await
    }
}
