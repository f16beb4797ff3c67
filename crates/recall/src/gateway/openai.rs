//! Completion gateway for OpenAI-compatible APIs
//!
//! Any chat-completions endpoint works: URL, model, and API-key environment
//! variable come from configuration. Rate-limited requests are retried with
//! exponential backoff; all other failures surface as generation errors so
//! the turn aborts before write-back.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{RecallError, Result};
use crate::gateway::prompt::{render_messages, ChatMessage};
use crate::gateway::CompletionGateway;
use crate::memory::types::ContextBundle;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Gateway to an OpenAI-compatible chat-completions API
#[derive(Debug)]
pub struct OpenAiGateway {
    client: Client,
    config: GatewayConfig,
    api_key: String,
}

impl OpenAiGateway {
    /// Create a gateway from configuration
    ///
    /// Reads the API key from the environment variable named in
    /// `config.api_key_env`; errors if it is not set.
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            RecallError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;
        Self::with_api_key(config, api_key)
    }

    /// Create a gateway with an explicit API key
    pub fn with_api_key(config: &GatewayConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RecallError::Generation(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
        })
    }

    async fn call_api(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        debug!("Calling completion API at: {url}");

        let mut last_error = None;
        let mut delay = Duration::from_secs(1);

        for attempt in 0..MAX_RETRIES {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{MAX_RETRIES}, waiting {delay:?}",
                            attempt + 1
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "unknown error".to_string());
                        return Err(RecallError::Generation(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| RecallError::Generation(e.to_string()))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| RecallError::Generation("empty response".to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_RETRIES - 1 {
                        warn!(
                            "Request failed on attempt {}/{MAX_RETRIES}, retrying: {err_msg}",
                            attempt + 1
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(RecallError::Generation(format!(
            "failed after {MAX_RETRIES} retries: {}",
            last_error.unwrap_or_else(|| "unknown error".to_string())
        )))
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn generate(&self, bundle: &ContextBundle, user_message: &str) -> Result<String> {
        let messages = render_messages(bundle, user_message);
        self.call_api(messages).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
