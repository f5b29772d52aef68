//! Chat-completion model client for qualitative finding analysis

pub mod parse;
pub mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Model endpoint rate limited")]
    RateLimited,

    #[error("Model credits exhausted")]
    CreditsExhausted,

    #[error("Model endpoint returned HTTP {0}")]
    Upstream(u16),

    #[error("Empty response from model")]
    EmptyResponse,
}

/// Seam for the external model endpoint, substitutable in tests
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a system + user prompt pair and return the raw message
    /// content of the first choice
    async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError>;

    /// Model identifier recorded in the audit trail
    fn model_id(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// HTTP client for a chat-completions endpoint
pub struct HttpModelClient {
    http: reqwest::Client,
    config: LlmConfig,
    api_key: String,
}

impl HttpModelClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, ModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            config,
            api_key,
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, ModelError> {
        let start_time = std::time::Instant::now();

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            tracing::warn!(model = %self.config.model, "Model endpoint rate limited");
            return Err(ModelError::RateLimited);
        }
        if status == reqwest::StatusCode::PAYMENT_REQUIRED {
            tracing::warn!(model = %self.config.model, "Model credits exhausted");
            return Err(ModelError::CreditsExhausted);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                model = %self.config.model,
                status = status.as_u16(),
                body = %body,
                "Model endpoint error"
            );
            return Err(ModelError::Upstream(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        tracing::debug!(
            model = %self.config.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            content_length = content.len(),
            "Model call completed"
        );

        Ok(content)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}
