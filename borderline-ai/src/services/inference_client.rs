//! Chat-completion inference client
//!
//! POSTs `{model, messages, max_tokens, temperature}` and returns
//! `choices[0].message.content`. Non-2xx responses are failures.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;

const USER_AGENT: &str = concat!("borderline-ai/", env!("CARGO_PKG_VERSION"));

/// Inference client errors
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Inference API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Inference response contained no message content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// Role-tagged text message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Request body sent to the endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Single request/response contract with the hosted inference endpoint
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Returns the free-text reply of the first choice
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError>;
}

/// Runtime-updatable API key shared between the client and the settings endpoint
#[derive(Debug, Clone, Default)]
pub struct SharedApiKey(Arc<RwLock<Option<String>>>);

impl SharedApiKey {
    pub fn new(key: Option<String>) -> Self {
        Self(Arc::new(RwLock::new(key)))
    }

    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    pub async fn set(&self, key: String) {
        *self.0.write().await = Some(key);
    }
}

/// reqwest-backed client for OpenAI-compatible chat completion endpoints
pub struct HttpInferenceClient {
    http_client: reqwest::Client,
    endpoint_url: String,
    api_key: SharedApiKey,
}

impl HttpInferenceClient {
    pub fn new(
        endpoint_url: String,
        api_key: SharedApiKey,
        timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint_url,
            api_key,
        })
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, InferenceError> {
        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Calling inference endpoint"
        );

        let mut builder = self.http_client.post(&self.endpoint_url).json(request);
        if let Some(key) = self.api_key.get().await {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        extract_content(&body)
    }
}

/// Pull `choices[0].message.content` out of a response body
pub fn extract_content(body: &str) -> Result<String, InferenceError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::Parse(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(InferenceError::EmptyResponse)
}
