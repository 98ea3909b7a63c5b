/*!
 * Client for OpenAI-compatible chat completion servers.
 *
 * Local servers (LM Studio, llama.cpp, Ollama's `/v1` API) and the hosted
 * OpenAI API share this wire format. The health check lists models through
 * `GET {endpoint}/models`.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app_config::LlmConfig;
use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Model identifier sent to local servers, which serve whatever model is loaded.
pub const LOCAL_MODEL: &str = "local-model";

/// OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// API key; local servers accept any value
    api_key: String,
    /// Base URL including the `/v1` suffix
    endpoint: String,
    /// Model identifier sent with every request
    model: String,
    /// Timeout for the models-listing health check
    health_timeout: Duration,
}

/// Chat completion request
#[derive(Debug, Serialize, Default)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Sequences where generation stops
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Completion choices
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Individual choice in a response
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Entry of the models listing
#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub id: String,
}

/// Response of `GET /models`
#[derive(Debug, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelInfo>,
}

impl OpenAIRequest {
    /// Create a new request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the stop sequences; an empty list clears them
    pub fn stop(mut self, stop: Vec<String>) -> Self {
        self.stop = if stop.is_empty() { None } else { Some(stop) };
        self
    }
}

impl OpenAI {
    /// Create a new client for an OpenAI-compatible endpoint
    pub fn new(api_key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            // Each pass runs on its own runtime; pooled connections must not outlive it
            client: Client::builder()
                .pool_max_idle_per_host(0)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: LOCAL_MODEL.to_string(),
            health_timeout: Duration::from_secs(5),
        }
    }

    /// Create a client for the active backend of the configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        let api_key = {
            let k = config.get_api_key();
            // Local servers ignore the key but some reject an empty header
            if k.is_empty() { "not-needed".to_string() } else { k }
        };
        Self::new(api_key, config.get_endpoint())
            .with_model(config.get_model())
            .with_health_timeout(Duration::from_secs(config.timeouts.health_secs))
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the health check timeout
    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a chat completion request
    pub async fn chat(
        &self,
        request: OpenAIRequest,
        timeout: Option<Duration>,
    ) -> Result<OpenAIResponse, ProviderError> {
        let api_url = format!("{}/chat/completions", self.endpoint);

        let mut builder = self
            .client
            .post(&api_url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI-compatible API error ({}): {}", status, error_text);
            return Err(status_error(status, error_text));
        }

        response
            .json::<OpenAIResponse>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse chat completion response: {}", e)))
    }

    /// List the models served by the endpoint
    pub async fn list_models(&self) -> Result<ModelList, ProviderError> {
        let api_url = format!("{}/models", self.endpoint);
        let response = self
            .client
            .get(&api_url)
            .bearer_auth(&self.api_key)
            .timeout(self.health_timeout)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(status_error(status, error_text));
        }

        response
            .json::<ModelList>()
            .await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse models listing: {}", e)))
    }

    /// Extract text from a chat completion response
    pub fn extract_text_from_response(response: &OpenAIResponse) -> String {
        response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default()
    }
}

fn status_error(status: StatusCode, message: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthenticationError(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimitExceeded(message),
        _ => ProviderError::ApiError {
            status_code: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let chat_request = OpenAIRequest::new(&self.model)
            .add_message("user", request.prompt)
            .temperature(request.temperature)
            .stop(request.stop);

        let response = self.chat(chat_request, request.timeout).await?;
        debug!("Chat completion finished: {:?}", response.choices.first().and_then(|c| c.finish_reason.as_deref()));

        Ok(CompletionResponse {
            text: Self::extract_text_from_response(&response),
            prompt_tokens: response.usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: response.usage.as_ref().map(|u| u.completion_tokens),
        })
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let models = self.list_models().await?;
        debug!(
            "Endpoint {} serves {} model(s): {}",
            self.endpoint,
            models.data.len(),
            models.data.iter().map(|m| m.id.as_str()).collect::<Vec<_>>().join(", ")
        );
        Ok(())
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}
