/*!
 * Provider implementations for LLM endpoints.
 *
 * This module contains client implementations behind a common trait:
 * - OpenAI: any OpenAI-compatible chat completion server (local servers,
 *   LM Studio, Ollama's `/v1` API, or the hosted OpenAI API)
 * - Mock: scripted provider for tests
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::ProviderError;

/// Provider-independent completion request.
///
/// The prompt is sent as the content of a single user message.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Full prompt text
    pub prompt: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Stop sequences
    pub stop: Vec<String>,
    /// Per-request timeout
    pub timeout: Option<Duration>,
}

impl CompletionRequest {
    /// Create a new request with temperature 0 and no stop sequences
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.0,
            stop: Vec::new(),
            timeout: None,
        }
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Add a stop sequence
    pub fn add_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Provider-independent completion response.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    /// Generated text
    pub text: String,
    /// Prompt tokens, when the server reports usage
    pub prompt_tokens: Option<u64>,
    /// Completion tokens, when the server reports usage
    pub completion_tokens: Option<u64>,
}

impl CompletionResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt_tokens: None,
            completion_tokens: None,
        }
    }
}

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the analysis passes.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Complete a request using this provider
    ///
    /// # Arguments
    /// * `request` - The request to complete
    ///
    /// # Returns
    /// * `Result<CompletionResponse, ProviderError>` - The response from the provider or an error
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError>;

    /// Test the connection to the provider
    ///
    /// # Returns
    /// * `Result<(), ProviderError>` - Ok if the endpoint is reachable and healthy, or an error
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Base URL of the endpoint, for diagnostics
    fn endpoint(&self) -> String;
}

pub mod mock;
pub mod openai;
