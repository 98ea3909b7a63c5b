/*!
 * LLM client used by every analysis pass.
 *
 * Wraps a [`Provider`] with the ChatML prompt envelope, the pre-pass health
 * check and bounded exponential-backoff retries.
 */

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::LlmConfig;
use crate::errors::{AnalysisError, ProviderError};
use crate::providers::{CompletionRequest, Provider};

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled on each further retry
    pub backoff_base_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            max_retries,
            backoff_base_ms,
        }
    }

    /// Single attempt, no retries
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(config.common.retry_count, config.common.retry_backoff_ms)
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(1u64 << shift))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2, 2000)
    }
}

/// Provider plus retry policy and sampling settings
#[derive(Debug, Clone)]
pub struct LlmClient {
    provider: Arc<dyn Provider>,
    retry: RetryPolicy,
    temperature: f32,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, retry: RetryPolicy) -> Self {
        Self {
            provider,
            retry,
            temperature: 0.0,
        }
    }

    pub fn from_config(provider: Arc<dyn Provider>, config: &LlmConfig) -> Self {
        Self::new(provider, RetryPolicy::from_config(config)).with_temperature(config.common.temperature)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn endpoint(&self) -> String {
        self.provider.endpoint()
    }

    /// Wrap a system and user prompt in the ChatML envelope.
    ///
    /// The result is sent as a single user message whatever the server's own
    /// template is.
    pub fn chatml(system: &str, user: &str) -> String {
        format!(
            "<|im_start|>system\n{}<|im_end|>\n<|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n",
            system.trim(),
            user.trim()
        )
    }

    /// Probe the endpoint before a pass makes any generation call
    pub async fn health_check(&self) -> Result<(), AnalysisError> {
        self.provider.test_connection().await.map_err(|e| AnalysisError::HealthCheck {
            endpoint: self.provider.endpoint(),
            reason: e.to_string(),
        })
    }

    /// Single completion attempt
    pub async fn complete(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let request = request.temperature(self.temperature);
        let response = self.provider.complete(request).await?;
        debug!("Raw LLM response: {}", response.text);
        Ok(response.text.trim().to_string())
    }

    /// Completion with retries on retryable errors
    pub async fn complete_with_retry(&self, request: CompletionRequest) -> Result<String, ProviderError> {
        let mut attempt: u32 = 0;
        loop {
            match self.complete(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let backoff = self.retry.backoff(attempt);
                    warn!(
                        "LLM request failed ({}), retry {}/{} in {}ms",
                        e,
                        attempt,
                        self.retry.max_retries,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
