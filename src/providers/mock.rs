/*!
 * Mock provider for testing.
 *
 * The mock answers prompts from a list of routes: the first route whose
 * marker occurs in the prompt supplies the response. Failure injection covers
 * the transport behaviors the passes must tolerate:
 * - `MockProvider::working()` - Always answers from its routes
 * - `MockProvider::fail_first(n)` - Fails the first `n` calls, then answers
 * - `MockProvider::failing()` - Always fails with an error
 * - `MockProvider::slow(ms)` - Answers after a delay
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{CompletionRequest, CompletionResponse, Provider};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always answers from the routes
    Working,
    /// Fails the first `failures` calls, then answers
    FailFirst { failures: usize },
    /// Always fails
    Failing,
    /// Answers after a delay
    Slow { delay_ms: u64 },
}

/// Mock provider with scripted responses
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// `(marker, response)` pairs checked in order
    routes: Vec<(String, String)>,
    /// Response when no route matches
    default_response: String,
    /// Error returned by injected failures
    failure: ProviderError,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Prompts received, in order
    prompts: Arc<Mutex<Vec<String>>>,
    /// Health check result
    healthy: Arc<AtomicBool>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            routes: Vec::new(),
            default_response: String::new(),
            failure: ProviderError::ApiError {
                status_code: 503,
                message: "Simulated provider failure".to_string(),
            },
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Create a working mock provider
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that fails the first `failures` calls
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Answer prompts containing `marker` with `response`
    pub fn with_route(mut self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.routes.push((marker.into(), response.into()));
        self
    }

    /// Answer unmatched prompts with `response`
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Use `error` for injected failures
    pub fn with_failure(mut self, error: ProviderError) -> Self {
        self.failure = error;
        self
    }

    /// Make injected failures transport timeouts
    pub fn with_timeouts(self) -> Self {
        self.with_failure(ProviderError::Timeout("Simulated timeout".to_string()))
    }

    /// Fail health checks
    pub fn unhealthy(self) -> Self {
        self.healthy.store(false, Ordering::SeqCst);
        self
    }

    /// Number of completion requests received
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    fn respond(&self, prompt: &str) -> String {
        self.routes
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(request.prompt.clone());

        match self.behavior {
            MockBehavior::Working => Ok(CompletionResponse::from_text(self.respond(&request.prompt))),

            MockBehavior::FailFirst { failures } => {
                if count < failures {
                    Err(self.failure.clone())
                } else {
                    Ok(CompletionResponse::from_text(self.respond(&request.prompt)))
                }
            }

            MockBehavior::Failing => Err(self.failure.clone()),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(CompletionResponse::from_text(self.respond(&request.prompt)))
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProviderError::ConnectionError("Connection refused".to_string()))
        }
    }

    fn endpoint(&self) -> String {
        "mock://local".to_string()
    }
}
