/*!
 * Tests for provider implementations
 */

use std::sync::Arc;
use std::time::Duration;

use dramatis::analysis::{LlmClient, RetryPolicy};
use dramatis::app_config::{Config, LlmBackend};
use dramatis::providers::mock::MockProvider;
use dramatis::providers::openai::OpenAI;
use dramatis::providers::{CompletionRequest, Provider};
use dramatis::{AnalysisError, ProviderError};

/// Nothing listens on the discard port of the loopback interface
const UNREACHABLE_ENDPOINT: &str = "http://127.0.0.1:9/v1";

/// Test the client picks up the active backend from the configuration
#[test]
fn test_openai_fromConfig_shouldUseActiveBackend() {
    let mut config = Config::default();
    config.llm.provider = LlmBackend::LMStudio;
    config.llm.provider_config_mut(&LlmBackend::LMStudio).model = "qwen2.5-7b".to_string();

    let client = OpenAI::from_config(&config.llm);

    assert_eq!(client.endpoint(), "http://localhost:1234/v1");
    assert_eq!(client.model(), "qwen2.5-7b");
}

/// Test the request builder collects stop sequences and timeout
#[test]
fn test_completionRequest_builder_shouldCollectOptions() {
    let request = CompletionRequest::new("prompt")
        .temperature(0.0)
        .add_stop("\n")
        .add_stop("<|im_end|>")
        .timeout(Duration::from_secs(30));

    assert_eq!(request.stop, vec!["\n".to_string(), "<|im_end|>".to_string()]);
    assert_eq!(request.timeout, Some(Duration::from_secs(30)));
}

/// Test an unreachable server fails the connection test with a retryable error
#[tokio::test]
async fn test_openai_testConnection_unreachable_shouldFail() {
    let client = OpenAI::new("not-needed", UNREACHABLE_ENDPOINT).with_health_timeout(Duration::from_secs(2));

    let result = client.test_connection().await;

    assert!(result.is_err());
}

/// Test the health check maps provider failures to a descriptive error
#[tokio::test]
async fn test_llmClient_healthCheck_unreachable_shouldNameEndpoint() {
    let provider = OpenAI::new("not-needed", UNREACHABLE_ENDPOINT).with_health_timeout(Duration::from_secs(2));
    let client = LlmClient::new(Arc::new(provider), RetryPolicy::none());

    match client.health_check().await {
        Err(AnalysisError::HealthCheck { endpoint, .. }) => assert_eq!(endpoint, UNREACHABLE_ENDPOINT),
        other => panic!("Expected a health check error, got {:?}", other),
    }
}

/// Test non-retryable failures are not retried
#[tokio::test]
async fn test_completeWithRetry_authError_shouldNotRetry() {
    let provider = MockProvider::failing()
        .with_failure(ProviderError::AuthenticationError("bad key".to_string()));
    let client = LlmClient::new(Arc::new(provider.clone()), RetryPolicy::new(2, 0));

    let result = client.complete_with_retry(CompletionRequest::new("hello")).await;

    assert!(matches!(result, Err(ProviderError::AuthenticationError(_))));
    assert_eq!(provider.request_count(), 1);
}

/// Test retryable failures are retried up to the configured count
#[tokio::test]
async fn test_completeWithRetry_serverErrors_shouldStopAfterMaxRetries() {
    let provider = MockProvider::failing();
    let client = LlmClient::new(Arc::new(provider.clone()), RetryPolicy::new(2, 0));

    let result = client.complete_with_retry(CompletionRequest::new("hello")).await;

    assert!(result.is_err());
    assert_eq!(provider.request_count(), 3);
}
