/*!
 * Error types for the dramatis application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The request did not complete within its timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Whether a failed call is worth retrying with backoff.
    ///
    /// Transport failures and server-side errors are retryable; client errors
    /// (bad request, bad key) and unparseable responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_)
            | Self::ConnectionError(_)
            | Self::Timeout(_)
            | Self::RateLimitExceeded(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }

    /// Whether this error is a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that terminate an analysis pass
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Error from the provider API after retries were exhausted
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The LLM endpoint failed its pre-pass health check
    #[error("LLM endpoint is not available at {endpoint}: {reason}. Is your local server running?")]
    HealthCheck {
        /// Endpoint that was probed
        endpoint: String,
        /// Why the probe failed
        reason: String,
    },

    /// A pass has nothing sensible to apply
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// The pass was stopped through its cancellation flag
    #[error("Pass cancelled before completion")]
    Cancelled,

    /// A patch referenced a line that does not exist
    #[error("Invalid patch: line index {index} is out of range (script has {len} lines)")]
    InvalidPatch {
        /// Offending index
        index: usize,
        /// Number of lines in the script
        len: usize,
    },

    /// A background worker stopped without reporting completion
    #[error("Worker failure: {0}")]
    Worker(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from an analysis pass
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Input text rejected before analysis
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
