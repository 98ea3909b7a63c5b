use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::Path;
use url::Url;

use crate::segmentation::VoicingMode;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// LLM endpoint config
    #[serde(default)]
    pub llm: LlmConfig,

    /// How the script is voiced
    #[serde(default)]
    pub voicing_mode: VoicingMode,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// LLM backend type; all backends speak the OpenAI chat completion protocol
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    // @backend: Generic local OpenAI-compatible server
    #[default]
    Local,
    // @backend: LM Studio local server
    LMStudio,
    // @backend: Ollama's OpenAI-compatible API
    Ollama,
    // @backend: Hosted OpenAI API
    OpenAI,
}

impl LlmBackend {
    // @returns: Capitalized backend name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Local => "Local server",
            Self::LMStudio => "LM Studio",
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
        }
    }

    // @returns: Lowercase backend identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Local => "local".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
        }
    }

    /// Whether the backend needs an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI)
    }
}

impl std::fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for LlmBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "lmstudio" => Ok(Self::LMStudio),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            _ => Err(anyhow!("Invalid LLM backend: {}", s)),
        }
    }
}

/// Backend configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackendConfig {
    // @field: Backend type identifier
    #[serde(rename = "type")]
    pub backend_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Base URL including /v1
    #[serde(default = "String::new")]
    pub endpoint: String,
}

impl BackendConfig {
    // @param backend: Backend enum
    // @returns: Backend config with defaults
    pub fn new(backend: LlmBackend) -> Self {
        Self {
            backend_type: backend.to_lowercase_string(),
            model: default_model(&backend),
            api_key: String::new(),
            endpoint: default_endpoint(&backend),
        }
    }
}

/// LLM configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    /// Backend to use
    #[serde(default)]
    pub provider: LlmBackend,

    /// Available backends
    #[serde(default)]
    pub available_providers: Vec<BackendConfig>,

    /// Settings shared by all passes
    #[serde(default)]
    pub common: LlmCommonConfig,

    /// Per-pass request timeouts
    #[serde(default)]
    pub timeouts: PassTimeouts,
}

/// Settings applicable to all backends
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmCommonConfig {
    /// Temperature parameter for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Soft limit on serialized characters per LLM batch
    #[serde(default = "default_batch_char_budget")]
    pub batch_char_budget: usize,

    /// Most frequent speaker names sent to name validation
    #[serde(default = "default_max_validation_candidates")]
    pub max_validation_candidates: usize,

    /// Lines of context on each side of a line being resolved
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Interval at which the controller drains pass events
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LlmCommonConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            batch_char_budget: default_batch_char_budget(),
            max_validation_candidates: default_max_validation_candidates(),
            context_window: default_context_window(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Per-request timeouts of each pass, in seconds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PassTimeouts {
    #[serde(default = "default_resolution_timeout_secs")]
    pub resolution_secs: u64,

    #[serde(default = "default_fragments_timeout_secs")]
    pub fragments_secs: u64,

    #[serde(default = "default_validation_timeout_secs")]
    pub validation_secs: u64,

    #[serde(default = "default_grouping_timeout_secs")]
    pub grouping_secs: u64,

    /// Models-listing health check
    #[serde(default = "default_health_timeout_secs")]
    pub health_secs: u64,
}

impl Default for PassTimeouts {
    fn default() -> Self {
        Self {
            resolution_secs: default_resolution_timeout_secs(),
            fragments_secs: default_fragments_timeout_secs(),
            validation_secs: default_validation_timeout_secs(),
            grouping_secs: default_grouping_timeout_secs(),
            health_secs: default_health_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

fn default_temperature() -> f32 {
    0.0
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    2000 // 2s, then 4s
}

fn default_batch_char_budget() -> usize {
    2000
}

fn default_max_validation_candidates() -> usize {
    150
}

fn default_context_window() -> usize {
    3
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_resolution_timeout_secs() -> u64 {
    30
}

fn default_fragments_timeout_secs() -> u64 {
    60
}

fn default_validation_timeout_secs() -> u64 {
    120
}

fn default_grouping_timeout_secs() -> u64 {
    300
}

fn default_health_timeout_secs() -> u64 {
    5
}

fn default_endpoint(backend: &LlmBackend) -> String {
    match backend {
        LlmBackend::Local => "http://localhost:4247/v1".to_string(),
        LlmBackend::LMStudio => "http://localhost:1234/v1".to_string(),
        LlmBackend::Ollama => "http://localhost:11434/v1".to_string(),
        LlmBackend::OpenAI => "https://api.openai.com/v1".to_string(),
    }
}

fn default_model(backend: &LlmBackend) -> String {
    match backend {
        // Local servers answer with whatever model is loaded
        LlmBackend::Local | LlmBackend::LMStudio => "local-model".to_string(),
        LlmBackend::Ollama => "llama3".to_string(),
        LlmBackend::OpenAI => "gpt-4o-mini".to_string(),
    }
}

impl Config {
    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.llm.get_endpoint();
        Url::parse(&endpoint).with_context(|| format!("Invalid LLM endpoint URL: {}", endpoint))?;

        if self.llm.provider.requires_api_key() && self.llm.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for the {} backend",
                self.llm.provider.display_name()
            ));
        }

        let common = &self.llm.common;
        if !(0.0..=2.0).contains(&common.temperature) {
            return Err(anyhow!("Temperature must be between 0.0 and 2.0, got {}", common.temperature));
        }
        if common.batch_char_budget == 0 {
            return Err(anyhow!("batch_char_budget must be greater than zero"));
        }
        if common.max_validation_candidates == 0 {
            return Err(anyhow!("max_validation_candidates must be greater than zero"));
        }
        if common.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than zero"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            llm: LlmConfig::default(),
            voicing_mode: VoicingMode::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl LlmConfig {
    /// Get the active backend configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&BackendConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific backend configuration by type
    pub fn get_provider_config(&self, backend: &LlmBackend) -> Option<&BackendConfig> {
        let backend_str = backend.to_lowercase_string();
        self.available_providers.iter().find(|p| p.backend_type == backend_str)
    }

    /// Get a mutable backend configuration, creating it from defaults if missing
    pub fn provider_config_mut(&mut self, backend: &LlmBackend) -> &mut BackendConfig {
        let backend_str = backend.to_lowercase_string();
        let position = match self.available_providers.iter().position(|p| p.backend_type == backend_str) {
            Some(position) => position,
            None => {
                self.available_providers.push(BackendConfig::new(backend.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[position]
    }

    /// Get the model for the active backend
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        default_model(&self.provider)
    }

    /// Get the API key for the active backend
    pub fn get_api_key(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.api_key.is_empty() {
                return provider_config.api_key.clone();
            }
        }

        // Local servers don't use API keys
        String::new()
    }

    /// Get the endpoint for the active backend
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        default_endpoint(&self.provider)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut config = Self {
            provider: LlmBackend::default(),
            available_providers: Vec::new(),
            common: LlmCommonConfig::default(),
            timeouts: PassTimeouts::default(),
        };

        // Add default backends
        config.available_providers.push(BackendConfig::new(LlmBackend::Local));
        config.available_providers.push(BackendConfig::new(LlmBackend::LMStudio));
        config.available_providers.push(BackendConfig::new(LlmBackend::Ollama));
        config.available_providers.push(BackendConfig::new(LlmBackend::OpenAI));

        config
    }
}
