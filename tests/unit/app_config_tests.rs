/*!
 * Tests for application configuration
 */

use anyhow::Result;

use dramatis::app_config::{Config, LlmBackend, LogLevel};
use dramatis::segmentation::VoicingMode;
use log::LevelFilter;

use crate::common;

/// Test that a saved configuration loads back unchanged
#[test]
fn test_config_saveAndLoad_shouldPreserveValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.llm.provider = LlmBackend::Ollama;
    config.llm.provider_config_mut(&LlmBackend::Ollama).model = "mistral".to_string();
    config.voicing_mode = VoicingMode::NarratorAndSpeaker;
    config.log_level = LogLevel::Debug;
    config.save(&path)?;

    let loaded = Config::from_file(&path)?;
    assert_eq!(loaded.llm.provider, LlmBackend::Ollama);
    assert_eq!(loaded.llm.get_model(), "mistral");
    assert_eq!(loaded.llm.get_endpoint(), "http://localhost:11434/v1");
    assert_eq!(loaded.voicing_mode, VoicingMode::NarratorAndSpeaker);
    assert_eq!(loaded.log_level, LogLevel::Debug);
    Ok(())
}

/// Test that an empty JSON object yields the full default configuration
#[test]
fn test_config_emptyJson_shouldUseDefaults() -> Result<()> {
    let config: Config = serde_json::from_str("{}")?;
    assert_eq!(config.llm.provider, LlmBackend::Local);
    assert_eq!(config.llm.common.temperature, 0.0);
    assert_eq!(config.llm.common.retry_count, 2);
    assert_eq!(config.llm.common.max_validation_candidates, 150);
    assert_eq!(config.llm.common.context_window, 3);
    assert_eq!(config.llm.timeouts.resolution_secs, 30);
    assert_eq!(config.llm.timeouts.health_secs, 5);
    assert_eq!(config.voicing_mode, VoicingMode::Cast);
    Ok(())
}

/// Test that the voicing mode uses snake case in JSON
#[test]
fn test_config_voicingMode_shouldParseSnakeCase() -> Result<()> {
    let config: Config = serde_json::from_str(r#"{"voicing_mode": "narrator_and_speaker"}"#)?;
    assert_eq!(config.voicing_mode, VoicingMode::NarratorAndSpeaker);
    Ok(())
}

/// Test that a malformed file reports a parse error
#[test]
fn test_config_fromFile_malformed_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "conf.json", "{ not json")?;
    let error = Config::from_file(&path).unwrap_err();
    assert!(error.to_string().contains("Failed to parse config file"));
    Ok(())
}

/// Test that out-of-range tunables are rejected
#[test]
fn test_config_validate_invalidTunables_shouldFail() {
    let mut config = Config::default();
    config.llm.common.temperature = 3.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.llm.common.batch_char_budget = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.llm.common.poll_interval_ms = 0;
    assert!(config.validate().is_err());
}

/// Test log level mapping to the log crate's filter
#[test]
fn test_logLevel_toLevelFilter_shouldMapEveryLevel() {
    assert_eq!(LogLevel::Error.to_level_filter(), LevelFilter::Error);
    assert_eq!(LogLevel::Warn.to_level_filter(), LevelFilter::Warn);
    assert_eq!(LogLevel::Info.to_level_filter(), LevelFilter::Info);
    assert_eq!(LogLevel::Debug.to_level_filter(), LevelFilter::Debug);
    assert_eq!(LogLevel::Trace.to_level_filter(), LevelFilter::Trace);
}

/// Test that only the hosted backend needs a key
#[test]
fn test_llmBackend_requiresApiKey_shouldOnlyApplyToOpenAI() {
    assert!(LlmBackend::OpenAI.requires_api_key());
    assert!(!LlmBackend::Local.requires_api_key());
    assert!(!LlmBackend::LMStudio.requires_api_key());
    assert!(!LlmBackend::Ollama.requires_api_key());
}
