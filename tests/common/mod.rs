/*!
 * Common test utilities for the dramatis test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use dramatis::app_config::Config;
use dramatis::providers::mock::MockProvider;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A short scene with a tagged speaker, an ambiguous line and a nickname.
///
/// Segments into:
/// 0 `"Good morning,"` John, 1 `said John.`, 2 `The kitchen was warm...`,
/// 3 `"Is the tea ready?"` AMBIGUOUS, 4 `she asked.`, 5 `"Almost,"` Johnny,
/// 6 `Johnny said.`, 7 `He poured two cups and sat down beside the window.`
pub const SAMPLE_TEXT: &str = "\"Good morning,\" said John. The kitchen was warm and smelled of bread. \
\"Is the tea ready?\" she asked. \"Almost,\" Johnny said. He poured two cups and sat down beside the window.";

/// Answer for the fragment pass: every candidate stays a line
pub const FRAGMENTS_KEEP_ALL: &str = "[]";

/// Answer for name validation: every label is a name
pub const VALIDATION_ALL_NAMES: &str = r#"```json
[{"original_name": "John", "is_name": true, "suggested_name": "", "reason": "name"},
 {"original_name": "Johnny", "is_name": true, "suggested_name": "", "reason": "name"}]
```"#;

/// Answer for grouping: Johnny is John
pub const GROUPING_JOHN_JOHNNY: &str =
    r#"{"character_groups": [{"primary_name": "John", "aliases": ["Johnny"]}, {"primary_name": "Mary", "aliases": []}]}"#;

/// Mock provider answering every pass of a full analysis of [`SAMPLE_TEXT`]
pub fn scripted_provider() -> MockProvider {
    MockProvider::working()
        .with_route("CAND:", FRAGMENTS_KEEP_ALL)
        .with_route("Return JSON array", VALIDATION_ALL_NAMES)
        .with_route("character_groups", GROUPING_JOHN_JOHNNY)
        .with_route("who is the speaker of the DIALOGUE line", "Mary, Female, Adult")
        .with_route("is spoken by", "Someone, Male, Adult")
}

/// Default configuration without retry backoff and with a fast poll interval
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.llm.common.retry_backoff_ms = 0;
    config.llm.common.poll_interval_ms = 5;
    config
}
