/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::path::Path;

use dramatis::errors::AppError;
use dramatis::file_utils::{validate_text_content, FileManager};
use dramatis::script::{Line, LinePatch, Script};

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_fileExists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.txt", "content")?;
    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

/// Test that file_exists returns false for non-existent files
#[test]
fn test_fileExists_withNonExistentFile_shouldReturnFalse() {
    assert!(!FileManager::file_exists("non_existent_file.tmp"));
}

/// Test that write_to_file creates missing parent directories
#[test]
fn test_writeToFile_nestedPath_shouldCreateParents() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("a").join("b").join("file.txt");
    FileManager::write_to_file(&path, "hello")?;
    assert_eq!(FileManager::read_to_string(&path)?, "hello");
    Ok(())
}

/// Test that the script path sits next to the input file
#[test]
fn test_generateScriptPath_shouldKeepDirectory() {
    let path = FileManager::generate_script_path(Path::new("/books/war.and.peace.txt"));
    assert_eq!(path, Path::new("/books/war.and.peace.script.json"));
}

/// Test that a missing input file is a file error
#[test]
fn test_readInputText_missingFile_shouldFail() {
    let result = FileManager::read_input_text("missing_input_file.txt");
    assert!(matches!(result, Err(AppError::File(_))));
}

/// Test that valid prose is loaded verbatim
#[test]
fn test_readInputText_validProse_shouldReturnText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "scene.txt", common::SAMPLE_TEXT)?;
    let text = FileManager::read_input_text(&path).map_err(|e| anyhow::anyhow!("{}", e))?;
    assert_eq!(text, common::SAMPLE_TEXT);
    Ok(())
}

/// Test the length check counts trimmed characters
#[test]
fn test_validateTextContent_paddedShortText_shouldFail() {
    let text = format!("{}{}{}", " ".repeat(200), "A short line of prose.", "\n".repeat(50));
    assert!(matches!(validate_text_content(&text), Err(AppError::InvalidInput(_))));
}

/// Test the alphabetic ratio check
#[test]
fn test_validateTextContent_symbols_shouldReportNonAlphabetic() {
    let text = "#### ---- 1234 ==== ".repeat(10);
    match validate_text_content(&text) {
        Err(AppError::InvalidInput(message)) => assert!(message.contains("non-alphabetic")),
        other => panic!("Expected invalid input, got {:?}", other),
    }
}

/// Test that scripts survive a save and load, including cast data
#[test]
fn test_saveScript_loadScript_shouldBeLossless() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("scene.script.json");

    let mut script = Script::new(vec![
        Line::chapter_heading("Chapter 1"),
        Line::new("Alice", "\"Hello.\""),
        Line::narration("She waved."),
    ]);
    script.apply_patches(&[LinePatch::resolved(1, "Alice", "Female", "Adult")])?;

    FileManager::save_script(&path, &script)?;
    let loaded = FileManager::load_script(&path)?;

    assert_eq!(loaded, script);
    assert_eq!(loaded.version(), script.version());
    assert!(loaded.cast().profiles.contains_key("Alice"));
    Ok(())
}

/// Test that scripts written with the legacy `line` key still load
#[test]
fn test_loadScript_legacyLineKey_shouldParse() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let json = r#"{"lines": [{"speaker": "Narrator", "line": "It rained.", "pov": "3rd Person"}]}"#;
    let path = common::create_test_file(temp_dir.path(), "legacy.json", json)?;

    let script = FileManager::load_script(&path)?;

    assert_eq!(script.lines()[0].text, "It rained.");
    assert_eq!(script.version(), 0);
    Ok(())
}
