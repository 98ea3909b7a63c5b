use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::AppError;
use crate::script::Script;

// @module: File utilities for text input and script files

/// Shortest accepted input text, in characters after trimming
pub const MIN_TEXT_LENGTH: usize = 100;

/// Smallest accepted share of alphabetic characters in the input text
pub const MIN_ALPHABETIC_RATIO: f64 = 0.5;

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    // @generates: Script path next to the input text
    pub fn generate_script_path<P: AsRef<Path>>(input_file: P) -> PathBuf {
        let input_file = input_file.as_ref();
        let stem = input_file.file_stem().unwrap_or_default();
        let mut filename = stem.to_string_lossy().to_string();
        filename.push_str(".script.json");
        input_file.with_file_name(filename)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Read a text file and check that it is prose worth analysing
    pub fn read_input_text<P: AsRef<Path>>(path: P) -> std::result::Result<String, AppError> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", path)));
        }
        let text = fs::read_to_string(path)?;
        validate_text_content(&text)?;
        debug!("Loaded {} characters from {:?}", text.chars().count(), path);
        Ok(text)
    }

    /// Load a script saved by [`FileManager::save_script`]
    pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Script> {
        let path = path.as_ref();
        if !Self::file_exists(path) {
            return Err(anyhow!("Script file does not exist: {:?}", path));
        }
        let content = Self::read_to_string(path)?;
        serde_json::from_str(&content).with_context(|| format!("Failed to parse script file: {:?}", path))
    }

    /// Save a script as pretty-printed JSON
    pub fn save_script<P: AsRef<Path>>(path: P, script: &Script) -> Result<()> {
        let json = serde_json::to_string_pretty(script).context("Failed to serialize script")?;
        Self::write_to_file(path, &json)
    }
}

/// Check that text is long enough and mostly made of letters
pub fn validate_text_content(text: &str) -> std::result::Result<(), AppError> {
    let trimmed_len = text.trim().chars().count();
    if trimmed_len < MIN_TEXT_LENGTH {
        return Err(AppError::InvalidInput(format!(
            "Text too short ({} characters). Minimum: {} characters",
            trimmed_len, MIN_TEXT_LENGTH
        )));
    }

    let total = text.chars().count();
    let alphabetic = text.chars().filter(|c| c.is_alphabetic()).count();
    if (alphabetic as f64) / (total as f64) < MIN_ALPHABETIC_RATIO {
        return Err(AppError::InvalidInput(
            "Text appears to contain mostly non-alphabetic characters".to_string(),
        ));
    }

    Ok(())
}
