/*!
 * Integration tests for the CLI workflows
 */

use anyhow::Result;
use std::sync::Arc;

use dramatis::file_utils::FileManager;
use dramatis::providers::mock::MockProvider;
use dramatis::script::{AMBIGUOUS, NARRATOR};
use dramatis::AppController;

use crate::common;

/// Test rules-only analysis writes a script next to the input without any LLM call
#[tokio::test]
async fn test_analyze_rulesOnly_shouldWriteScriptWithoutLlm() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "scene.txt", common::SAMPLE_TEXT)?;
    let provider = MockProvider::working().unhealthy();
    let app = AppController::with_provider(common::test_config(), Arc::new(provider.clone()));

    let output = app.analyze(&input, None, false, true).await?;

    assert_eq!(output, temp_dir.path().join("scene.script.json"));
    let script = FileManager::load_script(&output)?;
    assert_eq!(script.len(), 8);
    assert_eq!(script.lines()[3].speaker, AMBIGUOUS);
    assert_eq!(provider.request_count(), 0);
    Ok(())
}

/// Test resolve then refine on a saved script updates it in place
#[tokio::test]
async fn test_resolveThenRefine_savedScript_shouldUpdateFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "scene.txt", common::SAMPLE_TEXT)?;
    let app = AppController::with_provider(common::test_config(), Arc::new(common::scripted_provider()));
    let script_path = app.analyze(&input, None, false, true).await?;

    let resolved = app.resolve(&script_path).await?;
    assert_eq!(resolved.lines()[3].speaker, "Mary");

    let refined = app.refine(&script_path).await?;
    assert_eq!(refined.lines()[5].speaker, "John");

    let saved = FileManager::load_script(&script_path)?;
    assert_eq!(saved, refined);
    let cast: Vec<String> = saved.cast_list().into_iter().map(|e| e.speaker).collect();
    assert_eq!(cast, vec!["John".to_string(), NARRATOR.to_string(), "Mary".to_string()]);
    Ok(())
}

/// Test full analysis with an explicit output path
#[tokio::test]
async fn test_analyze_full_shouldWriteToRequestedOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "scene.txt", common::SAMPLE_TEXT)?;
    let requested = temp_dir.path().join("out").join("cast.json");
    let app = AppController::with_provider(common::test_config(), Arc::new(common::scripted_provider()));

    let output = app.analyze(&input, Some(requested.clone()), false, false).await?;

    assert_eq!(output, requested);
    let script = FileManager::load_script(&requested)?;
    assert!(script.lines().iter().all(|l| l.speaker != AMBIGUOUS));
    Ok(())
}

/// Test an existing script is kept unless overwrite is forced
#[tokio::test]
async fn test_analyze_existingOutput_shouldSkipWithoutForce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "scene.txt", common::SAMPLE_TEXT)?;
    let existing = common::create_test_file(temp_dir.path(), "scene.script.json", "keep me")?;
    let app = AppController::with_provider(common::test_config(), Arc::new(MockProvider::working()));

    app.analyze(&input, None, false, true).await?;
    assert_eq!(FileManager::read_to_string(&existing)?, "keep me");

    app.analyze(&input, None, true, true).await?;
    assert!(FileManager::load_script(&existing).is_ok());
    Ok(())
}

/// Test input text that fails validation is rejected before analysis
#[tokio::test]
async fn test_analyze_shortInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "short.txt", "\"Hi,\" she said.")?;
    let app = AppController::with_provider(common::test_config(), Arc::new(MockProvider::working()));

    let result = app.analyze(&input, None, false, true).await;

    assert!(result.is_err());
    assert!(!temp_dir.path().join("short.script.json").exists());
    Ok(())
}

/// Test refine refuses a script without character names
#[tokio::test]
async fn test_refine_noCharacters_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let text = "The sky was grey over the harbour and the boats rocked slowly at their moorings. \
                Nobody spoke for a long time while the tide came in.";
    let input = common::create_test_file(temp_dir.path(), "quiet.txt", text)?;
    let app = AppController::with_provider(common::test_config(), Arc::new(MockProvider::working()));
    let script_path = app.analyze(&input, None, false, true).await?;

    assert!(app.refine(&script_path).await.is_err());
    Ok(())
}
