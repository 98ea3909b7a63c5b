/*!
 * Character grouping.
 *
 * Asks the LLM to cluster speaker names that denote the same character, then
 * merges the groups proposed by every batch by case-insensitive primary name.
 * A run that produces no group at all is an error: there is nothing sensible
 * to apply.
 */

use log::{info, warn};
use serde_json::Value;

use crate::errors::AnalysisError;
use crate::providers::CompletionRequest;
use crate::script::{CharacterGroup, Script};

use super::batching::{batch_by_budget, run_with_split};
use super::llm::LlmClient;
use super::parsing::{extract_json_array, value_str};
use super::prompts::grouping_prompt;
use super::{AnalysisSettings, CancellationFlag};

/// Sample lines are cut to this many characters in prompts
const MAX_SAMPLE_CHARS: usize = 100;

/// Parse `{"character_groups": [...]}` or a bare array of groups
pub fn parse_groups(raw: &str) -> Vec<CharacterGroup> {
    let Some(items) = extract_json_array(raw, Some("character_groups")) else {
        warn!("No character groups found in LLM answer");
        return Vec::new();
    };
    items.iter().filter_map(group_from_json).collect()
}

fn group_from_json(value: &Value) -> Option<CharacterGroup> {
    let primary = value_str(value, "primary_name").filter(|p| !p.is_empty())?;
    let aliases: Vec<String> = match value.get("aliases") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|a| a.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(single)) => single.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    };
    Some(CharacterGroup::new(primary, aliases))
}

/// LLM-assisted grouping pass
#[derive(Debug)]
pub struct CharacterGrouper<'a> {
    client: &'a LlmClient,
    settings: &'a AnalysisSettings,
}

impl<'a> CharacterGrouper<'a> {
    pub fn new(client: &'a LlmClient, settings: &'a AnalysisSettings) -> Self {
        Self { client, settings }
    }

    /// Run grouping over the script's character names
    pub async fn run(&self, script: &Script, cancel: &CancellationFlag) -> Result<Vec<CharacterGroup>, AnalysisError> {
        let candidates = script.speaker_candidates();
        if candidates.is_empty() {
            return Err(AnalysisError::Precondition("No character names to group".to_string()));
        }
        info!("Grouping {} speaker names", candidates.len());

        let entries: Vec<String> = candidates
            .iter()
            .map(|c| {
                let sample: String = c.representative.chars().take(MAX_SAMPLE_CHARS).collect();
                format!("- **{}**: \"{}...\"", c.name, sample)
            })
            .collect();
        let batches = batch_by_budget(entries, self.settings.batch_char_budget, |e| e.len());

        let client = self.client;
        let timeout = self.settings.grouping_timeout;
        let proposed = run_with_split(batches, cancel, |batch: Vec<String>| async move {
            let request = CompletionRequest::new(grouping_prompt(&batch)).timeout(timeout);
            match client.complete_with_retry(request).await {
                Ok(raw) => Ok(parse_groups(&raw)),
                Err(e) => Err((batch, e)),
            }
        })
        .await?;

        let groups = script.canonical_groups(proposed);
        if groups.is_empty() {
            return Err(AnalysisError::Precondition(
                "The LLM produced no character groups".to_string(),
            ));
        }
        info!("Grouping produced {} character groups", groups.len());
        Ok(groups)
    }
}
