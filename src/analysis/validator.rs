/*!
 * Speaker name validator.
 *
 * Rules-based tagging sometimes records a verb or a scrap of narration as the
 * speaker ("said", "Then John"). This pass asks the LLM, in batches, whether
 * each distinct speaker label is a proper name and builds a correction map
 * from label to name. Only the most frequent labels are checked.
 */

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::errors::AnalysisError;
use crate::providers::CompletionRequest;
use crate::script::{Script, SpeakerCandidate};
use crate::segmentation::patterns::{alternation, is_pronoun, REPORTING_VERBS};

use super::batching::{batch_by_budget, run_with_split};
use super::llm::LlmClient;
use super::parsing::{extract_json_array, extract_key_values, parse_bool, value_bool, value_str};
use super::prompts::validation_prompt;
use super::{AnalysisSettings, CancellationFlag};

/// Representative lines are cut to this many characters in prompts
const MAX_SAMPLE_CHARS: usize = 200;

const VERDICT_KEYS: &[&str] = &["original_name", "is_name", "suggested_name", "reason"];

const NAME: &str = r"\p{Lu}[\p{L}\-']*(?:[ \t]+\p{Lu}[\p{L}\-']*)?";

/// `"..." Name said`
static QUOTE_THEN_NAME_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"["”]\s*({NAME})\s+(?i:{})\b"#,
        alternation(REPORTING_VERBS)
    ))
    .expect("Invalid quote-name-verb regex")
});

/// `"...", Name,"`
static QUOTE_COMMA_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r#"["”]\s*,?\s*({NAME})\s*,\s*["“]?"#)).expect("Invalid quote-comma-name regex")
});

static CAPITALIZED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}[\p{L}\-']+").expect("Invalid capitalized token regex"));

static QUOTED_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*"|“[^”]*”"#).expect("Invalid quoted span regex"));

/// Capitalized words that start sentences rather than name anyone
const NON_NAME_WORDS: &[&str] = &["The", "A", "An", "Then", "But", "And", "So", "When", "Yes", "No"];

/// LLM judgement on one speaker label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameVerdict {
    pub original_name: String,
    pub is_name: bool,
    #[serde(default)]
    pub suggested_name: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl NameVerdict {
    fn from_json(value: &Value) -> Option<Self> {
        Some(Self {
            original_name: value_str(value, "original_name")?,
            is_name: value_bool(value, "is_name").unwrap_or(true),
            suggested_name: value_str(value, "suggested_name").filter(|s| !s.is_empty()),
            reason: value_str(value, "reason"),
        })
    }

    fn from_key_values(record: &HashMap<String, String>) -> Option<Self> {
        Some(Self {
            original_name: record.get("original_name")?.trim().to_string(),
            is_name: record.get("is_name").and_then(|v| parse_bool(v)).unwrap_or(true),
            suggested_name: record
                .get("suggested_name")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null")),
            reason: record.get("reason").cloned(),
        })
    }
}

/// Parse verdicts: JSON first, `key: value` text second
pub fn parse_verdicts(raw: &str) -> Vec<NameVerdict> {
    let from_json: Vec<NameVerdict> = extract_json_array(raw, None)
        .map(|items| items.iter().filter_map(NameVerdict::from_json).collect())
        .unwrap_or_default();
    if !from_json.is_empty() {
        return from_json;
    }
    extract_key_values(raw, VERDICT_KEYS)
        .iter()
        .filter_map(NameVerdict::from_key_values)
        .collect()
}

/// Guess the speaker from the line a bad label was taken from
pub fn infer_name_from_line(line: &str, original: &str) -> String {
    let plausible = |name: &str| !is_pronoun(name) && !NON_NAME_WORDS.contains(&name);

    if let Some(name) = QUOTE_THEN_NAME_VERB
        .captures(line)
        .map(|c| c[1].trim().to_string())
        .filter(|n| plausible(n))
    {
        return name;
    }
    if let Some(name) = QUOTE_COMMA_NAME
        .captures(line)
        .map(|c| c[1].trim().to_string())
        .filter(|n| plausible(n))
    {
        return name;
    }
    let narration = QUOTED_SPAN.replace_all(line, " ");
    if let Some(token) = CAPITALIZED_TOKEN
        .find_iter(&narration)
        .map(|m| m.as_str())
        .find(|t| plausible(t))
    {
        return token.to_string();
    }
    original.to_string()
}

/// Build the label-to-name map from verdicts; identity entries are dropped
pub fn corrections_from_verdicts(
    verdicts: &[NameVerdict],
    candidates: &[SpeakerCandidate],
) -> HashMap<String, String> {
    let samples: HashMap<&str, &str> = candidates
        .iter()
        .map(|c| (c.name.as_str(), c.representative.as_str()))
        .collect();

    let mut corrections = HashMap::new();
    for verdict in verdicts {
        let Some(&sample) = samples.get(verdict.original_name.as_str()) else {
            debug!("Ignoring verdict for unknown label '{}'", verdict.original_name);
            continue;
        };
        if verdict.is_name {
            continue;
        }
        let corrected = match &verdict.suggested_name {
            Some(suggested) if *suggested != verdict.original_name => suggested.clone(),
            _ => infer_name_from_line(sample, &verdict.original_name),
        };
        if corrected != verdict.original_name {
            corrections.insert(verdict.original_name.clone(), corrected);
        }
    }
    corrections
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// LLM-assisted validation pass
#[derive(Debug)]
pub struct NameValidator<'a> {
    client: &'a LlmClient,
    settings: &'a AnalysisSettings,
}

impl<'a> NameValidator<'a> {
    pub fn new(client: &'a LlmClient, settings: &'a AnalysisSettings) -> Self {
        Self { client, settings }
    }

    /// The most frequent speaker labels, ties in first-appearance order
    pub fn select_candidates(script: &Script, max: usize) -> Vec<SpeakerCandidate> {
        let mut candidates = script.speaker_candidates();
        if candidates.len() > max {
            candidates.sort_by(|a, b| b.occurrences.cmp(&a.occurrences));
            warn!(
                "{} speaker labels found, validating the {} most frequent",
                candidates.len(),
                max
            );
            candidates.truncate(max);
        }
        candidates
    }

    /// Run validation and return the correction map
    pub async fn run(&self, script: &Script, cancel: &CancellationFlag) -> Result<HashMap<String, String>, AnalysisError> {
        let candidates = Self::select_candidates(script, self.settings.max_validation_candidates);
        if candidates.is_empty() {
            info!("No speaker names to validate");
            return Ok(HashMap::new());
        }
        info!("Validating {} speaker names", candidates.len());

        let entries: Vec<String> = candidates
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "line": truncate_chars(&c.representative, MAX_SAMPLE_CHARS),
                })
                .to_string()
            })
            .collect();
        let batches = batch_by_budget(entries, self.settings.batch_char_budget, |e| e.len());

        let client = self.client;
        let timeout = self.settings.validation_timeout;
        let verdicts = run_with_split(batches, cancel, |batch: Vec<String>| async move {
            let request = CompletionRequest::new(validation_prompt(&batch)).timeout(timeout);
            match client.complete_with_retry(request).await {
                Ok(raw) => Ok(parse_verdicts(&raw)),
                Err(e) => Err((batch, e)),
            }
        })
        .await?;

        let corrections = corrections_from_verdicts(&verdicts, &candidates);
        info!("Name validation proposed {} corrections", corrections.len());
        Ok(corrections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::RetryPolicy;
    use crate::providers::mock::MockProvider;
    use crate::script::Line;
    use std::sync::Arc;

    fn candidate(name: &str, line: &str) -> SpeakerCandidate {
        SpeakerCandidate {
            name: name.to_string(),
            representative: line.to_string(),
            occurrences: 1,
        }
    }

    #[test]
    fn test_parseVerdicts_json_shouldParse() {
        let raw = r#"[{"original_name": "said", "is_name": false, "suggested_name": "John Doe", "reason": "verb"},
                      {"original_name": "Mary", "is_name": true}]"#;
        let verdicts = parse_verdicts(raw);
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].suggested_name.as_deref(), Some("John Doe"));
        assert!(verdicts[1].is_name);
    }

    #[test]
    fn test_parseVerdicts_looseText_shouldUseKeyValueFallback() {
        let verdicts = parse_verdicts("original_name: said, is_name: false, suggested_name: John Doe");
        assert_eq!(
            verdicts,
            vec![NameVerdict {
                original_name: "said".to_string(),
                is_name: false,
                suggested_name: Some("John Doe".to_string()),
                reason: None,
            }]
        );
    }

    #[test]
    fn test_inferNameFromLine_shouldTryPatternsInOrder() {
        assert_eq!(infer_name_from_line("\"Get out\" Martha said quietly.", "said"), "Martha");
        assert_eq!(infer_name_from_line("\"Well\", Tom, \"maybe not\"", "x"), "Tom");
        assert_eq!(infer_name_from_line("\"Run!\" The guard saw Peter.", "x"), "Peter");
        assert_eq!(infer_name_from_line("\"Run!\"", "said"), "said");
    }

    #[test]
    fn test_corrections_noSuggestion_shouldInferLocally() {
        let candidates = vec![candidate("said", "\"Go home\" Martha said.")];
        let verdicts = vec![NameVerdict {
            original_name: "said".to_string(),
            is_name: false,
            suggested_name: None,
            reason: None,
        }];

        let corrections = corrections_from_verdicts(&verdicts, &candidates);

        assert_eq!(corrections.get("said").map(String::as_str), Some("Martha"));
    }

    #[test]
    fn test_selectCandidates_overCap_shouldKeepMostFrequent() {
        let script = Script::new(vec![
            Line::new("Ann", "\"a\""),
            Line::new("Bob", "\"b\""),
            Line::new("Bob", "\"b2\""),
            Line::new("Cid", "\"c\""),
            Line::new("Cid", "\"c2\""),
        ]);

        let selected = NameValidator::select_candidates(&script, 2);

        let names: Vec<&str> = selected.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Cid"]);
    }

    #[test]
    fn test_truncateChars_shouldCutLongSamples() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }

    #[tokio::test]
    async fn test_run_malformedAnswer_shouldStillCorrect() {
        let provider = MockProvider::working()
            .with_route("Return JSON array", "original_name: said, is_name: false, suggested_name: John Doe");
        let llm = LlmClient::new(Arc::new(provider.clone()), RetryPolicy::new(0, 0));
        let settings = AnalysisSettings::default();
        let script = Script::new(vec![Line::new("said", "\"Hello there.\""), Line::new("Mary", "\"Hi.\"")]);

        let corrections = NameValidator::new(&llm, &settings)
            .run(&script, &CancellationFlag::new())
            .await
            .unwrap();

        assert_eq!(corrections.len(), 1);
        assert_eq!(corrections["said"], "John Doe");
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test]
    async fn test_run_batchFailure_shouldSplitAndSkip() {
        let provider = MockProvider::failing();
        let llm = LlmClient::new(Arc::new(provider.clone()), RetryPolicy::new(0, 0));
        let mut settings = AnalysisSettings::default();
        settings.batch_char_budget = 10_000;
        let script = Script::new(vec![Line::new("Ann", "\"a\""), Line::new("Bob", "\"b\"")]);

        let corrections = NameValidator::new(&llm, &settings)
            .run(&script, &CancellationFlag::new())
            .await
            .unwrap();

        assert!(corrections.is_empty());
        // Whole batch, then each half
        assert_eq!(provider.request_count(), 3);
    }
}
