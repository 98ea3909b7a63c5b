/*!
 * Quote-fragment rejoiner.
 *
 * The segmenter sometimes splits a short quoted piece (a possessive `'s`, a
 * contraction tail, a nickname in quotes) into a line of its own. This pass
 * finds such candidates, asks the LLM in batches whether each is dialogue or a
 * fragment, and merges fragments into a neighbouring line. When the LLM gives
 * no usable answer for a batch, every candidate in it is merged into the
 * previous line.
 */

use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::errors::AnalysisError;
use crate::providers::CompletionRequest;
use crate::script::Line;
use crate::segmentation::classify_pov;

use super::batching::batch_by_budget;
use super::llm::LlmClient;
use super::parsing::{extract_json_array, value_bool, value_str, value_usize};
use super::prompts::fragment_prompt;
use super::{AnalysisSettings, CancellationFlag};

/// Longest line checked for apostrophe fragments
const MAX_APOSTROPHE_CANDIDATE_CHARS: usize = 40;

/// Longest double-quoted span treated as a candidate
const MAX_DOUBLE_QUOTED_CANDIDATE_CHARS: usize = 20;

static APOSTROPHE_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^['’‘]\p{L}|\p{L}['’]\p{L}|\p{L}['’]\s*$)").expect("Invalid apostrophe fragment regex")
});

/// Quote character that made a line a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteKind {
    Single,
    Double,
}

/// Short line suspected to be a split fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentCandidate {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: QuoteKind,
    pub text: String,
}

/// What to do with a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentAction {
    AppendPrev,
    AppendNext,
    Keep,
}

impl std::str::FromStr for FragmentAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "append_prev" | "append_previous" => Ok(Self::AppendPrev),
            "append_next" => Ok(Self::AppendNext),
            "keep" => Ok(Self::Keep),
            _ => Err(anyhow::anyhow!("Invalid fragment action: {}", s)),
        }
    }
}

/// Result of the rejoin pass
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentOutcome {
    /// Line sequence after merging
    pub lines: Vec<Line>,
    /// Original indices of the lines merged away
    pub fixed_indexes: Vec<usize>,
}

/// Find lines that look like split-off quote fragments
pub fn find_candidates(lines: &[Line]) -> Vec<FragmentCandidate> {
    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_chapter_start())
        .filter_map(|(index, line)| {
            let text = line.text.trim();
            let chars = text.chars().count();
            let kind = if chars <= MAX_DOUBLE_QUOTED_CANDIDATE_CHARS && is_double_quoted(text) {
                QuoteKind::Double
            } else if chars <= MAX_APOSTROPHE_CANDIDATE_CHARS && APOSTROPHE_FRAGMENT.is_match(text) {
                QuoteKind::Single
            } else {
                return None;
            };
            Some(FragmentCandidate {
                index,
                kind,
                text: text.to_string(),
            })
        })
        .collect()
}

fn is_double_quoted(text: &str) -> bool {
    // A comma after the closing quote stays with the quotation
    let mut chars = text.strip_suffix(',').unwrap_or(text).chars();
    matches!(
        (chars.next(), chars.next_back()),
        (Some('"' | '“'), Some('"' | '”'))
    )
}

fn starts_with_apostrophe(text: &str) -> bool {
    text.starts_with(['\'', '’'])
}

/// Action used when the LLM gives no usable answer
pub fn fallback_action(index: usize, len: usize) -> FragmentAction {
    if index > 0 {
        FragmentAction::AppendPrev
    } else if len > 1 {
        FragmentAction::AppendNext
    } else {
        FragmentAction::Keep
    }
}

/// Merge fragments into their neighbours.
///
/// Actions refer to indices of `lines`; all targets are worked out on the
/// unmodified sequence before anything is removed. A fragment starting with an
/// apostrophe is joined without a space. Merged lines keep the speaker of the
/// line they were merged into.
pub fn apply_fragment_actions(lines: &[Line], actions: &HashMap<usize, FragmentAction>) -> FragmentOutcome {
    let len = lines.len();
    let action = |i: usize| actions.get(&i).copied().unwrap_or(FragmentAction::Keep);

    // An append_next whose neighbour appends back would form a cycle; the pair
    // merges into the earlier line.
    let effective: Vec<FragmentAction> = (0..len)
        .map(|i| match action(i) {
            FragmentAction::AppendPrev if i > 0 => FragmentAction::AppendPrev,
            FragmentAction::AppendNext if i + 1 < len && action(i + 1) != FragmentAction::AppendPrev => {
                FragmentAction::AppendNext
            }
            _ => FragmentAction::Keep,
        })
        .collect();

    let root = |mut i: usize| loop {
        match effective[i] {
            FragmentAction::AppendPrev => i -= 1,
            FragmentAction::AppendNext => i += 1,
            FragmentAction::Keep => return i,
        }
    };

    let mut texts: HashMap<usize, String> = HashMap::new();
    let mut fixed_indexes = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let target = root(i);
        if target != i {
            fixed_indexes.push(i);
        }
        let piece = line.text.trim();
        match texts.get_mut(&target) {
            Some(text) => {
                if !starts_with_apostrophe(piece) {
                    text.push(' ');
                }
                text.push_str(piece);
            }
            None => {
                texts.insert(target, piece.to_string());
            }
        }
    }

    let merged: HashSet<usize> = fixed_indexes.iter().copied().collect();
    let lines = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !merged.contains(i))
        .map(|(i, line)| match texts.remove(&i) {
            Some(text) if text != line.text => {
                let mut joined = line.clone();
                joined.pov = classify_pov(&text);
                joined.text = text;
                joined
            }
            _ => line.clone(),
        })
        .collect();

    FragmentOutcome { lines, fixed_indexes }
}

/// LLM-assisted rejoin pass
#[derive(Debug)]
pub struct FragmentRejoiner<'a> {
    client: &'a LlmClient,
    settings: &'a AnalysisSettings,
}

impl<'a> FragmentRejoiner<'a> {
    pub fn new(client: &'a LlmClient, settings: &'a AnalysisSettings) -> Self {
        Self { client, settings }
    }

    pub async fn run(&self, lines: &[Line], cancel: &CancellationFlag) -> Result<FragmentOutcome, AnalysisError> {
        let candidates = find_candidates(lines);
        if candidates.is_empty() {
            info!("No quote fragment candidates found");
            return Ok(FragmentOutcome {
                lines: lines.to_vec(),
                fixed_indexes: Vec::new(),
            });
        }
        info!("Checking {} quote fragment candidates", candidates.len());

        let entries: Vec<(FragmentCandidate, String)> = candidates
            .into_iter()
            .map(|c| {
                let entry = candidate_entry(lines, &c);
                (c, entry)
            })
            .collect();
        let batches = batch_by_budget(entries, self.settings.batch_char_budget, |(_, entry)| entry.len());

        let mut actions: HashMap<usize, FragmentAction> = HashMap::new();
        for batch in batches {
            cancel.check()?;
            actions.extend(self.classify_batch(lines.len(), &batch).await);
        }

        let outcome = apply_fragment_actions(lines, &actions);
        info!("Merged {} quote fragments", outcome.fixed_indexes.len());
        Ok(outcome)
    }

    async fn classify_batch(
        &self,
        len: usize,
        batch: &[(FragmentCandidate, String)],
    ) -> HashMap<usize, FragmentAction> {
        let entries: Vec<String> = batch.iter().map(|(_, entry)| entry.clone()).collect();
        let request = CompletionRequest::new(fragment_prompt(&entries)).timeout(self.settings.fragments_timeout);
        let batch_indices: HashSet<usize> = batch.iter().map(|(c, _)| c.index).collect();

        let parsed = match self.client.complete_with_retry(request).await {
            Ok(raw) => parse_actions(&raw, &batch_indices),
            Err(e) => {
                warn!("Fragment check failed for batch of {}: {}", batch.len(), e);
                None
            }
        };

        match parsed {
            Some(actions) => actions,
            None => {
                warn!("Falling back to merging {} candidates into the previous line", batch.len());
                batch
                    .iter()
                    .map(|(c, _)| (c.index, fallback_action(c.index, len)))
                    .collect()
            }
        }
    }
}

fn candidate_entry(lines: &[Line], candidate: &FragmentCandidate) -> String {
    let prev = candidate
        .index
        .checked_sub(1)
        .and_then(|i| lines.get(i))
        .map(|l| l.text.as_str())
        .unwrap_or_default();
    let next = lines.get(candidate.index + 1).map(|l| l.text.as_str()).unwrap_or_default();
    let value = serde_json::json!({
        "index": candidate.index,
        "type": candidate.kind,
        "text": candidate.text,
        "prev": prev,
        "next": next,
    });
    format!("CAND: {}", value)
}

/// Parse `[{index, is_dialogue, suggested_action}]`, ignoring indices outside
/// the batch. `None` when no JSON array can be found.
fn parse_actions(raw: &str, batch_indices: &HashSet<usize>) -> Option<HashMap<usize, FragmentAction>> {
    let items = extract_json_array(raw, None)?;
    let mut actions = HashMap::new();
    for item in &items {
        let Some(index) = value_usize(item, "index") else {
            continue;
        };
        if !batch_indices.contains(&index) {
            continue;
        }
        let action = if value_bool(item, "is_dialogue") == Some(true) {
            FragmentAction::Keep
        } else {
            value_str(item, "suggested_action")
                .and_then(|a| a.parse().ok())
                .unwrap_or(FragmentAction::AppendPrev)
        };
        actions.insert(index, action);
    }
    Some(actions)
}
