/*!
 * Ambiguity resolver.
 *
 * Names the speaker of every `AMBIGUOUS` line and profiles (gender, age range)
 * speakers that are known but have no profile yet. One LLM call per item, with
 * surrounding lines as context. Failures never abort the pass: an item that
 * cannot be resolved gets a sentinel speaker and `Unknown` attributes.
 */

use log::{debug, info, warn};
use std::collections::HashSet;

use crate::errors::{AnalysisError, ProviderError};
use crate::providers::CompletionRequest;
use crate::script::{is_character_name, LinePatch, Script, NARRATOR, TIMED_OUT, UNKNOWN, UNKNOWN_ATTRIBUTE};
use crate::segmentation::title_case;

use super::llm::LlmClient;
use super::prompts::{identification_prompt, profile_prompt, LineContext};
use super::{AnalysisSettings, CancellationFlag};

/// Longest plausible multi-word name
const MAX_NAME_CHARS: usize = 30;

/// Lead-ins verbose models put before the name
const LEAD_IN_PHRASES: &[&str] = &[
    "the speaker of the dialogue is ",
    "the speaker is ",
    "speaker: ",
    "it is likely that the speaker is ",
    "the speaker could be ",
];

/// What a resolution item asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Name the speaker of an ambiguous line
    Identify,
    /// Describe a known speaker
    Profile { speaker: String },
}

/// One unit of resolver work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionItem {
    pub index: usize,
    pub kind: ResolutionKind,
}

/// Resolver over a script snapshot
#[derive(Debug)]
pub struct AmbiguityResolver<'a> {
    client: &'a LlmClient,
    settings: &'a AnalysisSettings,
}

impl<'a> AmbiguityResolver<'a> {
    pub fn new(client: &'a LlmClient, settings: &'a AnalysisSettings) -> Self {
        Self { client, settings }
    }

    /// Ambiguous lines plus the first unprofiled line of each known speaker,
    /// in index order.
    pub fn work_items(script: &Script) -> Vec<ResolutionItem> {
        let mut profiled: HashSet<&str> = script
            .cast()
            .profiles
            .iter()
            .filter(|(_, p)| p.is_known())
            .map(|(name, _)| name.as_str())
            .collect();

        let mut items = Vec::new();
        for (index, line) in script.lines().iter().enumerate() {
            if line.is_ambiguous() {
                items.push(ResolutionItem {
                    index,
                    kind: ResolutionKind::Identify,
                });
            } else if is_character_name(&line.speaker) && line.needs_profile() && profiled.insert(line.speaker.as_str()) {
                items.push(ResolutionItem {
                    index,
                    kind: ResolutionKind::Profile {
                        speaker: line.speaker.clone(),
                    },
                });
            }
        }
        items
    }

    /// Resolve every item, reporting each result through `on_progress` in
    /// index order. Returns the patches to apply.
    pub async fn run(
        &self,
        script: &Script,
        items: &[ResolutionItem],
        cancel: &CancellationFlag,
        mut on_progress: impl FnMut(&LinePatch),
    ) -> Result<Vec<LinePatch>, AnalysisError> {
        info!("Resolving {} items", items.len());
        let mut patches = Vec::with_capacity(items.len());

        for item in items {
            cancel.check()?;
            let patch = self.resolve_item(script, item).await;
            on_progress(&patch);
            patches.push(patch);
        }

        info!("Resolution finished for {} items", patches.len());
        Ok(patches)
    }

    async fn resolve_item(&self, script: &Script, item: &ResolutionItem) -> LinePatch {
        let context = self.context_for(script, item.index);
        let prompt = match &item.kind {
            ResolutionKind::Identify => identification_prompt(&context),
            ResolutionKind::Profile { speaker } => profile_prompt(speaker, &context),
        };
        let request = CompletionRequest::new(prompt)
            .add_stop("\n")
            .add_stop("<|im_end|>")
            .timeout(self.settings.resolution_timeout);

        match self.client.complete_with_retry(request).await {
            Ok(raw) => {
                let (speaker, gender, age_range) = parse_resolution(&raw);
                let patch = match &item.kind {
                    ResolutionKind::Identify => LinePatch::resolved(item.index, speaker, gender, age_range),
                    ResolutionKind::Profile { speaker: known } => {
                        LinePatch::resolved(item.index, known.clone(), gender, age_range)
                    }
                };
                debug!("Resolved line {}: {:?}", item.index, patch);
                patch
            }
            Err(e) => {
                warn!("Could not resolve line {}: {}", item.index, e);
                failure_patch(item, &e)
            }
        }
    }

    fn context_for(&self, script: &Script, index: usize) -> LineContext {
        let lines = script.lines();
        let window = self.settings.context_window;
        let start = index.saturating_sub(window);
        let end = (index + 1 + window).min(lines.len());
        LineContext {
            before: lines[start..index].iter().map(|l| l.text.clone()).collect(),
            line: lines[index].text.clone(),
            after: lines[index + 1..end].iter().map(|l| l.text.clone()).collect(),
        }
    }
}

fn failure_patch(item: &ResolutionItem, error: &ProviderError) -> LinePatch {
    let speaker = match &item.kind {
        ResolutionKind::Identify if error.is_timeout() => TIMED_OUT.to_string(),
        ResolutionKind::Identify => UNKNOWN.to_string(),
        ResolutionKind::Profile { speaker } => speaker.clone(),
    };
    LinePatch::resolved(item.index, speaker, UNKNOWN_ATTRIBUTE, UNKNOWN_ATTRIBUTE)
}

/// Parse a `Speaker, Gender, AgeRange` answer.
///
/// Never fails: answers in another shape yield a best-effort name with
/// `Unknown` attributes.
pub fn parse_resolution(raw: &str) -> (String, String, String) {
    let first_line = raw
        .trim()
        .trim_end_matches("<|im_end|>")
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();

    let parts: Vec<&str> = first_line.split(',').map(str::trim).collect();
    if parts.len() == 3 && parts.iter().all(|p| !p.is_empty()) {
        let speaker = sanitize_speaker(parts[0]);
        return (speaker, attribute(parts[1]), attribute(parts[2]));
    }

    warn!("LLM answer not in 'Speaker, Gender, AgeRange' form: '{}'", first_line);
    (
        best_effort_name(first_line),
        UNKNOWN_ATTRIBUTE.to_string(),
        UNKNOWN_ATTRIBUTE.to_string(),
    )
}

fn attribute(value: &str) -> String {
    let value = value.trim_end_matches('.').trim();
    if value.is_empty() {
        UNKNOWN_ATTRIBUTE.to_string()
    } else {
        title_case(value)
    }
}

fn is_quote_delimited(name: &str) -> bool {
    const QUOTES: &[char] = &['"', '\'', '“', '”', '‘', '’'];
    let mut chars = name.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) => QUOTES.contains(&first) && QUOTES.contains(&last),
        _ => false,
    }
}

fn sanitize_speaker(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || is_quote_delimited(name) {
        return UNKNOWN.to_string();
    }
    if name.chars().count() > MAX_NAME_CHARS && name.contains(' ') {
        return UNKNOWN.to_string();
    }
    if name.eq_ignore_ascii_case(NARRATOR) {
        return NARRATOR.to_string();
    }
    if name.eq_ignore_ascii_case(UNKNOWN) {
        return UNKNOWN.to_string();
    }
    title_case(name)
}

/// Strip lead-in phrases and keep the text before the first period or comma
pub fn best_effort_name(raw: &str) -> String {
    let mut name = raw.trim();
    for phrase in LEAD_IN_PHRASES {
        let matches_phrase = name
            .get(..phrase.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(phrase));
        if matches_phrase {
            name = name[phrase.len()..].trim();
        }
    }
    let name = name.split(['.', ',']).next().unwrap_or_default();
    sanitize_speaker(name)
}
