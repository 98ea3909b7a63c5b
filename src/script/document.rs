/*!
 * Versioned script document.
 *
 * Passes never mutate a [`Script`] directly. They produce either a new line
 * sequence or a list of [`LinePatch`]es, and the controller applies the result
 * in one step on the pass's completion event. Every applied change bumps
 * [`Script::version`].
 */

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::AnalysisError;

use super::cast::{merge_character_groups, CastRegistry, CharacterGroup, CharacterProfile, VoiceAssignment};
use super::model::{is_character_name, is_known_attribute, Line};

/// Update to a single line, keyed by its position in the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePatch {
    /// Position of the line in reading order
    pub index: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
}

impl LinePatch {
    /// Patch that sets speaker and profile of a line.
    pub fn resolved(
        index: usize,
        speaker: impl Into<String>,
        gender: impl Into<String>,
        age_range: impl Into<String>,
    ) -> Self {
        Self {
            index,
            speaker: Some(speaker.into()),
            gender: Some(gender.into()),
            age_range: Some(age_range.into()),
        }
    }
}

/// One entry of the cast list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CastEntry {
    pub speaker: String,
    pub line_count: usize,
}

/// A distinct character name with a line it was attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerCandidate {
    pub name: String,
    /// Text of the first line carrying this speaker
    pub representative: String,
    /// Number of lines carrying this speaker
    pub occurrences: usize,
}

/// Ordered lines plus cast registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    version: u64,

    lines: Vec<Line>,

    #[serde(default)]
    cast: CastRegistry,
}

impl Script {
    /// Create a script from segmenter output.
    pub fn new(lines: Vec<Line>) -> Self {
        Self {
            version: 0,
            lines,
            cast: CastRegistry::default(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn cast(&self) -> &CastRegistry {
        &self.cast
    }

    /// Replace the whole line sequence (used by passes that return a transformed copy).
    pub fn replace_lines(&mut self, lines: Vec<Line>) {
        self.lines = lines;
        self.bump();
    }

    /// Assign a voice to a speaker.
    pub fn assign_voice(&mut self, speaker: &str, voice: VoiceAssignment) {
        self.cast.assign_voice(speaker, voice);
        self.bump();
    }

    /// Apply a set of line patches atomically.
    ///
    /// All indices are checked before anything is written, so an invalid patch
    /// leaves the script untouched. Known profiles are recorded in the cast
    /// registry and propagated to every line of the same speaker.
    pub fn apply_patches(&mut self, patches: &[LinePatch]) -> Result<usize, AnalysisError> {
        let len = self.lines.len();
        if let Some(bad) = patches.iter().find(|p| p.index >= len) {
            return Err(AnalysisError::InvalidPatch { index: bad.index, len });
        }
        if patches.is_empty() {
            return Ok(0);
        }

        for patch in patches {
            let line = &mut self.lines[patch.index];
            if let Some(speaker) = &patch.speaker {
                line.speaker = speaker.clone();
            }
            if patch.gender.is_some() {
                line.gender = patch.gender.clone();
            }
            if patch.age_range.is_some() {
                line.age_range = patch.age_range.clone();
            }

            if is_character_name(&line.speaker)
                && (is_known_attribute(line.gender.as_deref())
                    || is_known_attribute(line.age_range.as_deref()))
            {
                let profile = CharacterProfile {
                    gender: line.gender.clone(),
                    age_range: line.age_range.clone(),
                };
                let speaker = line.speaker.clone();
                self.cast.record_profile(&speaker, profile);
            }
        }

        self.sync_profiles();
        self.bump();
        debug!("Applied {} line patches (script version {})", patches.len(), self.version);
        Ok(patches.len())
    }

    /// Rename speakers according to a correction map.
    ///
    /// Identity entries are ignored. Returns the number of rewritten lines.
    pub fn rename_speakers(&mut self, corrections: &HashMap<String, String>) -> usize {
        let mut changed = 0;
        for line in &mut self.lines {
            if let Some(new_name) = corrections.get(&line.speaker) {
                if *new_name != line.speaker && !new_name.trim().is_empty() {
                    line.speaker = new_name.clone();
                    changed += 1;
                }
            }
        }
        for (from, to) in corrections {
            if from != to && !to.trim().is_empty() {
                self.cast.rename(from, to);
            }
        }
        if changed > 0 {
            self.sync_profiles();
            self.bump();
        }
        changed
    }

    /// Normalise proposed groups against this script.
    ///
    /// Chained groups are folded into their root, and a primary name that
    /// differs only in case from an existing speaker takes that speaker's
    /// spelling.
    pub fn canonical_groups(&self, groups: impl IntoIterator<Item = CharacterGroup>) -> Vec<CharacterGroup> {
        merge_character_groups(groups)
            .into_iter()
            .map(|group| {
                let spelled = self
                    .lines
                    .iter()
                    .map(|line| line.speaker.as_str())
                    .find(|speaker| {
                        *speaker != group.primary_name && speaker.to_lowercase() == group.primary_name.to_lowercase()
                    });
                match spelled {
                    Some(speaker) => CharacterGroup::new(speaker, group.aliases),
                    None => group,
                }
            })
            .collect()
    }

    /// Apply character groups: merge cast entries and rewrite alias speakers
    /// to their primary name. Applying the same groups twice is a no-op.
    pub fn apply_groups(&mut self, groups: &[CharacterGroup]) -> usize {
        let groups = self.canonical_groups(groups.iter().cloned());
        let mut changed = 0;
        for group in &groups {
            self.cast.merge_group(group);
            for line in &mut self.lines {
                if line.speaker != group.primary_name && group.aliases.contains(&line.speaker) {
                    line.speaker = group.primary_name.clone();
                    changed += 1;
                }
            }
        }
        self.sync_profiles();
        self.bump();
        changed
    }

    /// Copy known cast profiles onto the lines of each speaker.
    fn sync_profiles(&mut self) {
        for line in &mut self.lines {
            let Some(profile) = self.cast.profiles.get(&line.speaker) else {
                continue;
            };
            if is_known_attribute(profile.gender.as_deref()) {
                line.gender = profile.gender.clone();
            }
            if is_known_attribute(profile.age_range.as_deref()) {
                line.age_range = profile.age_range.clone();
            }
        }
    }

    /// Distinct speakers with their line counts, in first-appearance order.
    pub fn cast_list(&self) -> Vec<CastEntry> {
        let mut entries: Vec<CastEntry> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for line in &self.lines {
            match positions.get(line.speaker.as_str()) {
                Some(&pos) => entries[pos].line_count += 1,
                None => {
                    positions.insert(&line.speaker, entries.len());
                    entries.push(CastEntry {
                        speaker: line.speaker.clone(),
                        line_count: 1,
                    });
                }
            }
        }
        entries
    }

    /// Distinct character names (no narrator, placeholder or sentinel), each
    /// with the first line attributed to it, in first-appearance order.
    pub fn speaker_candidates(&self) -> Vec<SpeakerCandidate> {
        let mut candidates: Vec<SpeakerCandidate> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for line in &self.lines {
            if !is_character_name(&line.speaker) {
                continue;
            }
            match positions.get(line.speaker.as_str()) {
                Some(&pos) => candidates[pos].occurrences += 1,
                None => {
                    positions.insert(&line.speaker, candidates.len());
                    candidates.push(SpeakerCandidate {
                        name: line.speaker.clone(),
                        representative: line.text.clone(),
                        occurrences: 1,
                    });
                }
            }
        }
        candidates
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}
