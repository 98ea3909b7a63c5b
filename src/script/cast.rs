/*!
 * Cast bookkeeping: voice assignments, character profiles and alias groups.
 */

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::model::is_known_attribute;

/// Voice chosen for a speaker by the (external) voice assignment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceAssignment {
    /// Voice library name
    pub voice_name: String,

    /// Reference audio or model path, if the engine needs one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_path: Option<String>,
}

impl VoiceAssignment {
    /// Create an assignment for a named voice.
    pub fn new(voice_name: impl Into<String>) -> Self {
        Self {
            voice_name: voice_name.into(),
            reference_path: None,
        }
    }

    /// Whether the assignment actually points at a voice
    pub fn is_set(&self) -> bool {
        !self.voice_name.trim().is_empty()
    }
}

/// Gender and age estimate for a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
}

impl CharacterProfile {
    pub fn new(gender: impl Into<String>, age_range: impl Into<String>) -> Self {
        Self {
            gender: Some(gender.into()),
            age_range: Some(age_range.into()),
        }
    }

    /// A profile is known when at least one attribute is neither empty nor `Unknown`.
    pub fn is_known(&self) -> bool {
        is_known_attribute(self.gender.as_deref()) || is_known_attribute(self.age_range.as_deref())
    }
}

/// Voice assignments and profiles keyed by speaker name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastRegistry {
    #[serde(default)]
    pub voice_assignments: BTreeMap<String, VoiceAssignment>,

    #[serde(default)]
    pub profiles: BTreeMap<String, CharacterProfile>,
}

impl CastRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a voice to a speaker.
    pub fn assign_voice(&mut self, speaker: &str, voice: VoiceAssignment) {
        self.voice_assignments.insert(speaker.to_string(), voice);
    }

    /// Record a profile for a speaker, keeping known attributes that the new
    /// profile leaves unknown.
    pub fn record_profile(&mut self, speaker: &str, profile: CharacterProfile) {
        let entry = self.profiles.entry(speaker.to_string()).or_default();
        if is_known_attribute(profile.gender.as_deref()) || entry.gender.is_none() {
            entry.gender = profile.gender;
        }
        if is_known_attribute(profile.age_range.as_deref()) || entry.age_range.is_none() {
            entry.age_range = profile.age_range;
        }
    }

    /// Move the entries of `from` onto `to`, used by speaker renames.
    ///
    /// Existing entries of `to` win.
    pub fn rename(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        if let Some(voice) = self.voice_assignments.remove(from) {
            self.voice_assignments.entry(to.to_string()).or_insert(voice);
        }
        if let Some(profile) = self.profiles.remove(from) {
            let target = self.profiles.entry(to.to_string()).or_default();
            if !target.is_known() {
                *target = profile;
            }
        }
    }

    /// Merge every alias of a group into its primary name.
    ///
    /// The primary's own voice and profile win when already set; otherwise the
    /// first alias carrying one donates it. Alias entries are removed.
    pub fn merge_group(&mut self, group: &CharacterGroup) {
        let primary = group.primary_name.as_str();

        let best_voice = self
            .voice_assignments
            .get(primary)
            .filter(|v| v.is_set())
            .cloned()
            .or_else(|| {
                group
                    .aliases
                    .iter()
                    .filter_map(|alias| self.voice_assignments.get(alias))
                    .find(|v| v.is_set())
                    .cloned()
            });

        let best_profile = self
            .profiles
            .get(primary)
            .filter(|p| p.is_known())
            .cloned()
            .or_else(|| {
                group
                    .aliases
                    .iter()
                    .filter_map(|alias| self.profiles.get(alias))
                    .find(|p| p.is_known())
                    .cloned()
            });

        for alias in &group.aliases {
            if alias != primary {
                self.voice_assignments.remove(alias);
                self.profiles.remove(alias);
            }
        }

        if let Some(voice) = best_voice {
            self.voice_assignments.insert(primary.to_string(), voice);
        }
        if let Some(profile) = best_profile {
            self.profiles.insert(primary.to_string(), profile);
        }
    }
}

/// Cluster of speaker names that denote the same character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterGroup {
    pub primary_name: String,

    /// Never contains `primary_name`
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl CharacterGroup {
    /// Create a group, dropping aliases equal to the primary name and duplicates.
    pub fn new(primary_name: impl Into<String>, aliases: impl IntoIterator<Item = String>) -> Self {
        let mut group = Self {
            primary_name: primary_name.into().trim().to_string(),
            aliases: Vec::new(),
        };
        for alias in aliases {
            group.add_alias(&alias);
        }
        group
    }

    /// Add an alias unless it duplicates the primary or an existing alias
    /// (case-insensitively).
    pub fn add_alias(&mut self, alias: &str) {
        let alias = alias.trim();
        if alias.is_empty() || alias.eq_ignore_ascii_case(&self.primary_name) {
            return;
        }
        if self.aliases.iter().any(|a| a.eq_ignore_ascii_case(alias)) {
            return;
        }
        self.aliases.push(alias.to_string());
    }
}

/// Merge groups proposed across batches.
///
/// Groups are keyed by lower-cased primary name; the first spelling seen is
/// kept, alias sets are unioned and aliases equal to the primary are dropped.
/// A group whose primary is an alias of another group is folded into that
/// group's root, so no primary is ever left as someone else's alias.
/// Output keeps first-appearance order.
pub fn merge_character_groups(groups: impl IntoIterator<Item = CharacterGroup>) -> Vec<CharacterGroup> {
    collapse_chains(merge_by_primary(groups))
}

fn merge_by_primary(groups: impl IntoIterator<Item = CharacterGroup>) -> Vec<CharacterGroup> {
    let mut merged: Vec<CharacterGroup> = Vec::new();
    let mut by_key: HashMap<String, usize> = HashMap::new();

    for group in groups {
        let key = group.primary_name.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match by_key.get(&key) {
            Some(&idx) => {
                for alias in &group.aliases {
                    merged[idx].add_alias(alias);
                }
            }
            None => {
                by_key.insert(key, merged.len());
                merged.push(CharacterGroup::new(group.primary_name, group.aliases));
            }
        }
    }

    merged
}

/// Fold chained groups (`A <- [B]`, `B <- [C]`) into their root group.
///
/// The first group claiming an alias owns it. In a cycle the earliest group
/// becomes the root.
fn collapse_chains(groups: Vec<CharacterGroup>) -> Vec<CharacterGroup> {
    let mut owner: HashMap<String, usize> = HashMap::new();
    for (idx, group) in groups.iter().enumerate() {
        for alias in &group.aliases {
            owner.entry(alias.to_lowercase()).or_insert(idx);
        }
    }

    let parent = |idx: usize| {
        owner
            .get(&groups[idx].primary_name.to_lowercase())
            .copied()
            .filter(|&p| p != idx)
    };

    let roots: Vec<usize> = (0..groups.len())
        .map(|start| {
            let mut path = vec![start];
            let mut current = start;
            while let Some(next) = parent(current) {
                if path.contains(&next) {
                    return path.iter().copied().min().unwrap_or(start);
                }
                path.push(next);
                current = next;
            }
            current
        })
        .collect();

    let mut collapsed: Vec<Option<CharacterGroup>> = groups
        .iter()
        .enumerate()
        .map(|(idx, group)| (roots[idx] == idx).then(|| group.clone()))
        .collect();

    for (idx, group) in groups.iter().enumerate() {
        let root = roots[idx];
        if root == idx {
            continue;
        }
        if let Some(target) = collapsed[root].as_mut() {
            target.add_alias(&group.primary_name);
            for alias in &group.aliases {
                target.add_alias(alias);
            }
        }
    }

    collapsed.into_iter().flatten().collect()
}
