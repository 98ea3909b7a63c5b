/*!
 * Core line model for narrated scripts.
 *
 * A script is an ordered list of [`Line`]s. Position in the list is the
 * reading order of the source text and must survive every pass.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker assigned to narration.
pub const NARRATOR: &str = "Narrator";

/// Placeholder speaker used in narrator-and-speaker mode.
pub const GENERIC_SPEAKER: &str = "Speaker";

/// Sentinel: dialogue whose speaker the rules pass could not determine.
pub const AMBIGUOUS: &str = "AMBIGUOUS";

/// Sentinel: the LLM could not name a speaker.
pub const UNKNOWN: &str = "UNKNOWN";

/// Sentinel: every attempt to resolve the line timed out.
pub const TIMED_OUT: &str = "TIMED_OUT";

/// Value used for gender/age fields that could not be determined.
pub const UNKNOWN_ATTRIBUTE: &str = "Unknown";

/// Check whether a speaker value is one of the unresolved sentinels.
pub fn is_sentinel(speaker: &str) -> bool {
    let upper = speaker.trim().to_uppercase();
    upper == AMBIGUOUS || upper == UNKNOWN || upper == TIMED_OUT
}

/// Check whether a speaker value names an actual character.
///
/// Narrator, the generic speaker placeholder and sentinels are excluded.
pub fn is_character_name(speaker: &str) -> bool {
    let trimmed = speaker.trim();
    !trimmed.is_empty()
        && !trimmed.eq_ignore_ascii_case(NARRATOR)
        && trimmed != GENERIC_SPEAKER
        && !is_sentinel(trimmed)
}

/// Check whether an attribute value (gender, age range) carries information.
pub fn is_known_attribute(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        !v.is_empty() && !v.eq_ignore_ascii_case(UNKNOWN_ATTRIBUTE)
    })
}

/// Grammatical point of view of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Pov {
    #[serde(rename = "1st Person")]
    First,
    #[serde(rename = "2nd Person")]
    Second,
    #[serde(rename = "3rd Person")]
    Third,
    #[default]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl Pov {
    /// Human-readable label, identical to the serialized form
    pub fn label(&self) -> &'static str {
        match self {
            Self::First => "1st Person",
            Self::Second => "2nd Person",
            Self::Third => "3rd Person",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Pov {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One unit of dialogue or narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Real name, `Narrator`, or a sentinel
    pub speaker: String,

    /// Literal content (dialogue keeps its quote marks)
    #[serde(alias = "line")]
    pub text: String,

    /// Point of view of the text
    #[serde(default)]
    pub pov: Pov,

    /// Set when the line is a detected chapter heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_chapter_start: Option<bool>,

    /// Heading text for chapter lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_title: Option<String>,

    /// Speaker gender from LLM profiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    /// Speaker age range from LLM profiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<String>,
}

impl Line {
    /// Create a line with the given speaker and text.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            pov: Pov::Unknown,
            is_chapter_start: None,
            chapter_title: None,
            gender: None,
            age_range: None,
        }
    }

    /// Create a narration line.
    pub fn narration(text: impl Into<String>) -> Self {
        Self::new(NARRATOR, text)
    }

    /// Create a chapter heading line narrated by the narrator.
    pub fn chapter_heading(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            is_chapter_start: Some(true),
            chapter_title: Some(title.clone()),
            ..Self::narration(title)
        }
    }

    /// Set the point of view.
    pub fn with_pov(mut self, pov: Pov) -> Self {
        self.pov = pov;
        self
    }

    /// Whether the line starts a chapter
    pub fn is_chapter_start(&self) -> bool {
        self.is_chapter_start.unwrap_or(false)
    }

    /// Whether the line still awaits LLM resolution
    pub fn is_ambiguous(&self) -> bool {
        self.speaker == AMBIGUOUS
    }

    /// Whether gender or age range are missing
    pub fn needs_profile(&self) -> bool {
        !is_known_attribute(self.gender.as_deref()) || !is_known_attribute(self.age_range.as_deref())
    }
}
