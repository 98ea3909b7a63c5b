/*!
 * Messages emitted by pass workers.
 *
 * Workers push immutable [`PassEvent`]s onto a channel; the controller is the
 * only consumer. Sending is fire-and-forget: a worker never waits on, or
 * fails because of, the receiving side.
 */

use serde::Serialize;
use std::collections::HashMap;
use std::sync::mpsc::Sender;

use crate::script::{CharacterGroup, Line, LinePatch};

/// Event emitted by a pass worker
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PassEvent {
    /// Segmentation finished
    RulesPassComplete { results: Vec<Line> },

    /// Resolution is about to process `total_items` items
    #[serde(rename = "pass_2_started")]
    Pass2Started { total_items: usize },

    /// One resolution item finished
    Progress {
        original_index: usize,
        new_speaker: String,
        gender: String,
        age_range: String,
    },

    /// Every resolution item finished
    #[serde(rename = "pass_2_complete")]
    Pass2Complete,

    /// Fragments were merged; `lines` is the new sequence
    #[serde(rename = "quote_fragment_fixapplied")]
    QuoteFragmentFixApplied {
        fixed_indexes: Vec<usize>,
        lines: Vec<Line>,
    },

    /// Speaker label corrections from name validation
    SpeakerNamesValidated { corrections: HashMap<String, String> },

    /// Character groups to apply
    SpeakerRefinementComplete { groups: Vec<CharacterGroup> },

    /// The pass failed; always the last event of its pass
    Error { message: String },
}

impl PassEvent {
    /// Progress event for a resolved line
    pub fn progress(patch: &LinePatch) -> Self {
        Self::Progress {
            original_index: patch.index,
            new_speaker: patch.speaker.clone().unwrap_or_default(),
            gender: patch.gender.clone().unwrap_or_default(),
            age_range: patch.age_range.clone().unwrap_or_default(),
        }
    }

    /// Patch carried by a progress event
    pub fn as_patch(&self) -> Option<LinePatch> {
        match self {
            Self::Progress {
                original_index,
                new_speaker,
                gender,
                age_range,
            } => Some(LinePatch::resolved(*original_index, new_speaker, gender, age_range)),
            _ => None,
        }
    }

    /// Whether this event ends its pass
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::RulesPassComplete { .. }
                | Self::Pass2Complete
                | Self::QuoteFragmentFixApplied { .. }
                | Self::SpeakerNamesValidated { .. }
                | Self::SpeakerRefinementComplete { .. }
                | Self::Error { .. }
        )
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::RulesPassComplete { .. } => "rules_pass_complete",
            Self::Pass2Started { .. } => "pass_2_started",
            Self::Progress { .. } => "progress",
            Self::Pass2Complete => "pass_2_complete",
            Self::QuoteFragmentFixApplied { .. } => "quote_fragment_fixapplied",
            Self::SpeakerNamesValidated { .. } => "speaker_names_validated",
            Self::SpeakerRefinementComplete { .. } => "speaker_refinement_complete",
            Self::Error { .. } => "error",
        }
    }
}

/// Sending half of a pass's event channel
#[derive(Debug, Clone)]
pub struct EventSender {
    inner: Sender<PassEvent>,
}

impl EventSender {
    pub fn new(inner: Sender<PassEvent>) -> Self {
        Self { inner }
    }

    /// Send an event; a closed receiver is ignored
    pub fn send(&self, event: PassEvent) {
        if self.inner.send(event).is_err() {
            log::debug!("Event receiver dropped, discarding event");
        }
    }
}
