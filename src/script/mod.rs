/*!
 * Script data model.
 *
 * - `model`: the [`Line`] record, point-of-view labels and speaker sentinels
 * - `cast`: voice assignments, character profiles and alias groups
 * - `document`: the versioned [`Script`] and its patch operations
 */

pub mod cast;
pub mod document;
pub mod model;

pub use cast::{merge_character_groups, CastRegistry, CharacterGroup, CharacterProfile, VoiceAssignment};
pub use document::{CastEntry, LinePatch, Script, SpeakerCandidate};
pub use model::{
    is_character_name, is_known_attribute, is_sentinel, Line, Pov, AMBIGUOUS, GENERIC_SPEAKER, NARRATOR,
    TIMED_OUT, UNKNOWN, UNKNOWN_ATTRIBUTE,
};
