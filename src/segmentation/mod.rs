/*!
 * Rules-based text segmentation.
 *
 * This module contains the first, LLM-free pass over raw text:
 * - `patterns`: data tables (abbreviations, reporting verbs, pronouns, quote styles)
 * - `abbreviations`: title abbreviation expansion
 * - `pov`: point-of-view classifier
 * - `speaker_tag`: inline speaker tag extraction
 * - `segmenter`: the segmenter producing the initial line sequence
 */

pub mod abbreviations;
pub mod patterns;
pub mod pov;
pub mod segmenter;
pub mod speaker_tag;

pub use abbreviations::expand_abbreviations;
pub use pov::classify_pov;
pub use segmenter::{Segmenter, VoicingMode};
pub use speaker_tag::{extract_tag, title_case, SpeakerTag};
