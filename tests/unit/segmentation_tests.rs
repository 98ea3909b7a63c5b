/*!
 * Tests for rules-based segmentation
 */

use dramatis::script::{Pov, AMBIGUOUS, NARRATOR};
use dramatis::segmentation::{classify_pov, expand_abbreviations, Segmenter, VoicingMode};

use crate::common;

/// Test the sample scene segments into the documented lines
#[test]
fn test_segment_sampleText_shouldMatchDocumentedLines() {
    let lines = Segmenter::new(VoicingMode::Cast).segment(common::SAMPLE_TEXT);

    let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "\"Good morning,\"",
            "said John.",
            "The kitchen was warm and smelled of bread.",
            "\"Is the tea ready?\"",
            "she asked.",
            "\"Almost,\"",
            "Johnny said.",
            "He poured two cups and sat down beside the window.",
        ]
    );
    let speakers: Vec<&str> = lines.iter().map(|l| l.speaker.as_str()).collect();
    assert_eq!(
        speakers,
        vec!["John", NARRATOR, NARRATOR, AMBIGUOUS, NARRATOR, "Johnny", NARRATOR, NARRATOR]
    );
}

/// Test the point-of-view examples
#[test]
fn test_classifyPov_examples_shouldMatchExpectedLabels() {
    assert_eq!(classify_pov("I am happy"), Pov::First);
    assert_eq!(classify_pov("You are happy"), Pov::Second);
    assert_eq!(classify_pov("She was happy"), Pov::Third);
    assert_eq!(classify_pov("The sky is blue"), Pov::Unknown);
}

/// Test abbreviation expansion keeps the sentence whole
#[test]
fn test_expandAbbreviations_doctor_shouldExpand() {
    assert_eq!(expand_abbreviations("Dr. Smith arrived."), "Doctor Smith arrived.");
}

/// Test shouted speaker tags are title-cased
#[test]
fn test_segment_upperCaseName_shouldTitleCase() {
    let lines = Segmenter::new(VoicingMode::Cast).segment("\"Enough,\" growled MARY ANN.");
    assert_eq!(lines[0].speaker, "Mary Ann");
    assert_eq!(lines[1].text, "growled MARY ANN.");
}

/// Test chapter detection across a longer passage
#[test]
fn test_segment_multipleChapters_shouldFlagEachHeading() {
    let text = "Prologue\n\nThe storm came.\n\nChapter 2\n\n\"Run,\" said Ann.\n\nEpilogue\n\nAll was quiet.";
    let lines = Segmenter::new(VoicingMode::Cast).segment(text);

    let headings: Vec<&str> = lines
        .iter()
        .filter(|l| l.is_chapter_start())
        .filter_map(|l| l.chapter_title.as_deref())
        .collect();
    assert_eq!(headings, vec!["Prologue", "Chapter 2", "Epilogue"]);
}

/// Test the no-quote input yields narration only in every mode
#[test]
fn test_segment_noQuotes_everyMode_shouldOnlyNarrate() {
    let text = "The road was long. They walked until dark.";
    for mode in [VoicingMode::Narrator, VoicingMode::NarratorAndSpeaker, VoicingMode::Cast] {
        let lines = Segmenter::new(mode).segment(text);
        assert!(!lines.is_empty());
        assert!(lines.iter().all(|l| l.speaker == NARRATOR), "mode {}", mode);
    }
}
