/*!
 * Tests for the script document and cast registry
 */

use std::collections::HashMap;

use dramatis::analysis::apply_fragment_actions;
use dramatis::analysis::FragmentAction;
use dramatis::script::{
    merge_character_groups, CharacterGroup, CharacterProfile, Line, LinePatch, Script, VoiceAssignment, AMBIGUOUS,
    NARRATOR,
};
use dramatis::AnalysisError;

fn scene() -> Script {
    Script::new(vec![
        Line::new("Jon", "\"Morning.\""),
        Line::narration("The door creaked."),
        Line::new(AMBIGUOUS, "\"Who's there?\""),
        Line::new("Jonathan", "\"Only me.\""),
    ])
}

/// Test an out-of-range patch leaves the script untouched
#[test]
fn test_applyPatches_invalidIndex_shouldRejectAll() {
    let mut script = scene();
    let before = script.clone();

    let result = script.apply_patches(&[
        LinePatch::resolved(2, "Mary", "Female", "Adult"),
        LinePatch::resolved(9, "Ghost", "Unknown", "Unknown"),
    ]);

    assert!(matches!(result, Err(AnalysisError::InvalidPatch { index: 9, len: 4 })));
    assert_eq!(script, before);
}

/// Test patches update lines, the cast registry and the version
#[test]
fn test_applyPatches_valid_shouldRecordProfile() {
    let mut script = scene();

    let applied = script.apply_patches(&[LinePatch::resolved(2, "Mary", "Female", "Adult")]).unwrap();

    assert_eq!(applied, 1);
    assert_eq!(script.lines()[2].speaker, "Mary");
    assert_eq!(
        script.cast().profiles.get("Mary"),
        Some(&CharacterProfile::new("Female", "Adult"))
    );
    assert!(script.version() > 0);
}

/// Test grouping rewrites aliases and keeps the primary's voice
#[test]
fn test_applyGroups_shouldRenameAliasesAndMergeCast() {
    let mut script = scene();
    script.assign_voice("Jonathan", VoiceAssignment::new("deep"));
    script.assign_voice("Jon", VoiceAssignment::new("light"));
    let groups = vec![CharacterGroup::new("Jonathan", vec!["Jon".to_string()])];

    let changed = script.apply_groups(&groups);

    assert_eq!(changed, 1);
    assert_eq!(script.lines()[0].speaker, "Jonathan");
    assert_eq!(
        script.cast().voice_assignments.get("Jonathan"),
        Some(&VoiceAssignment::new("deep"))
    );
    assert!(!script.cast().voice_assignments.contains_key("Jon"));
}

/// Test applying the same groups twice is idempotent
#[test]
fn test_applyGroups_twice_shouldBeIdempotent() {
    let groups = vec![CharacterGroup::new("Jonathan", vec!["Jon".to_string()])];
    let mut once = scene();
    once.apply_groups(&groups);
    let mut twice = once.clone();
    twice.apply_groups(&groups);

    assert_eq!(once.lines(), twice.lines());
    assert_eq!(once.cast(), twice.cast());
}

/// Test groups from different batches merge case-insensitively
#[test]
fn test_mergeCharacterGroups_sameprimaryDifferentCase_shouldUnionAliases() {
    let merged = merge_character_groups(vec![
        CharacterGroup::new("Jonathan", vec!["Jon".to_string()]),
        CharacterGroup::new("jonathan", vec!["Johnny".to_string(), "Jonathan".to_string()]),
    ]);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].aliases, vec!["Jon".to_string(), "Johnny".to_string()]);
    assert!(!merged[0].aliases.contains(&merged[0].primary_name));
}

/// Test name corrections rename every matching line
#[test]
fn test_renameSpeakers_shouldRewriteMatchingLines() {
    let mut script = scene();
    let corrections = HashMap::from([("Jon".to_string(), "Jon Snow".to_string())]);

    assert_eq!(script.rename_speakers(&corrections), 1);
    assert_eq!(script.lines()[0].speaker, "Jon Snow");
}

/// Test the cast list counts lines per speaker in order of appearance
#[test]
fn test_castList_shouldCountInAppearanceOrder() {
    let cast = scene().cast_list();
    let entries: Vec<(&str, usize)> = cast.iter().map(|e| (e.speaker.as_str(), e.line_count)).collect();
    assert_eq!(entries, vec![("Jon", 1), (NARRATOR, 1), (AMBIGUOUS, 1), ("Jonathan", 1)]);
}

/// Test speaker candidates skip narrator and sentinels
#[test]
fn test_speakerCandidates_shouldOnlyListCharacters() {
    let names: Vec<String> = scene().speaker_candidates().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Jon".to_string(), "Jonathan".to_string()]);
}

/// Test fragment merging on the possessive example
#[test]
fn test_applyFragmentActions_possessive_shouldJoinWithoutSpace() {
    let lines = vec![
        Line::narration("The cat"),
        Line::new(AMBIGUOUS, "'s"),
        Line::narration("Hi."),
    ];
    let actions = HashMap::from([(1, FragmentAction::AppendPrev)]);

    let outcome = apply_fragment_actions(&lines, &actions);

    let texts: Vec<&str> = outcome.lines.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(texts, vec!["The cat's", "Hi."]);
    assert_eq!(outcome.fixed_indexes, vec![1]);
}
