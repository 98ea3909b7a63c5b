/*!
 * Integration tests for the pass controller
 */

use parking_lot::Mutex;
use std::sync::Arc;

use dramatis::analysis::{AnalysisSettings, LlmClient, RetryPolicy};
use dramatis::pipeline::{Controller, PassEvent};
use dramatis::providers::mock::MockProvider;
use dramatis::script::{AMBIGUOUS, NARRATOR};
use dramatis::segmentation::VoicingMode;
use dramatis::AnalysisError;

use crate::common;

fn controller_with_log(provider: MockProvider, mode: VoicingMode) -> (Controller, Arc<Mutex<Vec<PassEvent>>>) {
    let mut config = common::test_config();
    config.voicing_mode = mode;
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let controller = Controller::from_config(Arc::new(provider), &config)
        .with_observer(move |event| sink.lock().push(event.clone()));
    (controller, seen)
}

fn event_names(events: &[PassEvent]) -> Vec<&'static str> {
    events.iter().map(PassEvent::name).collect()
}

/// Test a full analysis runs every pass in order and applies their results
#[tokio::test]
async fn test_runFullAnalysis_castMode_shouldResolveAndGroupSpeakers() {
    let provider = common::scripted_provider();
    let (mut controller, seen) = controller_with_log(provider.clone(), VoicingMode::Cast);

    let script = controller.run_full_analysis(common::SAMPLE_TEXT).await.unwrap();

    let speakers: Vec<&str> = script.lines().iter().map(|l| l.speaker.as_str()).collect();
    assert_eq!(
        speakers,
        vec!["John", NARRATOR, NARRATOR, "Mary", NARRATOR, "John", NARRATOR, NARRATOR]
    );
    assert_eq!(script.lines()[3].gender.as_deref(), Some("Female"));
    assert!(script.lines().iter().all(|l| l.speaker != AMBIGUOUS));

    let events = seen.lock().clone();
    assert_eq!(
        event_names(&events),
        vec![
            "rules_pass_complete",
            "quote_fragment_fixapplied",
            "speaker_names_validated",
            "pass_2_started",
            "progress",
            "progress",
            "progress",
            "pass_2_complete",
            "speaker_refinement_complete",
        ]
    );
}

/// Test progress events arrive in increasing line order
#[tokio::test]
async fn test_runResolutionPass_progress_shouldBeInIndexOrder() {
    let (mut controller, seen) = controller_with_log(common::scripted_provider(), VoicingMode::Cast);
    let mut script = controller.run_rules_pass(common::SAMPLE_TEXT).await.unwrap();

    let applied = controller.run_resolution_pass(&mut script).await.unwrap();

    assert_eq!(applied, 3);
    let indexes: Vec<usize> = seen
        .lock()
        .iter()
        .filter_map(|e| match e {
            PassEvent::Progress { original_index, .. } => Some(*original_index),
            _ => None,
        })
        .collect();
    assert_eq!(indexes, vec![0, 3, 5]);
}

/// Test narrator mode stops after segmentation without touching the LLM
#[tokio::test]
async fn test_runFullAnalysis_narratorMode_shouldNotCallLlm() {
    let provider = common::scripted_provider().unhealthy();
    let (mut controller, seen) = controller_with_log(provider.clone(), VoicingMode::Narrator);

    let script = controller.run_full_analysis(common::SAMPLE_TEXT).await.unwrap();

    assert_eq!(script.len(), 1);
    assert_eq!(script.lines()[0].speaker, NARRATOR);
    assert_eq!(provider.request_count(), 0);
    assert_eq!(event_names(&seen.lock()), vec!["rules_pass_complete"]);
}

/// Test narrator-and-speaker mode stops after fragment repair
#[tokio::test]
async fn test_runFullAnalysis_narratorAndSpeakerMode_shouldStopAfterFragments() {
    let (mut controller, seen) = controller_with_log(common::scripted_provider(), VoicingMode::NarratorAndSpeaker);

    let script = controller.run_full_analysis(common::SAMPLE_TEXT).await.unwrap();

    assert!(script.lines().iter().all(|l| l.speaker == NARRATOR || l.speaker == "Speaker"));
    assert_eq!(
        event_names(&seen.lock()),
        vec!["rules_pass_complete", "quote_fragment_fixapplied"]
    );
}

/// Test an unreachable endpoint aborts the pass with a single error event
#[tokio::test]
async fn test_runFullAnalysis_unhealthyEndpoint_shouldReportOneError() {
    let provider = common::scripted_provider().unhealthy();
    let (mut controller, seen) = controller_with_log(provider.clone(), VoicingMode::Cast);

    let result = controller.run_full_analysis(common::SAMPLE_TEXT).await;

    assert!(matches!(result, Err(AnalysisError::Worker(ref m)) if m.contains("mock://local")));
    let events = seen.lock().clone();
    assert_eq!(event_names(&events), vec!["rules_pass_complete", "error"]);
    assert_eq!(provider.request_count(), 0);
}

/// Test grouping without any group leaves the script untouched
#[tokio::test]
async fn test_runRefinementPass_noGroups_shouldNotApply() {
    let provider = MockProvider::working().with_route("character_groups", "{\"character_groups\": []}");
    let (mut controller, seen) = controller_with_log(provider, VoicingMode::Cast);
    let mut script = controller.run_rules_pass(common::SAMPLE_TEXT).await.unwrap();
    let before = script.clone();

    let result = controller.run_refinement_pass(&mut script).await;

    assert!(result.is_err());
    assert_eq!(script, before);
    assert!(!event_names(&seen.lock()).contains(&"speaker_refinement_complete"));
}

/// Test a transient failure on every first call still completes the pipeline
#[tokio::test]
async fn test_runResolutionPass_firstCallFails_shouldEmitOneProgressPerItem() {
    let provider = MockProvider::fail_first(1)
        .with_route("who is the speaker of the DIALOGUE line", "Mary, Female, Adult")
        .with_route("is spoken by", "John, Male, Adult");
    let client = LlmClient::new(Arc::new(provider.clone()), RetryPolicy::new(2, 0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut controller = Controller::new(client, AnalysisSettings::default(), VoicingMode::Cast)
        .with_observer(move |event| sink.lock().push(event.clone()));
    let mut script = controller.run_rules_pass(common::SAMPLE_TEXT).await.unwrap();

    controller.run_resolution_pass(&mut script).await.unwrap();

    let progress = seen.lock().iter().filter(|e| e.name() == "progress").count();
    assert_eq!(progress, 3);
    assert_eq!(provider.request_count(), 4);
}

/// Test cancellation stops the next pass before it starts
#[tokio::test]
async fn test_cancel_beforePass_shouldReturnCancelled() {
    let (mut controller, _) = controller_with_log(common::scripted_provider(), VoicingMode::Cast);
    let mut script = controller.run_rules_pass(common::SAMPLE_TEXT).await.unwrap();

    controller.cancellation_flag().cancel();
    let result = controller.run_resolution_pass(&mut script).await;
    assert!(matches!(result, Err(AnalysisError::Cancelled)));

    controller.reset_cancellation();
    assert_eq!(controller.run_resolution_pass(&mut script).await.unwrap(), 3);
}
