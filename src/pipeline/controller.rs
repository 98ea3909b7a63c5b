/*!
 * Pass controller.
 *
 * Starts one worker per pass, polls its event channel on a fixed interval,
 * forwards every event to the observer and joins the worker before looking at
 * the results. A new pass never starts before the previous one's events are
 * fully drained. Results are applied to the [`Script`] in one step when the
 * pass's completion event has been seen; a pass that ends with an error event
 * leaves the script untouched.
 */

use log::{debug, info};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::analysis::{
    AmbiguityResolver, AnalysisSettings, CancellationFlag, CharacterGrouper, FragmentRejoiner, LlmClient,
    NameValidator,
};
use crate::app_config::Config;
use crate::errors::AnalysisError;
use crate::providers::Provider;
use crate::script::{CharacterGroup, LinePatch, Script};
use crate::segmentation::{Segmenter, VoicingMode};

use super::events::PassEvent;
use super::worker::PassWorker;

/// Callback receiving every pass event
pub type EventObserver = Box<dyn FnMut(&PassEvent) + Send>;

/// Runs analysis passes and applies their results
pub struct Controller {
    client: Arc<LlmClient>,
    settings: Arc<AnalysisSettings>,
    mode: VoicingMode,
    poll_interval: Duration,
    cancel: CancellationFlag,
    observer: Option<EventObserver>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("client", &self.client)
            .field("mode", &self.mode)
            .field("poll_interval", &self.poll_interval)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl Controller {
    pub fn new(client: LlmClient, settings: AnalysisSettings, mode: VoicingMode) -> Self {
        Self {
            client: Arc::new(client),
            settings: Arc::new(settings),
            mode,
            poll_interval: Duration::from_millis(100),
            cancel: CancellationFlag::new(),
            observer: None,
        }
    }

    /// Controller for the configured backend, mode and timings
    pub fn from_config(provider: Arc<dyn Provider>, config: &Config) -> Self {
        Self::new(
            LlmClient::from_config(provider, &config.llm),
            AnalysisSettings::from_config(&config.llm),
            config.voicing_mode,
        )
        .with_poll_interval(Duration::from_millis(config.llm.common.poll_interval_ms))
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_observer(mut self, observer: impl FnMut(&PassEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn mode(&self) -> VoicingMode {
        self.mode
    }

    /// Flag that stops the running pass before its next LLM call
    pub fn cancellation_flag(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Allow passes to run again after a cancellation
    pub fn reset_cancellation(&self) {
        self.cancel.reset();
    }

    /// Poll the worker until it exits, then join it
    async fn drive(&mut self, worker: PassWorker) -> Vec<PassEvent> {
        let mut interval = tokio::time::interval(self.poll_interval);
        let mut events = Vec::new();
        loop {
            interval.tick().await;
            // Checked before draining so no event sent before exit is missed
            let finished = worker.is_finished();
            for event in worker.try_drain() {
                self.observe(&event);
                events.push(event);
            }
            if finished {
                break;
            }
        }
        debug!("Joining {} worker", worker.name());
        for event in worker.join() {
            self.observe(&event);
            events.push(event);
        }
        events
    }

    fn observe(&mut self, event: &PassEvent) {
        debug!("Pass event: {}", event.name());
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }

    /// Fail if the pass reported an error
    fn check_errors(&self, events: &[PassEvent]) -> Result<(), AnalysisError> {
        let error = events.iter().find_map(|e| match e {
            PassEvent::Error { message } => Some(message.clone()),
            _ => None,
        });
        match error {
            Some(_) if self.cancel.is_cancelled() => Err(AnalysisError::Cancelled),
            Some(message) => Err(AnalysisError::Worker(message)),
            None => Ok(()),
        }
    }

    fn missing_completion(pass: &str) -> AnalysisError {
        AnalysisError::Worker(format!("The {} pass ended without reporting completion", pass))
    }

    /// Segment raw text into a new script
    pub async fn run_rules_pass(&mut self, text: &str) -> Result<Script, AnalysisError> {
        self.cancel.check()?;
        let text = text.to_string();
        let segmenter = Segmenter::new(self.mode);
        let worker = PassWorker::spawn("rules", self.cancel.clone(), move |sender, _| async move {
            let results = segmenter.segment(&text);
            info!("Rules pass produced {} lines", results.len());
            sender.send(PassEvent::RulesPassComplete { results });
            Ok(())
        })?;

        let events = self.drive(worker).await;
        self.check_errors(&events)?;
        events
            .into_iter()
            .find_map(|e| match e {
                PassEvent::RulesPassComplete { results } => Some(Script::new(results)),
                _ => None,
            })
            .ok_or_else(|| Self::missing_completion("rules"))
    }

    /// Merge split quote fragments; returns the original indices merged away
    pub async fn run_fragment_pass(&mut self, script: &mut Script) -> Result<Vec<usize>, AnalysisError> {
        self.cancel.check()?;
        let lines = script.lines().to_vec();
        let (client, settings) = (self.client.clone(), self.settings.clone());
        let worker = PassWorker::spawn("fragments", self.cancel.clone(), move |sender, cancel| async move {
            client.health_check().await?;
            let outcome = FragmentRejoiner::new(&client, &settings).run(&lines, &cancel).await?;
            sender.send(PassEvent::QuoteFragmentFixApplied {
                fixed_indexes: outcome.fixed_indexes,
                lines: outcome.lines,
            });
            Ok(())
        })?;

        let events = self.drive(worker).await;
        self.check_errors(&events)?;
        let (fixed_indexes, lines) = events
            .into_iter()
            .find_map(|e| match e {
                PassEvent::QuoteFragmentFixApplied { fixed_indexes, lines } => Some((fixed_indexes, lines)),
                _ => None,
            })
            .ok_or_else(|| Self::missing_completion("fragments"))?;

        if !fixed_indexes.is_empty() {
            script.replace_lines(lines);
        }
        Ok(fixed_indexes)
    }

    /// Validate speaker names and rename the lines of corrected labels
    pub async fn run_name_validation(&mut self, script: &mut Script) -> Result<HashMap<String, String>, AnalysisError> {
        self.cancel.check()?;
        let snapshot = script.clone();
        let (client, settings) = (self.client.clone(), self.settings.clone());
        let worker = PassWorker::spawn("validation", self.cancel.clone(), move |sender, cancel| async move {
            client.health_check().await?;
            let corrections = NameValidator::new(&client, &settings).run(&snapshot, &cancel).await?;
            sender.send(PassEvent::SpeakerNamesValidated { corrections });
            Ok(())
        })?;

        let events = self.drive(worker).await;
        self.check_errors(&events)?;
        let corrections = events
            .into_iter()
            .find_map(|e| match e {
                PassEvent::SpeakerNamesValidated { corrections } => Some(corrections),
                _ => None,
            })
            .ok_or_else(|| Self::missing_completion("validation"))?;

        let renamed = script.rename_speakers(&corrections);
        info!("Renamed {} lines after name validation", renamed);
        Ok(corrections)
    }

    /// Resolve ambiguous lines and profile known speakers.
    ///
    /// Returns the number of applied patches. Nothing is started when there is
    /// nothing to resolve.
    pub async fn run_resolution_pass(&mut self, script: &mut Script) -> Result<usize, AnalysisError> {
        self.cancel.check()?;
        let items = AmbiguityResolver::work_items(script);
        if items.is_empty() {
            info!("Nothing to resolve, skipping resolution pass");
            return Ok(0);
        }

        let snapshot = script.clone();
        let (client, settings) = (self.client.clone(), self.settings.clone());
        let worker = PassWorker::spawn("resolution", self.cancel.clone(), move |sender, cancel| async move {
            client.health_check().await?;
            sender.send(PassEvent::Pass2Started {
                total_items: items.len(),
            });
            AmbiguityResolver::new(&client, &settings)
                .run(&snapshot, &items, &cancel, |patch| sender.send(PassEvent::progress(patch)))
                .await?;
            sender.send(PassEvent::Pass2Complete);
            Ok(())
        })?;

        let events = self.drive(worker).await;
        self.check_errors(&events)?;
        if !events.contains(&PassEvent::Pass2Complete) {
            return Err(Self::missing_completion("resolution"));
        }

        let patches: Vec<LinePatch> = events.iter().filter_map(PassEvent::as_patch).collect();
        script.apply_patches(&patches)
    }

    /// Group character aliases and apply the groups
    pub async fn run_refinement_pass(&mut self, script: &mut Script) -> Result<Vec<CharacterGroup>, AnalysisError> {
        self.cancel.check()?;
        let snapshot = script.clone();
        let (client, settings) = (self.client.clone(), self.settings.clone());
        let worker = PassWorker::spawn("refinement", self.cancel.clone(), move |sender, cancel| async move {
            client.health_check().await?;
            let groups = CharacterGrouper::new(&client, &settings).run(&snapshot, &cancel).await?;
            sender.send(PassEvent::SpeakerRefinementComplete { groups });
            Ok(())
        })?;

        let events = self.drive(worker).await;
        self.check_errors(&events)?;
        let groups = events
            .into_iter()
            .find_map(|e| match e {
                PassEvent::SpeakerRefinementComplete { groups } => Some(groups),
                _ => None,
            })
            .ok_or_else(|| Self::missing_completion("refinement"))?;

        let changed = script.apply_groups(&groups);
        info!("Applied {} character groups ({} lines renamed)", groups.len(), changed);
        Ok(groups)
    }

    /// Run every pass in order: rules, fragments, name validation, resolution
    /// and grouping.
    ///
    /// Narrator mode stops after the rules pass. Narrator-and-speaker mode has
    /// no character names, so it stops after fragment repair.
    pub async fn run_full_analysis(&mut self, text: &str) -> Result<Script, AnalysisError> {
        let mut script = self.run_rules_pass(text).await?;
        if self.mode == VoicingMode::Narrator {
            return Ok(script);
        }

        self.run_fragment_pass(&mut script).await?;
        if self.mode == VoicingMode::NarratorAndSpeaker {
            return Ok(script);
        }

        self.run_name_validation(&mut script).await?;
        self.run_resolution_pass(&mut script).await?;
        if script.speaker_candidates().is_empty() {
            info!("No character names found, skipping grouping");
        } else {
            self.run_refinement_pass(&mut script).await?;
        }
        Ok(script)
    }
}
