use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::pipeline::{Controller, PassEvent};
use crate::providers::openai::OpenAI;
use crate::providers::Provider;
use crate::script::Script;

// @module: Application workflows behind the CLI commands

/// Runs CLI workflows: analyse a text, resolve or refine a saved script
pub struct AppController {
    // @field: App configuration
    config: Config,
    // @field: LLM backend shared by every pass
    provider: Arc<dyn Provider>,
}

impl AppController {
    // @method: Create a controller talking to the configured backend
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = Arc::new(OpenAI::from_config(&config.llm));
        Ok(Self::with_provider(config, provider))
    }

    /// Create a controller with an explicit provider
    pub fn with_provider(config: Config, provider: Arc<dyn Provider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Analyse a text file and save the resulting script.
    ///
    /// With `rules_only` only the segmenter runs, which needs no LLM.
    /// Returns the path of the written script.
    pub async fn analyze(
        &self,
        input_file: &Path,
        output_file: Option<PathBuf>,
        force_overwrite: bool,
        rules_only: bool,
    ) -> Result<PathBuf> {
        let start_time = Instant::now();
        let output_path = output_file.unwrap_or_else(|| FileManager::generate_script_path(input_file));
        if FileManager::file_exists(&output_path) && !force_overwrite {
            warn!("Output file already exists: {:?}. Use -f to force overwrite.", output_path);
            return Ok(output_path);
        }

        let text = FileManager::read_input_text(input_file).map_err(|e| anyhow!("{}", e))?;
        info!(
            "Analysing {:?} ({} mode, {})",
            input_file,
            self.config.voicing_mode.display_name(),
            self.backend_label()
        );

        let progress_bar = Self::create_progress_bar();
        let mut controller = self.pipeline(&progress_bar);
        let result = if rules_only {
            controller.run_rules_pass(&text).await
        } else {
            controller.run_full_analysis(&text).await
        };
        progress_bar.finish_and_clear();
        let script = result.context("Analysis failed")?;

        FileManager::save_script(&output_path, &script)?;
        self.log_summary(&script, start_time.elapsed());
        info!("Success: {}", output_path.display());
        Ok(output_path)
    }

    /// Resolve the ambiguous lines of a saved script in place
    pub async fn resolve(&self, script_file: &Path) -> Result<Script> {
        let start_time = Instant::now();
        let mut script = FileManager::load_script(script_file)?;

        let progress_bar = Self::create_progress_bar();
        let mut controller = self.pipeline(&progress_bar);
        let result = controller.run_resolution_pass(&mut script).await;
        progress_bar.finish_and_clear();
        let applied = result.context("Resolution failed")?;

        info!("Resolved {} lines", applied);
        FileManager::save_script(script_file, &script)?;
        self.log_summary(&script, start_time.elapsed());
        Ok(script)
    }

    /// Validate speaker names and merge character aliases of a saved script
    pub async fn refine(&self, script_file: &Path) -> Result<Script> {
        let start_time = Instant::now();
        let mut script = FileManager::load_script(script_file)?;
        if script.speaker_candidates().is_empty() {
            return Err(anyhow!("Script has no character names to refine: {:?}", script_file));
        }

        let progress_bar = Self::create_progress_bar();
        let mut controller = self.pipeline(&progress_bar);
        let result = async {
            let corrections = controller.run_name_validation(&mut script).await?;
            let groups = controller.run_refinement_pass(&mut script).await?;
            Ok::<_, crate::errors::AnalysisError>((corrections, groups))
        }
        .await;
        progress_bar.finish_and_clear();
        let (corrections, groups) = result.context("Refinement failed")?;

        info!(
            "Applied {} name corrections and {} character groups",
            corrections.len(),
            groups.len()
        );
        FileManager::save_script(script_file, &script)?;
        self.log_summary(&script, start_time.elapsed());
        Ok(script)
    }

    /// Pass controller reporting into the given progress bar
    fn pipeline(&self, progress_bar: &ProgressBar) -> Controller {
        let pb = progress_bar.clone();
        Controller::from_config(self.provider.clone(), &self.config).with_observer(move |event| {
            Self::update_progress(&pb, event)
        })
    }

    fn create_progress_bar() -> ProgressBar {
        let progress_bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.enable_steady_tick(Duration::from_millis(120));
        progress_bar
    }

    // @updates: Progress bar from a pass event
    fn update_progress(progress_bar: &ProgressBar, event: &PassEvent) {
        match event {
            PassEvent::RulesPassComplete { results } => {
                progress_bar.set_message(format!("Segmented {} lines", results.len()));
            }
            PassEvent::Pass2Started { total_items } => {
                progress_bar.set_length(*total_items as u64);
                progress_bar.set_position(0);
                progress_bar.set_message("Resolving speakers");
            }
            PassEvent::Progress { new_speaker, .. } => {
                progress_bar.inc(1);
                progress_bar.set_message(new_speaker.clone());
            }
            PassEvent::Pass2Complete => progress_bar.set_message("Speakers resolved"),
            PassEvent::QuoteFragmentFixApplied { fixed_indexes, .. } => {
                progress_bar.set_message(format!("Merged {} quote fragments", fixed_indexes.len()));
            }
            PassEvent::SpeakerNamesValidated { corrections } => {
                progress_bar.set_message(format!("Corrected {} speaker names", corrections.len()));
            }
            PassEvent::SpeakerRefinementComplete { groups } => {
                progress_bar.set_message(format!("Found {} character groups", groups.len()));
            }
            PassEvent::Error { message } => progress_bar.set_message(format!("Failed: {}", message)),
        }
    }

    fn backend_label(&self) -> String {
        format!("{} - {}", self.config.llm.provider.display_name(), self.config.llm.get_model())
    }

    // @logs: Cast list and elapsed time
    fn log_summary(&self, script: &Script, elapsed: Duration) {
        let cast = script.cast_list();
        info!("{} lines, {} speakers ({})", script.len(), cast.len(), Self::format_duration(elapsed));
        for entry in cast {
            info!("  {:<30} {:>6} lines", entry.speaker, entry.line_count);
        }
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
