/*!
 * LLM-backed analysis passes.
 *
 * Each pass reads a snapshot of the script and returns a result for the
 * controller to apply:
 * - `fragments`: rejoins quote fragments the segmenter split off (transformed line copy)
 * - `validator`: checks that speaker names are real names (correction map)
 * - `resolver`: names the speakers of ambiguous lines (patch list, streamed as progress)
 * - `grouping`: clusters aliases of the same character (character groups)
 *
 * Shared plumbing lives in `llm` (ChatML, retry, health check), `parsing`
 * (lenient response parsing) and `batching` (character-budget batches with
 * split-on-failure).
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::LlmConfig;
use crate::errors::AnalysisError;

pub mod batching;
pub mod fragments;
pub mod grouping;
pub mod llm;
pub mod parsing;
pub mod prompts;
pub mod resolver;
pub mod validator;

pub use fragments::{apply_fragment_actions, FragmentAction, FragmentCandidate, FragmentRejoiner};
pub use grouping::CharacterGrouper;
pub use llm::{LlmClient, RetryPolicy};
pub use resolver::{AmbiguityResolver, ResolutionItem, ResolutionKind};
pub use validator::{NameValidator, NameVerdict};

/// Tunables shared by the analysis passes
#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    /// Lines of context on each side of a line being resolved
    pub context_window: usize,
    /// Soft limit on serialized characters per batch
    pub batch_char_budget: usize,
    /// Most frequent speakers sent to name validation
    pub max_validation_candidates: usize,
    pub resolution_timeout: Duration,
    pub fragments_timeout: Duration,
    pub validation_timeout: Duration,
    pub grouping_timeout: Duration,
}

impl AnalysisSettings {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            context_window: config.common.context_window,
            batch_char_budget: config.common.batch_char_budget,
            max_validation_candidates: config.common.max_validation_candidates,
            resolution_timeout: Duration::from_secs(config.timeouts.resolution_secs),
            fragments_timeout: Duration::from_secs(config.timeouts.fragments_secs),
            validation_timeout: Duration::from_secs(config.timeouts.validation_secs),
            grouping_timeout: Duration::from_secs(config.timeouts.grouping_secs),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default())
    }
}

/// Cooperative stop signal shared between a controller and its pass workers.
///
/// Checked between per-item and per-batch LLM calls; in-flight requests are
/// never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation before starting a new pass
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`AnalysisError::Cancelled`] once the flag is set
    pub fn check(&self) -> Result<(), AnalysisError> {
        if self.is_cancelled() {
            Err(AnalysisError::Cancelled)
        } else {
            Ok(())
        }
    }
}
