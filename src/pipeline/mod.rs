//! Consultation pipeline: validation, SOAP extraction, then summary, referral
//! and trial matching run concurrently over the extracted note.

pub mod generation;
pub mod intake;
pub mod orchestrator;
pub mod phase;
pub mod referral;
pub mod soap;
pub mod summary;
pub mod text;
pub mod trials;

pub use orchestrator::ConsultationPipeline;
pub use phase::{PhaseError, RunPhase};

use std::time::Duration;

use thiserror::Error;

use generation::GenerationError;
use intake::ValidationError;
use soap::ExtractionError;
use trials::{CatalogError, MatchSettings};

/// Overall run deadlines shorter than this are raised to it.
pub const MIN_RUN_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Non-fatal failure of a post-extraction stage. Recorded in the stage's
/// output slot and its processing step; the run still completes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StageError {
    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Trial catalog failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Output contract violated: {0}")]
    Contract(String),
}

/// Fatal run failure. No partial documents are returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid consultation: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: String, after: Duration },

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Deadline for the whole run; never below [`MIN_RUN_TIMEOUT`].
    pub run_timeout: Duration,
    /// Deadline for each individual stage, extraction included.
    pub stage_timeout: Duration,
    /// Extra generation attempts per stage.
    pub max_retries: u32,
    pub matching: MatchSettings,
}

impl PipelineSettings {
    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout.max(MIN_RUN_TIMEOUT);
        self
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(120),
            stage_timeout: Duration::from_secs(90),
            max_retries: 2,
            matching: MatchSettings::default(),
        }
    }
}
