//! Pipeline Orchestrator.
//!
//! Drives one run: validate → extract → {summary, referral, trials} →
//! aggregate. Extraction is the only fatal stage; the three downstream
//! stages run concurrently over the same immutable SOAP note, each under its
//! own deadline, and a failed or timed-out stage leaves an explicit
//! empty-with-flag document in its slot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{timeout_at, Instant};
use tracing::Instrument;
use uuid::Uuid;

use super::generation::LlmClient;
use super::intake::validate;
use super::phase::{PhaseTracker, RunPhase};
use super::referral::{ReferralDrafter, FLAG_REFERRAL_FAILED};
use super::soap::SectionExtractor;
use super::summary::{SummaryGenerator, FLAG_SUMMARY_FAILED};
use super::trials::{TrialCatalog, TrialMatcher, FLAG_CATALOG_UNAVAILABLE};
use super::{PipelineError, PipelineSettings, StageError};
use crate::models::{
    Consultation, PatientSummary, ProcessingResult, ProcessingStep, ReferralOutcome,
    ResultMetadata, SoapNote, StageStatus, TrialMatches, CONTRACT_VERSION, RESULT_DISCLAIMER,
};

pub const STEP_EXTRACTION: &str = "SOAP Note Generation";
pub const STEP_SUMMARY: &str = "Patient Summary Generation";
pub const STEP_REFERRAL: &str = "Referral Letter Generation";
pub const STEP_TRIALS: &str = "Clinical Trial Matching";

/// Reported as the model of the trial matching step, which uses no model.
pub const TRIAL_MATCHING_ENGINE: &str = "eligibility-rules";

/// Execution architecture reported in result metadata.
pub const ARCHITECTURE: &str = "Extraction then concurrent summary, referral and trial stages";

// ---------------------------------------------------------------------------
// Stage bookkeeping
// ---------------------------------------------------------------------------

enum StageOutcome<T> {
    Completed(T),
    Failed(StageError),
    TimedOut,
}

struct StageRun<T> {
    outcome: StageOutcome<T>,
    elapsed: Duration,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Run one downstream stage under `deadline`. On expiry the stage future is
/// dropped, which cancels any in-flight generation or catalog call.
async fn run_stage<T, F>(deadline: Instant, stage: F) -> StageRun<T>
where
    F: Future<Output = Result<T, StageError>>,
{
    let started = Instant::now();
    let outcome = match timeout_at(deadline, stage).await {
        Ok(Ok(value)) => StageOutcome::Completed(value),
        Ok(Err(err)) => StageOutcome::Failed(err),
        Err(_) => StageOutcome::TimedOut,
    };
    StageRun {
        outcome,
        elapsed: started.elapsed(),
    }
}

impl<T> StageRun<T> {
    /// Stage document (or its stand-in built from the failure message) and
    /// the matching processing step.
    fn resolve(self, step: &str, model: &str, stand_in: impl FnOnce(String) -> T) -> (T, ProcessingStep) {
        let duration_ms = millis(self.elapsed);
        let (document, status, error) = match self.outcome {
            StageOutcome::Completed(document) => (document, StageStatus::Ok, None),
            StageOutcome::Failed(err) => {
                tracing::warn!(step, duration_ms, error = %err, "Stage failed");
                let message = err.to_string();
                (stand_in(message.clone()), StageStatus::Failed, Some(message))
            }
            StageOutcome::TimedOut => {
                tracing::warn!(step, duration_ms, "Stage timed out");
                let message = format!("{step} timed out after {duration_ms} ms");
                (stand_in(message.clone()), StageStatus::Timeout, Some(message))
            }
        };
        let record = ProcessingStep {
            step: step.to_string(),
            duration_ms,
            model: model.to_string(),
            status,
            error,
        };
        (document, record)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Consultation pipeline with injected generation and catalog capabilities.
pub struct ConsultationPipeline {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn TrialCatalog>,
    settings: PipelineSettings,
}

impl ConsultationPipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<dyn TrialCatalog>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            llm,
            catalog,
            settings,
        }
    }

    pub fn llm(&self) -> &dyn LlmClient {
        self.llm.as_ref()
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Process one consultation into the aggregated result.
    ///
    /// Fails only on validation, extraction failure, or extraction timeout.
    pub async fn run(&self, consultation: &Consultation) -> Result<ProcessingResult, PipelineError> {
        let consultation_id = consultation.consultation_id(Utc::now());
        let span = tracing::info_span!("consultation", id = %consultation_id);
        self.execute(consultation, consultation_id).instrument(span).await
    }

    async fn execute(
        &self,
        consultation: &Consultation,
        consultation_id: String,
    ) -> Result<ProcessingResult, PipelineError> {
        let started = Instant::now();
        let run_deadline = started + self.settings.run_timeout;
        let model = self.llm.model_name().to_string();
        let mut phases = PhaseTracker::new();

        tracing::info!(
            narrative_chars = consultation.consultation_text.chars().count(),
            "Processing consultation"
        );

        if let Err(err) = validate(consultation) {
            phases.advance(RunPhase::Failed)?;
            tracing::warn!(error = %err, "Consultation rejected");
            return Err(err.into());
        }

        // ── Extraction (fatal) ──
        phases.advance(RunPhase::Extracting)?;
        let extraction_started = Instant::now();
        let extraction_deadline = (extraction_started + self.settings.stage_timeout).min(run_deadline);
        let extractor = SectionExtractor::new(self.llm.as_ref(), self.settings.max_retries);
        let note = match timeout_at(extraction_deadline, extractor.extract(consultation)).await {
            Ok(Ok(note)) => note,
            Ok(Err(err)) => {
                phases.advance(RunPhase::Failed)?;
                tracing::warn!(error = %err, "SOAP extraction failed");
                return Err(err.into());
            }
            Err(_) => {
                phases.advance(RunPhase::Failed)?;
                let after = extraction_started.elapsed();
                tracing::warn!(elapsed_ms = millis(after), "SOAP extraction timed out");
                return Err(PipelineError::Timeout {
                    stage: STEP_EXTRACTION.to_string(),
                    after,
                });
            }
        };
        let extraction_step = ProcessingStep {
            step: STEP_EXTRACTION.to_string(),
            duration_ms: millis(extraction_started.elapsed()),
            model: model.clone(),
            status: StageStatus::Ok,
            error: None,
        };

        // ── Downstream stages (concurrent, non-fatal) ──
        phases.advance(RunPhase::Dispatched)?;
        let stage_deadline = (Instant::now() + self.settings.stage_timeout).min(run_deadline);
        let summarizer = SummaryGenerator::new(self.llm.as_ref(), self.settings.max_retries);
        let drafter = ReferralDrafter::new(self.llm.as_ref(), self.settings.max_retries);
        let matcher = TrialMatcher::new(self.catalog.as_ref(), self.settings.matching);
        let today = Utc::now().date_naive();

        let (summary_run, referral_run, trials_run) = tokio::join!(
            run_stage(stage_deadline, summarizer.generate(consultation, &note)),
            run_stage(stage_deadline, drafter.draft(consultation, &note, today)),
            run_stage(stage_deadline, matcher.match_trials(consultation, &note))
        );

        // ── Aggregation ──
        phases.advance(RunPhase::Aggregating)?;
        let patient_name = consultation.patient.name.clone();
        let (patient_summary, summary_step) = summary_run.resolve(STEP_SUMMARY, &model, |_| {
            PatientSummary::unavailable(&patient_name, FLAG_SUMMARY_FAILED)
        });
        let (referral_letter, referral_step) = referral_run.resolve(STEP_REFERRAL, &model, |message| {
            ReferralOutcome::failed(message, FLAG_REFERRAL_FAILED)
        });
        let (trial_matches, trials_step) = trials_run.resolve(STEP_TRIALS, TRIAL_MATCHING_ENGINE, |message| {
            TrialMatches::unavailable(
                format!("Clinical trial matching unavailable: {message}"),
                FLAG_CATALOG_UNAVAILABLE,
            )
        });

        let processing_steps = vec![extraction_step, summary_step, referral_step, trials_step];
        let agent_summary = agent_summary(&note, &referral_letter, &trial_matches, &processing_steps);
        let total_processing_time_ms = millis(started.elapsed());

        let metadata = ResultMetadata {
            total_processing_time_ms,
            model_used: model,
            consultation_id,
            patient_id: consultation.patient_id().to_string(),
            disclaimer: RESULT_DISCLAIMER.to_string(),
            version: CONTRACT_VERSION.to_string(),
            architecture: Some(ARCHITECTURE.to_string()),
            session_id: Some(Uuid::new_v4().to_string()),
            tools_called: u32::try_from(processing_steps.len()).ok(),
        };

        phases.advance(RunPhase::Done)?;
        tracing::info!(
            total_ms = total_processing_time_ms,
            soap_flags = note.flags.len(),
            referral = referral_letter.referral_letter.is_some(),
            trials = trial_matches.trial_matches.len(),
            "Consultation processed"
        );

        Ok(ProcessingResult {
            soap_note: note,
            patient_summary,
            referral_letter,
            trial_matches,
            processing_steps,
            agent_summary: Some(agent_summary),
            metadata,
        })
    }
}

/// One-paragraph account of the run, built from the documents themselves.
fn agent_summary(
    note: &SoapNote,
    referral: &ReferralOutcome,
    trials: &TrialMatches,
    steps: &[ProcessingStep],
) -> String {
    let diagnosis = match note.assessment.primary_diagnosis.trim() {
        "" => "no primary diagnosis documented".to_string(),
        d => format!("primary diagnosis {d}"),
    };
    let referral_text = match (&referral.referral_letter, referral.flags.iter().any(|f| f == FLAG_REFERRAL_FAILED)) {
        (Some(letter), _) => format!("{} referral drafted to {}", letter.urgency.level, letter.to.trim_start_matches("The ")),
        (None, true) => "referral could not be drafted".to_string(),
        (None, false) => "no referral indicated".to_string(),
    };
    let trial_text = if trials.flags.iter().any(|f| f == FLAG_CATALOG_UNAVAILABLE) {
        "trial matching unavailable".to_string()
    } else {
        let n = trials.trial_matches.len();
        format!("{n} potential trial signal{}", if n == 1 { "" } else { "s" })
    };
    let completed = steps.iter().filter(|s| s.status == StageStatus::Ok).count();

    format!(
        "SOAP note extracted ({diagnosis}); {referral_text}; {trial_text}. {completed} of {} stages completed.",
        steps.len()
    )
}
