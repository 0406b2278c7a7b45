use serde::{Deserialize, Serialize};

use super::enums::StageStatus;
use super::referral::ReferralOutcome;
use super::soap::SoapNote;
use super::summary::PatientSummary;
use super::trial::TrialMatches;

/// Result-level disclaimer required on every processing result.
pub const RESULT_DISCLAIMER: &str = "AI-Generated - Requires Clinician Validation. This output is for informational purposes only and does not constitute medical advice, diagnosis, or treatment recommendations.";

/// Short disclaimer attached to error bodies.
pub const ERROR_DISCLAIMER: &str = "AI-Generated - Requires Clinician Validation";

/// Version of the result wire contract.
pub const CONTRACT_VERSION: &str = "1.0.0";

/// Trace entry for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    pub step: String,
    pub duration_ms: u64,
    pub model: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub total_processing_time_ms: u64,
    pub model_used: String,
    pub consultation_id: String,
    pub patient_id: String,
    pub disclaimer: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub architecture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools_called: Option<u32>,
}

/// Aggregate of all four documents plus the execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub soap_note: SoapNote,
    pub patient_summary: PatientSummary,
    pub referral_letter: ReferralOutcome,
    pub trial_matches: TrialMatches,
    pub processing_steps: Vec<ProcessingStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_summary: Option<String>,
    pub metadata: ResultMetadata,
}

impl ProcessingResult {
    pub fn step(&self, name: &str) -> Option<&ProcessingStep> {
        self.processing_steps.iter().find(|s| s.step == name)
    }
}
