use serde::{Deserialize, Serialize};

use super::enums::UrgencyLevel;

/// Message returned alongside a null letter when no referral is warranted.
pub const NO_REFERRAL_MESSAGE: &str = "No referral indicated for this consultation";

/// Referral stage output. `referral_letter` serializes as `null` when absent,
/// never as a missing key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferralOutcome {
    pub referral_letter: Option<ReferralLetter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub confidence_score: f32,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl ReferralOutcome {
    pub fn not_indicated(confidence_score: f32) -> Self {
        Self {
            referral_letter: None,
            message: Some(NO_REFERRAL_MESSAGE.to_string()),
            confidence_score,
            flags: Vec::new(),
        }
    }

    /// Null letter carrying the reason the stage produced nothing.
    pub fn failed(message: String, flag: &str) -> Self {
        Self {
            referral_letter: None,
            message: Some(message),
            confidence_score: 0.0,
            flags: vec![flag.to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralLetter {
    pub date: String,
    pub to: String,
    pub from: String,
    pub patient_summary: ReferralPatientSummary,
    pub reason_for_referral: String,
    pub relevant_history: RelevantHistory,
    pub investigations: ReferralInvestigations,
    pub clinical_questions: Vec<String>,
    pub urgency: Urgency,
    pub patient_preparation_checklist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralPatientSummary {
    pub demographics: String,
    pub presenting_complaint: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevantHistory {
    pub current_condition: String,
    pub relevant_past_history: Vec<String>,
    pub current_medications: Vec<String>,
    pub allergies: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferralInvestigations {
    pub completed: Vec<String>,
    pub pending: Vec<String>,
    pub recommended_before_visit: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Urgency {
    pub level: UrgencyLevel,
    pub reasoning: String,
}
