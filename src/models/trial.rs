use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Fixed disclaimer carried by every trial matching result.
pub const TRIAL_DISCLAIMER: &str = "INFORMATIONAL ONLY: These are potential eligibility signals. A qualified physician must review all criteria. Patient consent is always required.";

// ═══════════════════════════════════════════════════════════
// Catalog side: trials as stored in the catalog
// ═══════════════════════════════════════════════════════════

/// A clinical trial with machine-evaluable eligibility criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalTrial {
    pub trial_id: String,
    pub title: String,
    #[serde(default)]
    pub phase: String,
    #[serde(default)]
    pub sponsor: String,
    #[serde(default)]
    pub enrollment_status: String,
    /// Conditions studied; used by catalogs for candidate retrieval.
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub contact_info: Option<String>,
    #[serde(default)]
    pub criteria: Vec<EligibilityCriterion>,
}

/// One eligibility condition: human-readable text plus its evaluable rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriterion {
    pub criterion: String,
    #[serde(flatten)]
    pub rule: CriterionRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionRule {
    AgeRange {
        #[serde(default)]
        min: Option<u32>,
        #[serde(default)]
        max: Option<u32>,
    },
    Gender {
        allowed: Vec<String>,
    },
    /// Patient must carry one of these diagnoses.
    Diagnosis {
        any_of: Vec<String>,
    },
    /// Patient must carry none of these diagnoses.
    ExcludeDiagnosis {
        any_of: Vec<String>,
    },
    /// Patient must be on one of these treatments.
    Medication {
        any_of: Vec<String>,
    },
    ExcludeMedication {
        any_of: Vec<String>,
    },
    /// A documented finding (exam, investigation, symptom) must mention one of these.
    Finding {
        any_of: Vec<String>,
    },
    /// Numeric measurement bound, e.g. `hba1c` between 7.0 and 10.5.
    Measurement {
        attribute: String,
        #[serde(default)]
        min: Option<f64>,
        #[serde(default)]
        max: Option<f64>,
    },
}

// ═══════════════════════════════════════════════════════════
// Result side: match outcomes on the wire
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionAssessment {
    pub criterion: String,
    pub patient_value: String,
    pub required_value: String,
    #[serde(rename = "match")]
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatch {
    pub trial_id: String,
    pub trial_title: String,
    pub trial_phase: String,
    pub sponsor: String,
    pub enrollment_status: String,
    pub matched_criteria: Vec<CriterionAssessment>,
    pub unmatched_criteria: Vec<CriterionAssessment>,
    pub missing_information: Vec<String>,
    pub confidence_score: f32,
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<String>,
}

impl TrialMatch {
    /// Total criteria accounted for across the three buckets.
    pub fn criteria_count(&self) -> usize {
        self.matched_criteria.len() + self.unmatched_criteria.len() + self.missing_information.len()
    }

    pub fn is_fully_eligible(&self) -> bool {
        self.unmatched_criteria.is_empty() && self.missing_information.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialMatches {
    pub patient_profile_extracted: BTreeMap<String, serde_json::Value>,
    pub trial_matches: Vec<TrialMatch>,
    pub summary: String,
    pub disclaimer: String,
    #[serde(default)]
    pub flags: Vec<String>,
}

impl TrialMatches {
    /// Empty result explaining why no trials could be evaluated.
    pub fn unavailable(summary: String, flag: &str) -> Self {
        Self {
            patient_profile_extracted: BTreeMap::new(),
            trial_matches: Vec::new(),
            summary,
            disclaimer: TRIAL_DISCLAIMER.to_string(),
            flags: vec![flag.to_string()],
        }
    }
}
