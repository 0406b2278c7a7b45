use serde::{Deserialize, Serialize};

/// Fixed disclaimer carried by every patient summary.
pub const PATIENT_SUMMARY_DISCLAIMER: &str =
    "This summary was generated by AI based on your doctor's notes. Always follow your doctor's verbal instructions.";

/// Lay-language projection of a SOAP note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientSummary {
    pub greeting: String,
    pub visit_summary: String,
    pub what_the_doctor_found: String,
    pub your_diagnosis: String,
    pub your_treatment_plan: TreatmentPlan,
    pub follow_up: FollowUp,
    pub warning_signs: Vec<String>,
    pub questions_to_ask: Vec<String>,
    pub disclaimer: String,
    pub flags: Vec<String>,
}

impl Default for PatientSummary {
    fn default() -> Self {
        Self {
            greeting: String::new(),
            visit_summary: String::new(),
            what_the_doctor_found: String::new(),
            your_diagnosis: String::new(),
            your_treatment_plan: TreatmentPlan::default(),
            follow_up: FollowUp::default(),
            warning_signs: Vec::new(),
            questions_to_ask: Vec::new(),
            disclaimer: PATIENT_SUMMARY_DISCLAIMER.to_string(),
            flags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreatmentPlan {
    pub medications: Vec<SummaryMedication>,
    pub lifestyle_advice: Vec<String>,
    pub tests_ordered: Vec<SummaryTest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryMedication {
    pub name: String,
    pub what_its_for: String,
    pub how_to_take: String,
    pub important_notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryTest {
    pub test_name: String,
    pub why_needed: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowUp {
    pub next_appointment: String,
    pub what_to_bring: Vec<String>,
}

impl PatientSummary {
    /// Empty summary standing in for a stage that produced nothing.
    pub fn unavailable(patient_name: &str, flag: &str) -> Self {
        Self {
            greeting: format!("Dear {},", patient_name.trim()),
            flags: vec![flag.to_string()],
            ..Self::default()
        }
    }
}
