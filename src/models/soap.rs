use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::enums::SoapSection;

/// Structured Subjective/Objective/Assessment/Plan note.
///
/// Every list defaults to empty and every confidence is always present, so the
/// serialized shape is identical across runs regardless of narrative content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoapNote {
    pub subjective: Subjective,
    pub objective: Objective,
    pub assessment: Assessment,
    pub plan: Plan,
    pub confidence_scores: SectionConfidence,
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subjective {
    pub chief_complaint: String,
    pub history_of_present_illness: String,
    pub review_of_systems: ReviewOfSystems,
    pub past_medical_history: Vec<String>,
    pub medications: Vec<String>,
    pub allergies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewOfSystems {
    pub relevant_positives: Vec<String>,
    pub relevant_negatives: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Objective {
    pub vitals: BTreeMap<String, String>,
    pub physical_exam: PhysicalExam,
    pub investigations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalExam {
    pub general: String,
    pub systems_examined: Vec<SystemFinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemFinding {
    pub system: String,
    pub findings: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Assessment {
    pub primary_diagnosis: String,
    pub secondary_diagnoses: Vec<String>,
    pub clinical_reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    pub medications_prescribed: Vec<PrescribedMedication>,
    pub investigations_ordered: Vec<String>,
    pub procedures_planned: Vec<String>,
    pub referrals: Vec<String>,
    pub follow_up: String,
    pub patient_education: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrescribedMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
}

/// Per-section extraction certainty in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionConfidence {
    pub subjective: f32,
    pub objective: f32,
    pub assessment: f32,
    pub plan: f32,
}

impl SectionConfidence {
    pub fn get(&self, section: SoapSection) -> f32 {
        match section {
            SoapSection::Subjective => self.subjective,
            SoapSection::Objective => self.objective,
            SoapSection::Assessment => self.assessment,
            SoapSection::Plan => self.plan,
        }
    }

    pub fn set(&mut self, section: SoapSection, value: f32) {
        let slot = match section {
            SoapSection::Subjective => &mut self.subjective,
            SoapSection::Objective => &mut self.objective,
            SoapSection::Assessment => &mut self.assessment,
            SoapSection::Plan => &mut self.plan,
        };
        *slot = value;
    }

    pub fn lowest(&self) -> f32 {
        SoapSection::ALL
            .iter()
            .map(|s| self.get(*s))
            .fold(1.0_f32, f32::min)
    }

    /// Mean certainty of the sections a clinical decision rests on.
    pub fn decision_confidence(&self) -> f32 {
        (self.assessment + self.plan) / 2.0
    }
}

impl SoapNote {
    /// Current and newly prescribed medication names.
    pub fn medication_names(&self) -> Vec<&str> {
        self.subjective
            .medications
            .iter()
            .map(String::as_str)
            .chain(self.plan.medications_prescribed.iter().map(|m| m.name.as_str()))
            .filter(|m| !m.trim().is_empty())
            .collect()
    }

    /// Completed and ordered investigations.
    pub fn investigation_names(&self) -> Vec<&str> {
        self.objective
            .investigations
            .iter()
            .chain(self.plan.investigations_ordered.iter())
            .chain(self.plan.procedures_planned.iter())
            .map(String::as_str)
            .filter(|m| !m.trim().is_empty())
            .collect()
    }

    pub fn assessment_text(&self) -> String {
        let mut parts = vec![self.assessment.primary_diagnosis.as_str()];
        parts.extend(self.assessment.secondary_diagnoses.iter().map(String::as_str));
        parts.push(self.assessment.clinical_reasoning.as_str());
        join_non_empty(&parts)
    }

    pub fn plan_text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.plan.investigations_ordered.iter().map(String::as_str));
        parts.extend(self.plan.procedures_planned.iter().map(String::as_str));
        parts.extend(self.plan.referrals.iter().map(String::as_str));
        parts.push(self.plan.follow_up.as_str());
        join_non_empty(&parts)
    }

    /// Examination findings and investigation results as one searchable text.
    pub fn objective_text(&self) -> String {
        let mut parts = vec![self.objective.physical_exam.general.as_str()];
        parts.extend(
            self.objective
                .physical_exam
                .systems_examined
                .iter()
                .map(|s| s.findings.as_str()),
        );
        parts.extend(self.objective.investigations.iter().map(String::as_str));
        join_non_empty(&parts)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

fn join_non_empty(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(". ")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_yields_complete_shape() {
        let note: SoapNote = serde_json::from_str("{}").unwrap();
        let value = serde_json::to_value(&note).unwrap();
        assert!(value["subjective"]["review_of_systems"]["relevant_positives"].is_array());
        assert!(value["plan"]["medications_prescribed"].is_array());
        assert!(value["confidence_scores"]["objective"].is_number());
        assert!(value["flags"].is_array());
    }

    #[test]
    fn lowest_confidence_picks_minimum() {
        let scores = SectionConfidence {
            subjective: 0.9,
            objective: 0.4,
            assessment: 0.7,
            plan: 0.8,
        };
        assert!((scores.lowest() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn medication_names_merge_current_and_prescribed() {
        let note = fixtures::routine_diabetes();
        assert_eq!(note.medication_names(), vec!["Metformin 500mg", "Metformin"]);
    }

    #[test]
    fn objective_text_includes_investigations() {
        let note = fixtures::copd_with_opacity();
        assert!(note.objective_text().contains("2.5 cm"));
    }
}
