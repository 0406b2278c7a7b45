//! Deterministic patient eligibility profile, derived from the SOAP note and
//! demographics without a model call.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::models::{Consultation, SoapNote};

/// Numeric measurement extractors: normalized name → pattern whose first
/// capture group is the value. The first hit per name wins.
static MEASUREMENT_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        ("hba1c", Regex::new(r"(?i)\bhba1c\b[^0-9\n]{0,20}(\d+(?:\.\d+)?)").expect("Invalid measurement pattern")),
        ("bmi", Regex::new(r"(?i)\bbmi\b[^0-9\n]{0,15}(\d+(?:\.\d+)?)").expect("Invalid measurement pattern")),
        (
            "spo2",
            Regex::new(r"(?i)\b(?:spo2|sp02|o2\s+sat(?:uration)?|oxygen\s+saturation)\b[^0-9\n]{0,15}(\d+(?:\.\d+)?)")
                .expect("Invalid measurement pattern"),
        ),
        // Percent predicted; "FEV1/FVC" ratios do not match.
        ("fev1", Regex::new(r"(?i)\bfev1\b\s*(?:[:=]|of|was|is)?\s*(\d+(?:\.\d+)?)\s*%").expect("Invalid measurement pattern")),
        ("mmse", Regex::new(r"(?i)\bmmse\b[^0-9\n]{0,15}(\d+(?:\.\d+)?)").expect("Invalid measurement pattern")),
        ("egfr", Regex::new(r"(?i)\begfr\b[^0-9\n]{0,15}(\d+(?:\.\d+)?)").expect("Invalid measurement pattern")),
        (
            "systolic_bp",
            Regex::new(r"(?i)\b(?:bp|blood\s+pressure)\b[^0-9\n]{0,15}(\d{2,3})\s*/\s*\d{2,3}").expect("Invalid measurement pattern"),
        ),
    ]
});

static SEVERITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(?i)\b(?:gold\s+)?stage\s+(?:[0-4]|iv|i{1,3})[a-c]?\b").expect("Invalid severity pattern"),
        Regex::new(r"(?i)\bgrade\s+[1-4]\b").expect("Invalid severity pattern"),
        Regex::new(r"(?i)\bnyha\s+(?:class\s+)?(?:iv|i{1,3}|[1-4])\b").expect("Invalid severity pattern"),
        Regex::new(r"(?i)\b(?:mild|moderate|severe|advanced|end-stage|uncontrolled|poorly\s+controlled)\b").expect("Invalid severity pattern"),
    ]
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientProfile {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub primary_diagnosis: Option<String>,
    pub secondary_diagnoses: Vec<String>,
    /// Past medical history.
    pub comorbidities: Vec<String>,
    pub current_medications: Vec<String>,
    pub severity_markers: Vec<String>,
    pub findings: Vec<String>,
    pub measurements: BTreeMap<String, f64>,
}

impl PatientProfile {
    pub fn extract(consultation: &Consultation, note: &SoapNote) -> Self {
        let patient = &consultation.patient;
        let non_empty = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };

        let mut current_medications: Vec<String> = Vec::new();
        for name in note.medication_names() {
            let name = name.trim().to_string();
            if !current_medications.iter().any(|m| m.eq_ignore_ascii_case(&name)) {
                current_medications.push(name);
            }
        }

        let mut findings: Vec<String> = note.subjective.review_of_systems.relevant_positives.clone();
        findings.extend(non_empty(&note.objective.physical_exam.general));
        findings.extend(
            note.objective
                .physical_exam
                .systems_examined
                .iter()
                .filter_map(|s| non_empty(&s.findings)),
        );
        findings.extend(note.objective.investigations.iter().cloned());

        let clinical_text = [
            note.assessment_text(),
            note.subjective.history_of_present_illness.clone(),
            note.subjective.chief_complaint.clone(),
        ]
        .join("\n");

        let measurement_text = note
            .objective
            .vitals
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .chain(note.objective.investigations.iter().cloned())
            .chain([note.objective_text(), clinical_text.clone()])
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            age: u32::try_from(patient.age).ok(),
            gender: non_empty(&patient.gender),
            primary_diagnosis: non_empty(&note.assessment.primary_diagnosis),
            secondary_diagnoses: note.assessment.secondary_diagnoses.clone(),
            comorbidities: note.subjective.past_medical_history.clone(),
            current_medications,
            severity_markers: severity_markers(&clinical_text),
            findings,
            measurements: measurements(&measurement_text),
        }
    }

    /// Primary, secondary and past diagnoses.
    pub fn all_diagnoses(&self) -> Vec<&str> {
        self.primary_diagnosis
            .iter()
            .map(String::as_str)
            .chain(self.secondary_diagnoses.iter().map(String::as_str))
            .chain(self.comorbidities.iter().map(String::as_str))
            .collect()
    }

    /// Open attribute map as emitted in `patient_profile_extracted`.
    /// Attributes with no data are omitted.
    pub fn to_attribute_map(&self) -> BTreeMap<String, Value> {
        let mut map = BTreeMap::new();
        if let Some(age) = self.age {
            map.insert("age".to_string(), json!(age));
        }
        if let Some(gender) = &self.gender {
            map.insert("gender".to_string(), json!(gender));
        }
        if let Some(diagnosis) = &self.primary_diagnosis {
            map.insert("primary_diagnosis".to_string(), json!(diagnosis));
        }
        let lists = [
            ("secondary_diagnoses", &self.secondary_diagnoses),
            ("comorbidities", &self.comorbidities),
            ("current_medications", &self.current_medications),
            ("severity_markers", &self.severity_markers),
            ("findings", &self.findings),
        ];
        for (key, values) in lists {
            if !values.is_empty() {
                map.insert(key.to_string(), json!(values));
            }
        }
        if !self.measurements.is_empty() {
            map.insert("measurements".to_string(), json!(self.measurements));
        }
        map
    }
}

fn severity_markers(text: &str) -> Vec<String> {
    let mut markers: Vec<String> = Vec::new();
    for pattern in SEVERITY_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let marker = m.as_str().to_lowercase();
            if !markers.contains(&marker) {
                markers.push(marker);
            }
        }
    }
    markers
}

fn measurements(text: &str) -> BTreeMap<String, f64> {
    MEASUREMENT_PATTERNS
        .iter()
        .filter_map(|(name, pattern)| {
            let value = pattern.captures(text)?.get(1)?.as_str().parse::<f64>().ok()?;
            Some((name.to_string(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::consultation::fixtures as consultations;
    use crate::models::soap::fixtures as notes;

    #[test]
    fn copd_profile_captures_severity_and_measurements() {
        let consultation = consultations::consultation("Breathless for six months.");
        let profile = PatientProfile::extract(&consultation, &notes::copd_with_opacity());

        assert_eq!(profile.age, Some(62));
        assert_eq!(profile.primary_diagnosis.as_deref(), Some("Severe COPD, GOLD Stage 3"));
        assert!(profile.severity_markers.contains(&"gold stage 3".to_string()));
        assert!(profile.severity_markers.contains(&"severe".to_string()));
        assert_eq!(profile.measurements.get("fev1"), Some(&42.0));
        assert_eq!(profile.measurements.get("spo2"), Some(&91.0));
        assert_eq!(profile.measurements.get("systolic_bp"), Some(&126.0));
        assert_eq!(profile.current_medications, vec!["Tiotropium"]);
    }

    #[test]
    fn diabetes_profile_reads_hba1c_and_dedups_medications() {
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let profile = PatientProfile::extract(&consultation, &notes::routine_diabetes());
        assert_eq!(profile.measurements.get("hba1c"), Some(&7.4));
        assert_eq!(profile.current_medications, vec!["Metformin 500mg", "Metformin"]);
        assert_eq!(profile.comorbidities, vec!["Hypertension"]);
    }

    #[test]
    fn attribute_map_omits_absent_data() {
        let profile = PatientProfile {
            age: Some(40),
            ..PatientProfile::default()
        };
        let map = profile.to_attribute_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map["age"], json!(40));
    }

    #[test]
    fn fev1_ratio_is_not_a_percent_predicted() {
        let values = measurements("FEV1/FVC 0.58");
        assert!(values.get("fev1").is_none());
    }
}
