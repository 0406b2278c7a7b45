//! Schema post-validation of the model's SOAP JSON.
//!
//! Every required field is read with its expected JSON type. A field that is
//! absent or of the wrong type is recorded as missing and filled with its
//! empty value, so the note always has the full shape.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::models::{
    Assessment, Objective, PhysicalExam, Plan, PrescribedMedication, ReviewOfSystems,
    SectionConfidence, SoapNote, SoapSection, Subjective, SystemFinding,
};
use crate::pipeline::generation::parser::{normalize_confidence, string_list};

/// Model output after schema post-validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSoap {
    pub note: SoapNote,
    /// Required fields that were absent or mistyped, as `section.field`.
    pub missing: Vec<(SoapSection, &'static str)>,
    /// Per-section confidence reported by the model, if any.
    pub model_confidence: [Option<f32>; 4],
    /// Concerns reported by the model itself.
    pub model_flags: Vec<String>,
}

impl NormalizedSoap {
    pub fn missing_in(&self, section: SoapSection) -> usize {
        self.missing.iter().filter(|(s, _)| *s == section).count()
    }

    pub fn model_confidence_for(&self, section: SoapSection) -> Option<f32> {
        let index = SoapSection::ALL.iter().position(|s| *s == section)?;
        self.model_confidence[index]
    }
}

/// Reads typed fields from one section object, recording mismatches.
struct SectionReader<'a> {
    section: SoapSection,
    object: Option<&'a Map<String, Value>>,
    missing: &'a mut Vec<(SoapSection, &'static str)>,
}

impl<'a> SectionReader<'a> {
    fn new(
        raw: &'a Value,
        section: SoapSection,
        missing: &'a mut Vec<(SoapSection, &'static str)>,
    ) -> Self {
        Self {
            section,
            object: raw.get(section.as_str()).and_then(Value::as_object),
            missing,
        }
    }

    fn field(&mut self, name: &'static str, accepts: fn(&Value) -> bool) -> Option<&'a Value> {
        match self.object.and_then(|o| o.get(name)) {
            Some(value) if accepts(value) => Some(value),
            _ => {
                self.missing.push((self.section, name));
                None
            }
        }
    }

    fn text(&mut self, name: &'static str) -> String {
        self.field(name, Value::is_string)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    fn list(&mut self, name: &'static str) -> Vec<String> {
        self.field(name, Value::is_array)
            .map(coerce_string_list)
            .unwrap_or_default()
    }

    fn object(&mut self, name: &'static str) -> Option<&'a Value> {
        self.field(name, Value::is_object)
    }
}

/// Array items as strings; object items are flattened to their string values.
fn coerce_string_list(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::Object(map) => Some(
                map.values()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(scalar_text)
        .unwrap_or_default()
}

pub fn normalize(raw: &Value) -> NormalizedSoap {
    let mut missing = Vec::new();

    let subjective = {
        let mut r = SectionReader::new(raw, SoapSection::Subjective, &mut missing);
        let chief_complaint = r.text("chief_complaint");
        let history_of_present_illness = r.text("history_of_present_illness");
        let review_of_systems = r
            .object("review_of_systems")
            .map(|ros| ReviewOfSystems {
                relevant_positives: string_list(ros.get("relevant_positives")),
                relevant_negatives: string_list(ros.get("relevant_negatives")),
            })
            .unwrap_or_default();
        Subjective {
            chief_complaint,
            history_of_present_illness,
            review_of_systems,
            past_medical_history: r.list("past_medical_history"),
            medications: r.list("medications"),
            allergies: r.list("allergies"),
        }
    };

    let objective = {
        let mut r = SectionReader::new(raw, SoapSection::Objective, &mut missing);
        let vitals = r.object("vitals").map(read_vitals).unwrap_or_default();
        let physical_exam = r
            .object("physical_exam")
            .map(read_physical_exam)
            .unwrap_or_default();
        Objective {
            vitals,
            physical_exam,
            investigations: r.list("investigations"),
        }
    };

    let assessment = {
        let mut r = SectionReader::new(raw, SoapSection::Assessment, &mut missing);
        Assessment {
            primary_diagnosis: r.text("primary_diagnosis"),
            secondary_diagnoses: r.list("secondary_diagnoses"),
            clinical_reasoning: r.text("clinical_reasoning"),
        }
    };

    let plan = {
        let mut r = SectionReader::new(raw, SoapSection::Plan, &mut missing);
        let medications_prescribed = r
            .field("medications_prescribed", Value::is_array)
            .map(read_prescriptions)
            .unwrap_or_default();
        Plan {
            medications_prescribed,
            investigations_ordered: r.list("investigations_ordered"),
            procedures_planned: r.list("procedures_planned"),
            referrals: r.list("referrals"),
            follow_up: r.text("follow_up"),
            patient_education: r.list("patient_education"),
        }
    };

    let scores = raw.get("confidence_scores");
    let model_confidence = SoapSection::ALL.map(|section| {
        scores
            .and_then(|s| s.get(section.as_str()))
            .and_then(normalize_confidence)
    });

    NormalizedSoap {
        note: SoapNote {
            subjective,
            objective,
            assessment,
            plan,
            confidence_scores: SectionConfidence::default(),
            flags: Vec::new(),
        },
        missing,
        model_confidence,
        model_flags: string_list(raw.get("flags")),
    }
}

/// Vital name → value; blank and null readings are dropped.
fn read_vitals(value: &Value) -> BTreeMap<String, String> {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, reading)| {
                    let reading = scalar_text(reading)?;
                    let name = name.trim();
                    (!name.is_empty()).then(|| (name.to_string(), reading))
                })
                .collect()
        })
        .unwrap_or_default()
}

fn read_physical_exam(value: &Value) -> PhysicalExam {
    let systems_examined = value
        .get("systems_examined")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(SystemFinding {
                        system: String::new(),
                        findings: s.trim().to_string(),
                    }),
                    Value::Object(_) => Some(SystemFinding {
                        system: str_field(item, "system"),
                        findings: str_field(item, "findings"),
                    }),
                    _ => None,
                })
                .filter(|f| !f.system.is_empty() || !f.findings.is_empty())
                .collect()
        })
        .unwrap_or_default();

    PhysicalExam {
        general: str_field(value, "general"),
        systems_examined,
    }
}

fn read_prescriptions(value: &Value) -> Vec<PrescribedMedication> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(PrescribedMedication {
                        name: s.trim().to_string(),
                        ..PrescribedMedication::default()
                    }),
                    Value::Object(_) => Some(PrescribedMedication {
                        name: str_field(item, "name"),
                        dosage: str_field(item, "dosage"),
                        frequency: str_field(item, "frequency"),
                        duration: str_field(item, "duration"),
                    }),
                    _ => None,
                })
                .filter(|m| !m.name.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
