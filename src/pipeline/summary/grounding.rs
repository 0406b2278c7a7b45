//! Grounding check: the summary may only restate what the SOAP note holds.
//!
//! Listed medications and tests must share a significant token with a SOAP
//! medication or investigation. Every clinical token of the diagnosis must
//! appear somewhere in the note. Free-text fields are scanned for drug and
//! test mentions the note lacks; the offending sentence or entry is dropped.
//! Each removal or replacement is flagged.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{PatientSummary, SoapNote};
use crate::pipeline::text::{contains_term, sentences, shares_token, significant_tokens};

pub const FLAG_UNGROUNDED_DIAGNOSIS: &str = "ungrounded_diagnosis";

/// Plain-language filler a patient-facing diagnosis may add freely.
const LAY_WORDS: &[&str] = &[
    "have", "has", "had", "which", "means", "mean", "called", "also", "are", "been",
    "condition", "problem", "problems", "illness", "high", "low", "blood", "sugar",
    "early", "long", "term", "some", "slightly", "little", "well", "not", "controlled",
    "control", "good", "can", "may", "when", "what", "where", "there", "their", "body",
];

/// Common generic drug names and the suffixes of common drug classes.
static DRUG_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:insulin|aspirin|paracetamol|acetaminophen|ibuprofen|warfarin|clopidogrel|furosemide|levothyroxine|salbutamol|hydroxychloroquine|methotrexate|gliclazide|glimepiride|[a-z]{3,}(?:statin|pril|sartan|olol|dipine|formin|gliptin|gliflozin|glitazone|prazole|floxacin|cillin|mycin|cycline|parin|xaban|gatran|lukast|terol|tropium|sone|olone|triptan|azepam|oxetine))\b",
    )
    .expect("Invalid drug mention pattern")
});

/// Investigation mentions and the note wording that grounds each one.
const TEST_MENTIONS: &[(&str, &[&str])] = &[
    ("ct scan", &["ct", "hrct", "cect", "computed tomography"]),
    ("mri", &["mri", "magnetic resonance"]),
    ("x-ray", &["x-ray", "xray", "radiograph", "cxr"]),
    ("ultrasound", &["ultrasound", "usg", "sonography"]),
    ("ecg", &["ecg", "ekg", "electrocardiogram"]),
    ("echocardiogram", &["echo", "echocardiogram"]),
    ("biopsy", &["biopsy"]),
    ("colonoscopy", &["colonoscopy"]),
    ("endoscopy", &["endoscopy"]),
    ("spirometry", &["spirometry", "pft", "fev1"]),
    ("hba1c", &["hba1c", "a1c", "glycated"]),
    ("lipid profile", &["lipid", "cholesterol"]),
    ("kidney function", &["kft", "rft", "creatinine", "egfr", "renal function", "kidney function"]),
    ("liver function", &["lft", "liver function"]),
    ("thyroid", &["tsh", "thyroid"]),
];

fn grounded_in(candidate: &str, sources: &[&str]) -> bool {
    sources.iter().any(|source| shares_token(candidate, source))
}

/// Everything the note records, as one searchable text.
fn note_text(note: &SoapNote) -> String {
    let mut parts: Vec<String> = vec![
        note.subjective.chief_complaint.clone(),
        note.subjective.history_of_present_illness.clone(),
        note.assessment_text(),
        note.plan_text(),
        note.objective_text(),
    ];
    parts.extend(note.subjective.past_medical_history.iter().cloned());
    parts.extend(note.medication_names().into_iter().map(str::to_string));
    parts.extend(note.plan.patient_education.iter().cloned());
    parts.join(". ")
}

/// Clinical tokens of `diagnosis` the note never mentions.
fn ungrounded_tokens(diagnosis: &str, note_tokens: &BTreeSet<String>) -> Vec<String> {
    significant_tokens(diagnosis)
        .into_iter()
        .filter(|t| !LAY_WORDS.contains(&t.as_str()) && !note_tokens.contains(t))
        .collect()
}

/// Flags for drug or test mentions in `text` that `note` does not ground.
fn ungrounded_mentions(text: &str, note: &str) -> Vec<String> {
    let mut flags = Vec::new();
    for found in DRUG_MENTION.find_iter(text) {
        let drug = found.as_str().to_lowercase();
        if !contains_term(note, &drug) {
            flags.push(format!("ungrounded_medication:{drug}"));
        }
    }
    for (mention, grounds) in TEST_MENTIONS {
        if contains_term(text, mention) && !grounds.iter().any(|g| contains_term(note, g)) {
            flags.push(format!("ungrounded_test:{mention}"));
        }
    }
    flags
}

/// Drop the sentences of `text` that carry ungrounded mentions.
fn scrub_text(text: &mut String, note: &str, flags: &mut Vec<String>) {
    let mut kept = Vec::new();
    let mut removed = false;
    for sentence in sentences(text) {
        let found = ungrounded_mentions(sentence, note);
        if found.is_empty() {
            kept.push(format!("{sentence}."));
        } else {
            removed = true;
            flags.extend(found);
        }
    }
    if removed {
        *text = kept.join(" ");
    }
}

/// Drop list entries that carry ungrounded mentions.
fn scrub_list(entries: &mut Vec<String>, note: &str, flags: &mut Vec<String>) {
    entries.retain(|entry| {
        let found = ungrounded_mentions(entry, note);
        let keep = found.is_empty();
        flags.extend(found);
        keep
    });
}

/// Remove ungrounded entries from `summary`; returns one flag per removal.
pub fn enforce_grounding(summary: &mut PatientSummary, note: &SoapNote) -> Vec<String> {
    let mut flags = Vec::new();

    let medications = note.medication_names();
    summary.your_treatment_plan.medications.retain(|m| {
        let keep = grounded_in(&m.name, &medications);
        if !keep {
            flags.push(format!("ungrounded_medication:{}", m.name.trim().to_lowercase()));
        }
        keep
    });

    let investigations = note.investigation_names();
    summary.your_treatment_plan.tests_ordered.retain(|t| {
        let keep = grounded_in(&t.test_name, &investigations);
        if !keep {
            flags.push(format!("ungrounded_test:{}", t.test_name.trim().to_lowercase()));
        }
        keep
    });

    let recorded = note_text(note);
    let primary = note.assessment.primary_diagnosis.trim();
    if summary.your_diagnosis.trim().is_empty() {
        summary.your_diagnosis = primary.to_string();
    } else {
        let unknown = ungrounded_tokens(&summary.your_diagnosis, &significant_tokens(&recorded));
        if !unknown.is_empty() {
            tracing::warn!(terms = unknown.len(), "Summary diagnosis not grounded in note, replaced");
            summary.your_diagnosis = primary.to_string();
            flags.push(FLAG_UNGROUNDED_DIAGNOSIS.to_string());
        }
    }

    scrub_text(&mut summary.visit_summary, &recorded, &mut flags);
    scrub_text(&mut summary.what_the_doctor_found, &recorded, &mut flags);
    scrub_list(&mut summary.your_treatment_plan.lifestyle_advice, &recorded, &mut flags);
    scrub_list(&mut summary.warning_signs, &recorded, &mut flags);
    scrub_list(&mut summary.questions_to_ask, &recorded, &mut flags);

    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::soap::fixtures;
    use crate::models::{SummaryMedication, SummaryTest};

    fn summary_with(meds: &[&str], tests: &[&str], diagnosis: &str) -> PatientSummary {
        let mut summary = PatientSummary::default();
        summary.your_diagnosis = diagnosis.into();
        summary.your_treatment_plan.medications = meds
            .iter()
            .map(|name| SummaryMedication {
                name: (*name).into(),
                ..SummaryMedication::default()
            })
            .collect();
        summary.your_treatment_plan.tests_ordered = tests
            .iter()
            .map(|name| SummaryTest {
                test_name: (*name).into(),
                why_needed: String::new(),
            })
            .collect();
        summary
    }

    #[test]
    fn grounded_entries_survive() {
        let note = fixtures::routine_diabetes();
        let mut summary = summary_with(
            &["Metformin 500mg tablets"],
            &["Blood sugar test (HbA1c)"],
            "You have type 2 diabetes, which means high blood sugar",
        );
        summary.what_the_doctor_found = "Your HbA1c is 7.4%. Keep taking metformin.".into();
        let flags = enforce_grounding(&mut summary, &note);
        assert!(flags.is_empty(), "{flags:?}");
        assert_eq!(summary.your_treatment_plan.medications.len(), 1);
        assert_eq!(summary.your_treatment_plan.tests_ordered.len(), 1);
        assert_eq!(summary.what_the_doctor_found, "Your HbA1c is 7.4%. Keep taking metformin.");
    }

    #[test]
    fn invented_medication_and_test_removed() {
        let note = fixtures::routine_diabetes();
        let mut summary = summary_with(
            &["Metformin", "Atorvastatin"],
            &["Lipid profile"],
            "Type 2 diabetes",
        );
        let flags = enforce_grounding(&mut summary, &note);
        assert_eq!(
            flags,
            vec!["ungrounded_medication:atorvastatin", "ungrounded_test:lipid profile"]
        );
        let names: Vec<_> = summary
            .your_treatment_plan
            .medications
            .iter()
            .map(|m| m.name.as_str())
            .collect();
        assert_eq!(names, vec!["Metformin"]);
        assert!(summary.your_treatment_plan.tests_ordered.is_empty());
    }

    #[test]
    fn invented_diagnosis_replaced_with_primary() {
        let note = fixtures::routine_diabetes();
        let mut summary = summary_with(&[], &[], "Early kidney failure");
        let flags = enforce_grounding(&mut summary, &note);
        assert_eq!(flags, vec![FLAG_UNGROUNDED_DIAGNOSIS]);
        assert_eq!(summary.your_diagnosis, "Type 2 Diabetes Mellitus");
    }

    #[test]
    fn diagnosis_with_one_known_word_still_needs_every_clinical_word() {
        let note = fixtures::routine_diabetes();
        let mut summary = summary_with(&[], &[], "Type 2 diabetes with early kidney failure");
        let flags = enforce_grounding(&mut summary, &note);
        assert_eq!(flags, vec![FLAG_UNGROUNDED_DIAGNOSIS]);
        assert_eq!(summary.your_diagnosis, "Type 2 Diabetes Mellitus");
    }

    #[test]
    fn free_text_drug_mention_is_dropped_and_flagged() {
        let note = fixtures::routine_diabetes();
        let mut summary = summary_with(&[], &[], "Type 2 diabetes");
        summary.what_the_doctor_found =
            "Your sugar control is stable. Your doctor started atorvastatin for cholesterol.".into();
        summary.warning_signs = vec!["Dizziness".into(), "Stop insulin if you feel faint".into()];
        let flags = enforce_grounding(&mut summary, &note);

        assert_eq!(
            flags,
            vec!["ungrounded_medication:atorvastatin", "ungrounded_medication:insulin"]
        );
        assert_eq!(summary.what_the_doctor_found, "Your sugar control is stable.");
        assert_eq!(summary.warning_signs, vec!["Dizziness"]);
    }

    #[test]
    fn free_text_test_mention_needs_note_support() {
        let note = fixtures::copd_with_opacity();
        let mut summary = summary_with(&[], &[], "");
        summary.visit_summary = "You will have a CT scan of your chest. An MRI of your brain is also planned.".into();
        let flags = enforce_grounding(&mut summary, &note);

        assert_eq!(flags, vec!["ungrounded_test:mri"]);
        assert_eq!(summary.visit_summary, "You will have a CT scan of your chest.");
    }

    #[test]
    fn empty_diagnosis_filled_from_assessment() {
        let note = fixtures::copd_with_opacity();
        let mut summary = summary_with(&[], &[], "");
        assert!(enforce_grounding(&mut summary, &note).is_empty());
        assert_eq!(summary.your_diagnosis, "Severe COPD, GOLD Stage 3");
    }
}
