use super::profile::PatientProfile;
use crate::models::{CriterionAssessment, CriterionRule, EligibilityCriterion};
use crate::pipeline::text::{affirmed_in, contains_term};

/// Where one criterion lands. Every criterion lands in exactly one bucket.
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionOutcome {
    Matched(CriterionAssessment),
    Unmatched(CriterionAssessment),
    /// The profile lacks the data to decide; carries a human-readable note.
    Missing(String),
}

fn assessed(criterion: &EligibilityCriterion, patient_value: String, required_value: String, matched: bool) -> CriterionOutcome {
    let assessment = CriterionAssessment {
        criterion: criterion.criterion.clone(),
        patient_value,
        required_value,
        matched,
    };
    if matched {
        CriterionOutcome::Matched(assessment)
    } else {
        CriterionOutcome::Unmatched(assessment)
    }
}

fn missing(criterion: &EligibilityCriterion, what: &str) -> CriterionOutcome {
    CriterionOutcome::Missing(format!("{}: {} not documented", criterion.criterion, what))
}

fn range_text<T: std::fmt::Display>(min: Option<T>, max: Option<T>, unit: &str) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) => format!("{lo}-{hi}{unit}"),
        (Some(lo), None) => format!(">= {lo}{unit}"),
        (None, Some(hi)) => format!("<= {hi}{unit}"),
        (None, None) => "any".to_string(),
    }
}

fn normalize_gender(value: &str) -> String {
    match value.trim().to_lowercase().as_str() {
        "m" | "male" | "man" => "male".to_string(),
        "f" | "female" | "woman" => "female".to_string(),
        other => other.to_string(),
    }
}

/// First entry of `values` mentioning any of `terms` as a whole word.
fn first_mentioning<'v>(values: &[&'v str], terms: &[String]) -> Option<&'v str> {
    values
        .iter()
        .copied()
        .find(|v| terms.iter().any(|t| contains_term(v, t)))
}

/// Evaluate one criterion against the profile.
pub fn evaluate(criterion: &EligibilityCriterion, profile: &PatientProfile) -> CriterionOutcome {
    match &criterion.rule {
        CriterionRule::AgeRange { min, max } => match profile.age {
            None => missing(criterion, "age"),
            Some(age) => {
                let matched = min.map_or(true, |lo| age >= lo) && max.map_or(true, |hi| age <= hi);
                assessed(criterion, age.to_string(), range_text(*min, *max, " years"), matched)
            }
        },

        CriterionRule::Gender { allowed } => match &profile.gender {
            None => missing(criterion, "gender"),
            Some(gender) => {
                let patient = normalize_gender(gender);
                let matched = allowed.iter().any(|a| {
                    let a = normalize_gender(a);
                    a == "all" || a == "any" || a == patient
                });
                assessed(criterion, gender.clone(), allowed.join(" or "), matched)
            }
        },

        CriterionRule::Diagnosis { any_of } => {
            let diagnoses = profile.all_diagnoses();
            if diagnoses.is_empty() {
                return missing(criterion, "diagnosis");
            }
            let hit = first_mentioning(&diagnoses, any_of);
            let patient_value = hit
                .or_else(|| profile.primary_diagnosis.as_deref())
                .unwrap_or(diagnoses[0])
                .to_string();
            assessed(criterion, patient_value, any_of.join(" or "), hit.is_some())
        }

        CriterionRule::ExcludeDiagnosis { any_of } => {
            let diagnoses = profile.all_diagnoses();
            let required = format!("none of: {}", any_of.join(", "));
            if let Some(hit) = first_mentioning(&diagnoses, any_of) {
                return assessed(criterion, hit.to_string(), required, false);
            }
            if profile.comorbidities.is_empty() {
                return missing(criterion, "comorbidity history");
            }
            assessed(criterion, "not present".to_string(), required, true)
        }

        CriterionRule::Medication { any_of } => {
            let medications: Vec<&str> = profile.current_medications.iter().map(String::as_str).collect();
            if medications.is_empty() {
                return missing(criterion, "medication history");
            }
            let hit = first_mentioning(&medications, any_of);
            let patient_value = hit.map_or_else(|| medications.join(", "), str::to_string);
            assessed(criterion, patient_value, any_of.join(" or "), hit.is_some())
        }

        CriterionRule::ExcludeMedication { any_of } => {
            let medications: Vec<&str> = profile.current_medications.iter().map(String::as_str).collect();
            if medications.is_empty() {
                return missing(criterion, "medication history");
            }
            let required = format!("none of: {}", any_of.join(", "));
            match first_mentioning(&medications, any_of) {
                Some(hit) => assessed(criterion, hit.to_string(), required, false),
                None => assessed(criterion, "not taking".to_string(), required, true),
            }
        }

        CriterionRule::Finding { any_of } => {
            if profile.findings.is_empty() {
                return missing(criterion, "clinical findings");
            }
            let hit = profile
                .findings
                .iter()
                .find(|finding| any_of.iter().any(|term| affirmed_in(finding, term)));
            let patient_value = hit.cloned().unwrap_or_else(|| "not documented in findings".to_string());
            assessed(criterion, patient_value, any_of.join(" or "), hit.is_some())
        }

        CriterionRule::Measurement { attribute, min, max } => {
            let key = attribute.trim().to_lowercase();
            match profile.measurements.get(&key) {
                None => missing(criterion, &key),
                Some(value) => {
                    let matched = min.map_or(true, |lo| *value >= lo) && max.map_or(true, |hi| *value <= hi);
                    assessed(criterion, format!("{key} {value}"), range_text(*min, *max, ""), matched)
                }
            }
        }
    }
}
