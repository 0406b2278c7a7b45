use std::sync::LazyLock;

use regex::Regex;

use super::normalize::NormalizedSoap;
use crate::models::{SectionConfidence, SoapNote, SoapSection};
use crate::pipeline::text::shares_token;

/// Confidence thresholds used by the extractor and downstream stages
pub mod thresholds {
    /// Below this a section is flagged `low_confidence:<section>`.
    pub const LOW_CONFIDENCE: f32 = 0.60;

    /// Assumed model certainty when it reports none.
    pub const DEFAULT_MODEL_CONFIDENCE: f32 = 0.85;

    /// Objective ceiling when vitals are absent or not backed by the narrative.
    pub const NO_VITALS_CAP: f32 = 0.45;

    /// Coverage score of a section with nothing populated.
    pub const COVERAGE_FLOOR: f32 = 0.30;

    /// Deducted per required field the model omitted or mistyped.
    pub const MISSING_FIELD_PENALTY: f32 = 0.10;
}

pub const FLAG_MISSING_VITALS: &str = "missing_vitals";
pub const FLAG_UNVERIFIED_VITALS: &str = "unverified_vitals";
pub const FLAG_MISSING_PRIMARY_DIAGNOSIS: &str = "missing_primary_diagnosis";

static VITAL_SIGN_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:bp|blood\s+pressure|pulse|heart\s+rate|hr|temp|temperature|febrile|afebrile|spo2|sp02|o2\s+sat|oxygen\s+saturation|saturation|rr|respiratory\s+rate|bmi|weight|\d{2,3}\s*/\s*\d{2,3}\s*mm\s*hg)\b",
    )
    .expect("Invalid vital sign pattern")
});

/// Whether the narrative itself reports any vital sign.
pub fn narrative_mentions_vitals(narrative: &str) -> bool {
    VITAL_SIGN_MENTION.is_match(narrative)
}

/// (populated, expected) field counts for a section.
pub fn coverage(note: &SoapNote, section: SoapSection) -> (usize, usize) {
    let checks: Vec<bool> = match section {
        SoapSection::Subjective => {
            let s = &note.subjective;
            vec![
                !s.chief_complaint.is_empty(),
                !s.history_of_present_illness.is_empty(),
                !s.review_of_systems.relevant_positives.is_empty()
                    || !s.review_of_systems.relevant_negatives.is_empty(),
                !s.past_medical_history.is_empty(),
                !s.medications.is_empty(),
                !s.allergies.is_empty(),
            ]
        }
        SoapSection::Objective => {
            let o = &note.objective;
            vec![
                !o.vitals.is_empty(),
                !o.physical_exam.general.is_empty() || !o.physical_exam.systems_examined.is_empty(),
                !o.investigations.is_empty(),
            ]
        }
        SoapSection::Assessment => {
            let a = &note.assessment;
            vec![!a.primary_diagnosis.is_empty(), !a.clinical_reasoning.is_empty()]
        }
        SoapSection::Plan => {
            let p = &note.plan;
            vec![
                !p.follow_up.is_empty(),
                !p.patient_education.is_empty(),
                !p.medications_prescribed.is_empty()
                    || !p.investigations_ordered.is_empty()
                    || !p.procedures_planned.is_empty()
                    || !p.referrals.is_empty(),
            ]
        }
    };
    (checks.iter().filter(|c| **c).count(), checks.len())
}

/// `min(model, coverage) − penalty`, clamped to [0, 1].
pub fn section_confidence(model: Option<f32>, populated: usize, expected: usize, missing: usize) -> f32 {
    let ratio = if expected == 0 {
        0.0
    } else {
        populated as f32 / expected as f32
    };
    let coverage_score = thresholds::COVERAGE_FLOOR + (1.0 - thresholds::COVERAGE_FLOOR) * ratio;
    let model = model.unwrap_or(thresholds::DEFAULT_MODEL_CONFIDENCE);
    let penalty = thresholds::MISSING_FIELD_PENALTY * missing as f32;
    (model.min(coverage_score) - penalty).clamp(0.0, 1.0)
}

/// Score all four sections of a normalized note.
pub fn score_sections(normalized: &NormalizedSoap, vitals_verified: bool) -> SectionConfidence {
    let note = &normalized.note;
    let mut scores = SectionConfidence::default();
    for section in SoapSection::ALL {
        let (populated, expected) = coverage(note, section);
        let mut value = section_confidence(
            normalized.model_confidence_for(section),
            populated,
            expected,
            normalized.missing_in(section),
        );
        if section == SoapSection::Objective && (note.objective.vitals.is_empty() || !vitals_verified) {
            value = value.min(thresholds::NO_VITALS_CAP);
        }
        scores.set(section, value);
    }
    scores
}

/// Data-quality flags for a scored note, deduplicated in first-seen order.
pub fn quality_flags(normalized: &NormalizedSoap, scores: &SectionConfidence, vitals_verified: bool) -> Vec<String> {
    let note = &normalized.note;
    let mut flags: Vec<String> = normalized.model_flags.clone();

    flags.extend(
        normalized
            .missing
            .iter()
            .map(|(section, field)| format!("missing_field:{}.{}", section.as_str(), field)),
    );

    if note.objective.vitals.is_empty() {
        flags.push(FLAG_MISSING_VITALS.to_string());
    } else if !vitals_verified {
        flags.push(FLAG_UNVERIFIED_VITALS.to_string());
    }

    if note.assessment.primary_diagnosis.is_empty() {
        flags.push(FLAG_MISSING_PRIMARY_DIAGNOSIS.to_string());
    }

    for drug in &note.plan.medications_prescribed {
        if note.subjective.allergies.iter().any(|a| shares_token(&drug.name, a)) {
            flags.push(format!("allergy_conflict:{}", drug.name.to_lowercase()));
        }
    }

    for section in SoapSection::ALL {
        if scores.get(section) < thresholds::LOW_CONFIDENCE {
            flags.push(format!("low_confidence:{}", section.as_str()));
        }
    }

    dedup_preserving_order(flags)
}

pub fn dedup_preserving_order(flags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    flags.into_iter().filter(|f| seen.insert(f.clone())).collect()
}
