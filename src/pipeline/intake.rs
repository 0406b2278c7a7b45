//! Narrative Validator: precondition gate for a consultation, plus the
//! sanitized copy of the narrative that is handed to the generation capability.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::models::Consultation;

/// Shortest narrative that can plausibly carry a clinical encounter.
pub const MIN_NARRATIVE_CHARS: usize = 10;

/// Longest narrative accepted in one run.
pub const MAX_NARRATIVE_CHARS: usize = 20_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("consultation_text must not be empty")]
    EmptyNarrative,

    #[error("consultation_text is too short ({chars} characters, minimum {min})")]
    NarrativeTooShort { chars: usize, min: usize },

    #[error("consultation_text is too long ({chars} characters, maximum {max})")]
    NarrativeTooLong { chars: usize, max: usize },

    #[error("patient.name must not be empty")]
    MissingPatientName,

    #[error("patient.age must be a non-negative integer (got {0})")]
    InvalidAge(i64),
}

/// Reject a consultation that cannot be processed. Never mutates its input.
pub fn validate(consultation: &Consultation) -> Result<(), ValidationError> {
    let text = consultation.consultation_text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyNarrative);
    }

    let chars = text.chars().count();
    if chars < MIN_NARRATIVE_CHARS {
        return Err(ValidationError::NarrativeTooShort {
            chars,
            min: MIN_NARRATIVE_CHARS,
        });
    }
    if chars > MAX_NARRATIVE_CHARS {
        return Err(ValidationError::NarrativeTooLong {
            chars,
            max: MAX_NARRATIVE_CHARS,
        });
    }

    if consultation.patient.name.trim().is_empty() {
        return Err(ValidationError::MissingPatientName);
    }
    if consultation.patient.age < 0 {
        return Err(ValidationError::InvalidAge(consultation.patient.age));
    }

    Ok(())
}

/// Copy of the narrative safe to embed in a prompt frame.
///
/// Strips control characters (keeping newline and tab) and any literal
/// `<consultation>` delimiter tags.
pub fn sanitize_narrative(text: &str) -> String {
    static DELIMITER_TAGS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)</?\s*consultation\s*>").expect("Invalid delimiter pattern"));

    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();
    DELIMITER_TAGS.replace_all(&cleaned, "").trim().to_string()
}
