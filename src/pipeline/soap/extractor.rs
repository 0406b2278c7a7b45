use thiserror::Error;

use super::confidence::{narrative_mentions_vitals, quality_flags, score_sections};
use super::normalize::normalize;
use super::prompt::{build_soap_context, SOAP_INSTRUCTIONS, SOAP_SCHEMA};
use crate::models::{Consultation, SoapNote};
use crate::pipeline::generation::{
    generate_json, GenerationError, GenerationRequest, GenerationTask, LlmClient,
};
use crate::pipeline::intake::sanitize_narrative;

/// Mandatory-stage failure: no usable SOAP structure could be produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractionError {
    #[error("SOAP note extraction failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Section Extractor: narrative → scored, flagged SOAP note.
pub struct SectionExtractor<'a> {
    llm: &'a dyn LlmClient,
    max_retries: u32,
}

impl<'a> SectionExtractor<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_retries: u32) -> Self {
        Self { llm, max_retries }
    }

    pub async fn extract(&self, consultation: &Consultation) -> Result<SoapNote, ExtractionError> {
        let narrative = sanitize_narrative(&consultation.consultation_text);
        let request = GenerationRequest {
            task: GenerationTask::SoapNote,
            instructions: SOAP_INSTRUCTIONS,
            schema: SOAP_SCHEMA,
            context: build_soap_context(consultation, &narrative),
        };

        let raw = generate_json(self.llm, &request, self.max_retries).await?;
        let normalized = normalize(&raw);

        let vitals_verified = narrative_mentions_vitals(&narrative);
        let scores = score_sections(&normalized, vitals_verified);
        let flags = quality_flags(&normalized, &scores, vitals_verified);

        tracing::debug!(
            missing_fields = normalized.missing.len(),
            flags = flags.len(),
            lowest_confidence = scores.lowest(),
            "SOAP note extracted"
        );

        let mut note = normalized.note;
        note.confidence_scores = scores;
        note.flags = flags;
        Ok(note)
    }
}
