use serde_json::Value;

use super::grounding::enforce_grounding;
use super::prompt::{build_summary_context, SUMMARY_INSTRUCTIONS, SUMMARY_SCHEMA};
use crate::models::{Consultation, PatientSummary, SoapNote, PATIENT_SUMMARY_DISCLAIMER};
use crate::pipeline::generation::parser::{from_value_lenient, string_list};
use crate::pipeline::generation::{generate_json, GenerationRequest, GenerationTask, LlmClient};
use crate::pipeline::soap::confidence::dedup_preserving_order;
use crate::pipeline::StageError;

/// Flag carried by the empty summary that replaces a failed stage.
pub const FLAG_SUMMARY_FAILED: &str = "summary_generation_failed";

/// Summary Generator: SOAP note → lay-language patient summary.
pub struct SummaryGenerator<'a> {
    llm: &'a dyn LlmClient,
    max_retries: u32,
}

impl<'a> SummaryGenerator<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_retries: u32) -> Self {
        Self { llm, max_retries }
    }

    pub async fn generate(
        &self,
        consultation: &Consultation,
        note: &SoapNote,
    ) -> Result<PatientSummary, StageError> {
        let soap_json = serde_json::to_string_pretty(note)
            .map_err(|e| StageError::Contract(format!("SOAP note not serializable: {e}")))?;
        let request = GenerationRequest {
            task: GenerationTask::PatientSummary,
            instructions: SUMMARY_INSTRUCTIONS,
            schema: SUMMARY_SCHEMA,
            context: build_summary_context(
                &soap_json,
                &consultation.patient.name,
                &consultation.doctor.name,
            ),
        };

        let raw = generate_json(self.llm, &request, self.max_retries).await?;
        let mut summary = read_summary(&raw, &consultation.patient.name);

        let grounding_flags = enforce_grounding(&mut summary, note);
        if !grounding_flags.is_empty() {
            tracing::warn!(
                removed = grounding_flags.len(),
                "Patient summary contained entries absent from the SOAP note"
            );
        }
        summary.flags.extend(grounding_flags);
        summary.flags = dedup_preserving_order(std::mem::take(&mut summary.flags));

        Ok(summary)
    }
}

fn text(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Field-by-field lenient read; a mistyped field falls back to empty
/// without discarding its siblings. The disclaimer is always the fixed one.
fn read_summary(raw: &Value, patient_name: &str) -> PatientSummary {
    let greeting = match text(raw, "greeting") {
        g if g.is_empty() => format!("Dear {},", patient_name.trim()),
        g => g,
    };

    PatientSummary {
        greeting,
        visit_summary: text(raw, "visit_summary"),
        what_the_doctor_found: text(raw, "what_the_doctor_found"),
        your_diagnosis: text(raw, "your_diagnosis"),
        your_treatment_plan: from_value_lenient(raw.get("your_treatment_plan")),
        follow_up: from_value_lenient(raw.get("follow_up")),
        warning_signs: string_list(raw.get("warning_signs")),
        questions_to_ask: string_list(raw.get("questions_to_ask")),
        disclaimer: PATIENT_SUMMARY_DISCLAIMER.to_string(),
        flags: string_list(raw.get("flags")),
    }
}
