use chrono::NaiveDate;
use serde_json::Value;

use super::decision::{referral_trigger, ReferralTrigger};
use super::prompt::{build_referral_context, REFERRAL_INSTRUCTIONS, REFERRAL_SCHEMA};
use super::urgency::{classify_urgency, UrgencySources};
use crate::models::{Consultation, ReferralLetter, ReferralOutcome, SoapNote};
use crate::pipeline::generation::parser::{from_value_lenient, normalize_confidence, string_list};
use crate::pipeline::generation::{generate_json, GenerationRequest, GenerationTask, LlmClient};
use crate::pipeline::soap::confidence::dedup_preserving_order;
use crate::pipeline::StageError;

/// Flag carried by the null letter that replaces a failed stage.
pub const FLAG_REFERRAL_FAILED: &str = "referral_generation_failed";

/// Recipient used when the caller names no specialist.
pub const DEFAULT_SPECIALIST: &str = "Specialist";

/// Keys the drafter owns; model values for them are discarded.
const DRAFTER_OWNED_KEYS: &[&str] = &["date", "to", "from", "urgency"];

/// Referral Drafter: decides whether a referral is warranted and drafts it.
pub struct ReferralDrafter<'a> {
    llm: &'a dyn LlmClient,
    max_retries: u32,
}

impl<'a> ReferralDrafter<'a> {
    pub fn new(llm: &'a dyn LlmClient, max_retries: u32) -> Self {
        Self { llm, max_retries }
    }

    pub async fn draft(
        &self,
        consultation: &Consultation,
        note: &SoapNote,
        today: NaiveDate,
    ) -> Result<ReferralOutcome, StageError> {
        let decision_confidence = note.confidence_scores.decision_confidence();

        let Some(trigger) = referral_trigger(consultation, note) else {
            tracing::debug!("No referral indicated");
            return Ok(ReferralOutcome::not_indicated(decision_confidence));
        };

        let specialist = consultation.specialist_type().unwrap_or(DEFAULT_SPECIALIST);
        let reason = trigger.evidence().to_string();
        let date = today.format("%Y-%m-%d").to_string();
        let soap_json = serde_json::to_string_pretty(note)
            .map_err(|e| StageError::Contract(format!("SOAP note not serializable: {e}")))?;

        let request = GenerationRequest {
            task: GenerationTask::ReferralLetter,
            instructions: REFERRAL_INSTRUCTIONS,
            schema: REFERRAL_SCHEMA,
            context: build_referral_context(
                &soap_json,
                &reason,
                &consultation.referring_doctor(),
                specialist,
                &date,
            ),
        };

        let mut raw = generate_json(self.llm, &request, self.max_retries).await?;
        let model_confidence = raw.get("confidence_score").and_then(normalize_confidence);
        let flags = dedup_preserving_order(string_list(raw.get("flags")));
        if let Some(object) = raw.as_object_mut() {
            for key in DRAFTER_OWNED_KEYS {
                object.remove(*key);
            }
        }

        let mut letter = read_letter(&raw);
        letter.date = date;
        letter.to = format!("The {specialist}");
        letter.from = consultation.referring_doctor();
        fill_gaps(&mut letter, consultation, note, &trigger);

        let assessment_and_plan = format!("{}. {}", note.assessment_text(), note.plan_text());
        let objective_findings = note.objective_text();
        letter.urgency = classify_urgency(&UrgencySources {
            referral_reason: consultation.referral_reason(),
            assessment_and_plan: &assessment_and_plan,
            objective_findings: &objective_findings,
        });

        tracing::info!(
            urgency = letter.urgency.level.as_str(),
            specialist = specialist,
            "Referral letter drafted"
        );

        let confidence_score = model_confidence
            .unwrap_or(decision_confidence)
            .min(decision_confidence)
            .clamp(0.0, 1.0);

        Ok(ReferralOutcome {
            referral_letter: Some(letter),
            message: None,
            confidence_score,
            flags,
        })
    }
}

fn text(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn read_letter(raw: &Value) -> ReferralLetter {
    ReferralLetter {
        patient_summary: from_value_lenient(raw.get("patient_summary")),
        reason_for_referral: text(raw, "reason_for_referral"),
        relevant_history: from_value_lenient(raw.get("relevant_history")),
        investigations: from_value_lenient(raw.get("investigations")),
        clinical_questions: string_list(raw.get("clinical_questions")),
        patient_preparation_checklist: string_list(raw.get("patient_preparation_checklist")),
        ..ReferralLetter::default()
    }
}

/// Fill fields the model left empty from the consultation and SOAP note.
fn fill_gaps(
    letter: &mut ReferralLetter,
    consultation: &Consultation,
    note: &SoapNote,
    trigger: &ReferralTrigger,
) {
    let patient = &consultation.patient;
    if letter.patient_summary.demographics.is_empty() {
        let gender = patient.gender.trim().to_lowercase();
        letter.patient_summary.demographics = if gender.is_empty() {
            format!("{}, {}-year-old", patient.name.trim(), patient.age)
        } else {
            format!("{}, {}-year-old {}", patient.name.trim(), patient.age, gender)
        };
    }
    if letter.patient_summary.presenting_complaint.is_empty() {
        letter.patient_summary.presenting_complaint = note.subjective.chief_complaint.clone();
    }
    if letter.reason_for_referral.is_empty() {
        letter.reason_for_referral = trigger.evidence().to_string();
    }
    if letter.relevant_history.current_condition.is_empty() {
        letter.relevant_history.current_condition = note.assessment.primary_diagnosis.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::consultation::fixtures as consultations;
    use crate::models::soap::fixtures as notes;
    use crate::models::{UrgencyLevel, NO_REFERRAL_MESSAGE};
    use crate::pipeline::generation::{GenerationError, MockLlmClient};

    const LETTER_JSON: &str = r#"{
        "date": "1999-01-01",
        "to": "Someone else",
        "patient_summary": {"demographics": "62-year-old male", "presenting_complaint": "Breathlessness"},
        "reason_for_referral": "Evaluation of suspicious right upper lobe opacity",
        "relevant_history": {"current_condition": "Severe COPD", "relevant_past_history": ["Treated TB"], "current_medications": ["Tiotropium"], "allergies": "NKDA"},
        "investigations": {"completed": ["Chest X-ray"], "pending": ["HRCT chest"], "recommended_before_visit": ["PET-CT"]},
        "clinical_questions": ["Is biopsy indicated?"],
        "urgency": {"level": "routine", "reasoning": "model opinion"},
        "patient_preparation_checklist": ["Bring X-ray films"],
        "confidence_score": 95,
        "flags": ["verify_tb_history", "verify_tb_history"]
    }"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[tokio::test]
    async fn routine_note_returns_null_letter_without_model_call() {
        let llm = MockLlmClient::new();
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let note = notes::routine_diabetes();
        let outcome = ReferralDrafter::new(&llm, 2)
            .draft(&consultation, &note, today())
            .await
            .unwrap();

        assert!(outcome.referral_letter.is_none());
        assert_eq!(outcome.message.as_deref(), Some(NO_REFERRAL_MESSAGE));
        assert!((outcome.confidence_score - 0.9).abs() < 1e-6);
        assert_eq!(llm.call_count(GenerationTask::ReferralLetter), 0);
    }

    #[tokio::test]
    async fn obesity_with_bmi_stays_without_letter() {
        let llm = MockLlmClient::new();
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let mut note = notes::routine_diabetes();
        note.assessment.secondary_diagnoses.push("Obesity, body mass index 32".into());
        let outcome = ReferralDrafter::new(&llm, 2)
            .draft(&consultation, &note, today())
            .await
            .unwrap();

        assert!(outcome.referral_letter.is_none());
        assert_eq!(llm.call_count(GenerationTask::ReferralLetter), 0);
    }

    #[tokio::test]
    async fn suspicious_opacity_yields_urgent_letter_with_drafter_fields() {
        let llm = MockLlmClient::new().with_response(GenerationTask::ReferralLetter, LETTER_JSON);
        let mut consultation = consultations::consultation("Breathless for six months.");
        consultation.specialist_type = Some("Oncologist".into());
        let outcome = ReferralDrafter::new(&llm, 2)
            .draft(&consultation, &notes::copd_with_opacity(), today())
            .await
            .unwrap();

        let letter = outcome.referral_letter.unwrap();
        assert_eq!(letter.date, "2024-03-15");
        assert_eq!(letter.to, "The Oncologist");
        assert_eq!(letter.from, "Dr. Meera Joshi, Pulmonology");
        assert_eq!(letter.urgency.level, UrgencyLevel::Urgent);
        assert!(letter.urgency.reasoning.contains("opacity"));
        assert_eq!(letter.investigations.pending, vec!["HRCT chest"]);
        assert_eq!(outcome.flags, vec!["verify_tb_history"]);
        // Model's 0.95 is capped by mean(assessment 0.8, plan 0.9).
        assert!((outcome.confidence_score - 0.85).abs() < 1e-6);
        assert!(outcome.message.is_none());
    }

    #[tokio::test]
    async fn missing_fields_filled_from_note() {
        let llm = MockLlmClient::new().with_response(GenerationTask::ReferralLetter, "{}");
        let consultation = consultations::consultation("Breathless for six months.");
        let outcome = ReferralDrafter::new(&llm, 0)
            .draft(&consultation, &notes::copd_with_opacity(), today())
            .await
            .unwrap();

        let letter = outcome.referral_letter.unwrap();
        assert_eq!(letter.to, "The Specialist");
        assert_eq!(letter.patient_summary.demographics, "Arjun Reddy Patil, 62-year-old male");
        assert_eq!(letter.reason_for_referral, "Oncology for evaluation of the lung opacity");
        assert_eq!(letter.relevant_history.current_condition, "Severe COPD, GOLD Stage 3");
    }

    #[tokio::test]
    async fn generation_failure_is_stage_error() {
        let llm = MockLlmClient::new().with_response(GenerationTask::ReferralLetter, "not json");
        let consultation = consultations::consultation("Breathless for six months.");
        let result = ReferralDrafter::new(&llm, 1)
            .draft(&consultation, &notes::copd_with_opacity(), today())
            .await;
        assert!(matches!(
            result,
            Err(StageError::Generation(GenerationError::MalformedResponse(_)))
        ));
    }
}
