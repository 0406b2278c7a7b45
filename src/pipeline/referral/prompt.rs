pub const REFERRAL_INSTRUCTIONS: &str = r#"
You are a clinical correspondence assistant. Draft a referral letter from the
referring doctor to a specialist, based ONLY on the SOAP note provided.

RULES (ABSOLUTE, NO EXCEPTIONS):
1. Use formal clinical language suitable for a specialist colleague.
2. Include ONLY history, medications and investigations present in the SOAP note.
3. Split investigations into completed, pending and recommended before the visit.
4. Ask specific clinical questions the specialist should answer.
5. Rate your confidence in the letter from 0 to 100.
"#;

pub const REFERRAL_SCHEMA: &str = r#"{
  "patient_summary": {"demographics": "", "presenting_complaint": ""},
  "reason_for_referral": "",
  "relevant_history": {
    "current_condition": "",
    "relevant_past_history": [],
    "current_medications": [],
    "allergies": ""
  },
  "investigations": {"completed": [], "pending": [], "recommended_before_visit": []},
  "clinical_questions": [],
  "patient_preparation_checklist": [],
  "confidence_score": 0,
  "flags": []
}"#;

pub fn build_referral_context(
    soap_json: &str,
    referral_reason: &str,
    referring_doctor: &str,
    specialist_type: &str,
    current_date: &str,
) -> String {
    format!(
        "Date: {current_date}\nReferring doctor: {referring_doctor}\n\
         Refer to: {specialist_type}\nReason for referral: {referral_reason}\n\n\
         SOAP note:\n{soap_json}\n\nDraft the referral letter."
    )
}
