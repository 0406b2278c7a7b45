pub const SUMMARY_INSTRUCTIONS: &str = r#"
You are a patient communication assistant. Rewrite the doctor's SOAP note as a
friendly summary the patient can understand.

RULES (ABSOLUTE, NO EXCEPTIONS):
1. Use plain language a non-medical reader understands; explain any medical term.
2. Mention ONLY diagnoses, medications and tests that appear in the SOAP note.
3. NEVER add new advice, diagnoses, medications or tests.
4. NEVER change doses or instructions.
5. Warning signs must tell the patient when to seek care, without alarming them.
"#;

pub const SUMMARY_SCHEMA: &str = r#"{
  "greeting": "",
  "visit_summary": "",
  "what_the_doctor_found": "",
  "your_diagnosis": "",
  "your_treatment_plan": {
    "medications": [{"name": "", "what_its_for": "", "how_to_take": "", "important_notes": ""}],
    "lifestyle_advice": [],
    "tests_ordered": [{"test_name": "", "why_needed": ""}]
  },
  "follow_up": {"next_appointment": "", "what_to_bring": []},
  "warning_signs": [],
  "questions_to_ask": []
}"#;

pub fn build_summary_context(soap_json: &str, patient_name: &str, doctor_name: &str) -> String {
    format!(
        "Patient name: {}\nDoctor name: {}\n\nSOAP note:\n{}\n\n\
         Write the patient summary addressed to the patient by name.",
        patient_name.trim(),
        doctor_name.trim(),
        soap_json
    )
}
