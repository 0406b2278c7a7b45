use crate::models::Consultation;

pub const SOAP_INSTRUCTIONS: &str = r#"
You are a clinical documentation assistant. Your ONLY role is to convert a
doctor's consultation narrative into a structured SOAP note.

RULES (ABSOLUTE, NO EXCEPTIONS):
1. Extract ONLY information explicitly stated in the narrative.
2. NEVER invent vitals, investigations, doses or diagnoses.
3. If a field is not mentioned, use an empty string or an empty list.
4. Preserve exact values (doses, lab values, vitals) verbatim.
5. Rate your confidence for each section from 0 to 100.
6. List data-quality concerns (missing or contradictory information) in "flags".
"#;

pub const SOAP_SCHEMA: &str = r#"{
  "subjective": {
    "chief_complaint": "",
    "history_of_present_illness": "",
    "review_of_systems": {"relevant_positives": [], "relevant_negatives": []},
    "past_medical_history": [],
    "medications": [],
    "allergies": []
  },
  "objective": {
    "vitals": {"BP": "", "HR": "", "Temp": "", "SpO2": ""},
    "physical_exam": {"general": "", "systems_examined": [{"system": "", "findings": ""}]},
    "investigations": []
  },
  "assessment": {
    "primary_diagnosis": "",
    "secondary_diagnoses": [],
    "clinical_reasoning": ""
  },
  "plan": {
    "medications_prescribed": [{"name": "", "dosage": "", "frequency": "", "duration": ""}],
    "investigations_ordered": [],
    "procedures_planned": [],
    "referrals": [],
    "follow_up": "",
    "patient_education": []
  },
  "confidence_scores": {"subjective": 0, "objective": 0, "assessment": 0, "plan": 0},
  "flags": []
}"#;

/// Patient context plus the delimited, already-sanitized narrative.
pub fn build_soap_context(consultation: &Consultation, narrative: &str) -> String {
    let patient = &consultation.patient;
    let gender = if patient.gender.trim().is_empty() {
        "not stated"
    } else {
        patient.gender.trim()
    };
    format!(
        "Patient: {}, {} years, {}, ID {}\n\n<consultation>\n{}\n</consultation>\n\n\
         Convert the above consultation into a SOAP note.",
        patient.name.trim(),
        patient.age,
        gender,
        consultation.patient_id(),
        narrative
    )
}
