use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder reported when the caller did not supply a patient identifier.
pub const UNKNOWN_PATIENT_ID: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub name: String,
    /// Signed so that a negative age reaches the validator instead of failing
    /// deserialization with an opaque error.
    pub age: i64,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub patient_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub name: String,
    #[serde(default)]
    pub speciality: String,
    #[serde(default)]
    pub hospital: String,
}

/// A consultation as submitted by the caller. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    #[serde(default)]
    pub id: Option<String>,
    pub patient: Patient,
    pub doctor: Doctor,
    pub consultation_text: String,
    #[serde(default)]
    pub referral_reason: Option<String>,
    #[serde(default)]
    pub specialist_type: Option<String>,
}

impl Consultation {
    /// Caller-supplied id, or `CONSULT-<unix seconds>` when absent.
    pub fn consultation_id(&self, now: DateTime<Utc>) -> String {
        match non_blank(self.id.as_deref()) {
            Some(id) => id.to_string(),
            None => format!("CONSULT-{}", now.timestamp()),
        }
    }

    pub fn patient_id(&self) -> &str {
        non_blank(Some(&self.patient.patient_id)).unwrap_or(UNKNOWN_PATIENT_ID)
    }

    /// Explicit referral reason, ignoring blank strings.
    pub fn referral_reason(&self) -> Option<&str> {
        non_blank(self.referral_reason.as_deref())
    }

    pub fn specialist_type(&self) -> Option<&str> {
        non_blank(self.specialist_type.as_deref())
    }

    /// "Dr. Name, Speciality" as used on referral letters.
    pub fn referring_doctor(&self) -> String {
        match non_blank(Some(&self.doctor.speciality)) {
            Some(speciality) => format!("{}, {}", self.doctor.name.trim(), speciality),
            None => self.doctor.name.trim().to_string(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn consultation(text: &str) -> Consultation {
        Consultation {
            id: Some("CONSULT-TEST".into()),
            patient: Patient {
                name: "Arjun Reddy Patil".into(),
                age: 62,
                gender: "Male".into(),
                patient_id: "SYN-PT-10003".into(),
            },
            doctor: Doctor {
                name: "Dr. Meera Joshi".into(),
                speciality: "Pulmonology".into(),
                hospital: "Government District Hospital, Hyderabad".into(),
            },
            consultation_text: text.into(),
            referral_reason: None,
            specialist_type: None,
        }
    }
}
