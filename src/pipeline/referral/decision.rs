use crate::models::{Consultation, SoapNote};
use crate::pipeline::text::find_affirmed;

static REFERRAL_TERMS: &[&str] = &[
    "refer", "referral", "referred", "specialist opinion", "specialist evaluation",
    "specialist review",
];

static UNRESOLVED_FINDING_TERMS: &[&str] = &[
    "suspicious", "concerning", "needs further evaluation", "requires further evaluation",
    "opacity", "mass", "nodule", "lesion", "rule out",
];

/// Why a referral is warranted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralTrigger {
    /// The caller supplied an explicit reason.
    ExplicitReason(String),
    /// The plan lists at least one referral.
    PlannedReferral(String),
    /// Assessment or plan text uses referral language.
    ReferralLanguage(String),
    /// Assessment or plan text reports a finding that needs specialist input.
    UnresolvedFinding(String),
}

impl ReferralTrigger {
    /// Text that motivated the referral, used when the model gives no reason.
    pub fn evidence(&self) -> &str {
        match self {
            Self::ExplicitReason(s)
            | Self::PlannedReferral(s)
            | Self::ReferralLanguage(s)
            | Self::UnresolvedFinding(s) => s,
        }
    }
}

/// Decide whether a referral is warranted. `None` means no referral.
pub fn referral_trigger(consultation: &Consultation, note: &SoapNote) -> Option<ReferralTrigger> {
    if let Some(reason) = consultation.referral_reason() {
        return Some(ReferralTrigger::ExplicitReason(reason.to_string()));
    }

    if let Some(planned) = note.plan.referrals.iter().find(|r| !r.trim().is_empty()) {
        return Some(ReferralTrigger::PlannedReferral(planned.trim().to_string()));
    }

    let text = format!("{}. {}", note.assessment_text(), note.plan_text());
    if let Some((_, sentence)) = find_affirmed(&text, REFERRAL_TERMS) {
        return Some(ReferralTrigger::ReferralLanguage(sentence.to_string()));
    }
    find_affirmed(&text, UNRESOLVED_FINDING_TERMS)
        .map(|(_, sentence)| ReferralTrigger::UnresolvedFinding(sentence.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::consultation::fixtures as consultations;
    use crate::models::soap::fixtures as notes;

    #[test]
    fn routine_diabetes_needs_no_referral() {
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        assert_eq!(referral_trigger(&consultation, &notes::routine_diabetes()), None);
    }

    #[test]
    fn explicit_reason_wins() {
        let mut consultation = consultations::consultation("Diabetes follow-up visit today.");
        consultation.referral_reason = Some("Retinal screening".into());
        assert_eq!(
            referral_trigger(&consultation, &notes::routine_diabetes()),
            Some(ReferralTrigger::ExplicitReason("Retinal screening".into()))
        );
    }

    #[test]
    fn planned_referral_triggers() {
        let consultation = consultations::consultation("Breathless for six months.");
        let trigger = referral_trigger(&consultation, &notes::copd_with_opacity()).unwrap();
        assert!(matches!(trigger, ReferralTrigger::PlannedReferral(ref s) if s.contains("Oncology")));
    }

    #[test]
    fn unresolved_finding_triggers_without_referral_list() {
        let consultation = consultations::consultation("Breathless for six months.");
        let mut note = notes::copd_with_opacity();
        note.plan.referrals.clear();
        let trigger = referral_trigger(&consultation, &note).unwrap();
        assert!(matches!(trigger, ReferralTrigger::UnresolvedFinding(ref s) if s.contains("opacity")));
    }

    #[test]
    fn referral_language_in_plan_triggers() {
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let mut note = notes::routine_diabetes();
        note.plan.follow_up = "Refer to ophthalmology for retinal screening".into();
        let trigger = referral_trigger(&consultation, &note).unwrap();
        assert!(matches!(trigger, ReferralTrigger::ReferralLanguage(_)));
    }

    #[test]
    fn negated_referral_language_ignored() {
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let mut note = notes::routine_diabetes();
        note.assessment.clinical_reasoning = "No suspicious lesion. Referral not required".into();
        assert_eq!(referral_trigger(&consultation, &note), None);
    }

    #[test]
    fn body_mass_index_is_not_an_unresolved_finding() {
        let consultation = consultations::consultation("Diabetes follow-up visit today.");
        let mut note = notes::routine_diabetes();
        note.assessment.secondary_diagnoses.push("Obesity, body mass index 32".into());
        assert_eq!(referral_trigger(&consultation, &note), None);
    }
}
