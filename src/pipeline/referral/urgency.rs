//! Urgency classification for referral letters.
//!
//! Ordered rule registry: emergency rules first, then urgent, then routine.
//! The first rule whose keywords are affirmed in any source wins. The model's
//! own urgency opinion is never consulted.

use crate::models::{Urgency, UrgencyLevel};
use crate::pipeline::text::find_affirmed;

/// A hard-coded urgency rule.
struct UrgencyRule {
    /// Unique identifier, quoted in the reasoning.
    id: &'static str,
    level: UrgencyLevel,
    keywords: &'static [&'static str],
    /// Short clinical rationale, quoted in the reasoning.
    rationale: &'static str,
}

// ── Keyword sets ────────────────────────────────────────────

static ACUTE_EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency", "life-threatening", "life threatening", "immediate transfer",
    "transfer immediately", "critical finding", "critically ill",
    "stemi", "acute coronary syndrome", "myocardial infarction", "stroke", "hemiparesis",
    "thunderclap", "subarachnoid", "sepsis", "septic shock", "haemorrhage", "hemorrhage",
    "respiratory failure", "cord compression", "unconscious", "status epilepticus",
];

static SUSPECTED_MALIGNANCY_KEYWORDS: &[&str] = &[
    "suspicious", "malignancy", "malignant", "cancer", "carcinoma", "tumour", "tumor",
    "metastasis", "metastatic", "mass",
];

static UNRESOLVED_IMAGING_KEYWORDS: &[&str] = &[
    "opacity", "nodule", "lesion", "shadow", "consolidation not resolving",
];

static EXPLICIT_URGENCY_KEYWORDS: &[&str] = &[
    "urgent", "urgently", "asap", "rapidly progressive", "rapidly worsening",
    "significant weight loss", "red flag",
];

static ELECTIVE_KEYWORDS: &[&str] = &[
    "elective", "routine", "follow-up", "follow up", "optimization", "optimisation",
    "second opinion", "evaluation", "management",
];

// ── Rule registry ───────────────────────────────────────────

/// Build the ordered rule set. Emergency rules first, then Urgent, then Routine.
fn rules() -> [UrgencyRule; 5] {
    [
        // EMG-001: acute, time-critical presentation
        UrgencyRule {
            id: "EMG-001",
            level: UrgencyLevel::Emergency,
            keywords: ACUTE_EMERGENCY_KEYWORDS,
            rationale: "acute time-critical presentation",
        },
        // URG-001: possible malignancy pending workup
        UrgencyRule {
            id: "URG-001",
            level: UrgencyLevel::Urgent,
            keywords: SUSPECTED_MALIGNANCY_KEYWORDS,
            rationale: "suspicious finding pending further workup",
        },
        // URG-002: unresolved imaging abnormality
        UrgencyRule {
            id: "URG-002",
            level: UrgencyLevel::Urgent,
            keywords: UNRESOLVED_IMAGING_KEYWORDS,
            rationale: "unresolved imaging abnormality",
        },
        // URG-003: clinician-stated urgency or red-flag progression
        UrgencyRule {
            id: "URG-003",
            level: UrgencyLevel::Urgent,
            keywords: EXPLICIT_URGENCY_KEYWORDS,
            rationale: "documented urgency or rapid progression",
        },
        // RTN-001: elective review
        UrgencyRule {
            id: "RTN-001",
            level: UrgencyLevel::Routine,
            keywords: ELECTIVE_KEYWORDS,
            rationale: "elective specialist review",
        },
    ]
}

/// Rule id used when nothing in the sources matches.
pub const FALLBACK_RULE_ID: &str = "RTN-000";

/// Texts the rules are evaluated against, in scan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrgencySources<'a> {
    pub referral_reason: Option<&'a str>,
    pub assessment_and_plan: &'a str,
    pub objective_findings: &'a str,
}

impl<'a> UrgencySources<'a> {
    fn in_scan_order(&self) -> impl Iterator<Item = &'a str> {
        self.referral_reason
            .into_iter()
            .chain([self.assessment_and_plan, self.objective_findings])
            .filter(|s| !s.trim().is_empty())
    }
}

/// Classify referral urgency. Deterministic for identical sources.
pub fn classify_urgency(sources: &UrgencySources<'_>) -> Urgency {
    for rule in rules() {
        for text in sources.in_scan_order() {
            if let Some((_, sentence)) = find_affirmed(text, rule.keywords) {
                tracing::debug!(rule_id = rule.id, level = rule.level.as_str(), "Urgency rule fired");
                return Urgency {
                    level: rule.level,
                    reasoning: format!("{} ({}): \"{}\"", rule.id, rule.rationale, sentence),
                };
            }
        }
    }

    Urgency {
        level: UrgencyLevel::Routine,
        reasoning: format!("{FALLBACK_RULE_ID} (no escalating findings documented): elective specialist referral"),
    }
}
