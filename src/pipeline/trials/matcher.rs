use std::cmp::Ordering;

use super::catalog::TrialCatalog;
use super::criteria::{evaluate, CriterionOutcome};
use super::profile::PatientProfile;
use crate::models::{ClinicalTrial, Consultation, SoapNote, TrialMatch, TrialMatches, TRIAL_DISCLAIMER};
use crate::pipeline::StageError;

/// Flag carried by the empty result that replaces a failed catalog lookup.
pub const FLAG_CATALOG_UNAVAILABLE: &str = "trial_catalog_unavailable";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchSettings {
    /// Upper bound on returned trials.
    pub max_results: usize,
    /// Trials scoring below this are dropped.
    pub min_confidence: f32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_confidence: 0.0,
        }
    }
}

/// `(matched / resolvable) × (0.5 + 0.5 × resolvable / total)`, rounded to
/// two decimals; 0 when nothing is resolvable.
pub fn trial_confidence(matched: usize, unmatched: usize, missing: usize) -> f32 {
    let resolvable = matched + unmatched;
    let total = resolvable + missing;
    if resolvable == 0 {
        return 0.0;
    }
    let proportion = matched as f32 / resolvable as f32;
    let coverage = 0.5 + 0.5 * (resolvable as f32 / total as f32);
    ((proportion * coverage) * 100.0).round() / 100.0
}

/// Evaluate every criterion of `trial`; each lands in exactly one bucket.
pub fn evaluate_trial(trial: &ClinicalTrial, profile: &PatientProfile) -> TrialMatch {
    let mut matched_criteria = Vec::new();
    let mut unmatched_criteria = Vec::new();
    let mut missing_information = Vec::new();

    for criterion in &trial.criteria {
        match evaluate(criterion, profile) {
            CriterionOutcome::Matched(a) => matched_criteria.push(a),
            CriterionOutcome::Unmatched(a) => unmatched_criteria.push(a),
            CriterionOutcome::Missing(note) => missing_information.push(note),
        }
    }

    let confidence_score = trial_confidence(
        matched_criteria.len(),
        unmatched_criteria.len(),
        missing_information.len(),
    );

    TrialMatch {
        trial_id: trial.trial_id.clone(),
        trial_title: trial.title.clone(),
        trial_phase: trial.phase.clone(),
        sponsor: trial.sponsor.clone(),
        enrollment_status: trial.enrollment_status.clone(),
        matched_criteria,
        unmatched_criteria,
        missing_information,
        confidence_score,
        locations: trial.locations.clone(),
        contact_info: trial.contact_info.clone(),
    }
}

fn by_rank(a: &TrialMatch, b: &TrialMatch) -> Ordering {
    b.confidence_score
        .total_cmp(&a.confidence_score)
        .then_with(|| a.trial_id.cmp(&b.trial_id))
}

/// Filter by minimum confidence, sort by confidence descending then id
/// ascending, and cap the list.
pub fn rank(mut matches: Vec<TrialMatch>, settings: &MatchSettings) -> Vec<TrialMatch> {
    matches.retain(|m| m.confidence_score >= settings.min_confidence);
    matches.sort_by(by_rank);
    matches.truncate(settings.max_results);
    matches
}

fn summarize(matches: &[TrialMatch], profile: &PatientProfile) -> String {
    let condition = profile
        .primary_diagnosis
        .as_deref()
        .unwrap_or("the documented conditions");
    if matches.is_empty() {
        return format!("No potential clinical trial matches found for {condition}.");
    }
    let eligible = matches.iter().filter(|m| m.is_fully_eligible()).count();
    let incomplete = matches.iter().filter(|m| !m.missing_information.is_empty()).count();
    let mut summary = format!(
        "Found {} potential clinical trial signal{} for {condition}; {eligible} with all evaluated criteria met.",
        matches.len(),
        if matches.len() == 1 { "" } else { "s" },
    );
    if incomplete > 0 {
        summary.push_str(&format!(
            " {incomplete} need{} more information before eligibility can be confirmed.",
            if incomplete == 1 { "s" } else { "" }
        ));
    }
    summary
}

/// Trial Matcher: profile extraction, catalog lookup, criterion evaluation
/// and ranking.
pub struct TrialMatcher<'a> {
    catalog: &'a dyn TrialCatalog,
    settings: MatchSettings,
}

impl<'a> TrialMatcher<'a> {
    pub fn new(catalog: &'a dyn TrialCatalog, settings: MatchSettings) -> Self {
        Self { catalog, settings }
    }

    pub async fn match_trials(
        &self,
        consultation: &Consultation,
        note: &SoapNote,
    ) -> Result<TrialMatches, StageError> {
        let profile = PatientProfile::extract(consultation, note);
        let candidates = self.catalog.search(&profile).await?;

        let evaluated: Vec<TrialMatch> = candidates
            .iter()
            .map(|trial| evaluate_trial(trial, &profile))
            .collect();
        let trial_matches = rank(evaluated, &self.settings);

        tracing::debug!(
            candidates = candidates.len(),
            returned = trial_matches.len(),
            "Trial matching complete"
        );

        Ok(TrialMatches {
            patient_profile_extracted: profile.to_attribute_map(),
            summary: summarize(&trial_matches, &profile),
            trial_matches,
            disclaimer: TRIAL_DISCLAIMER.to_string(),
            flags: Vec::new(),
        })
    }
}
