use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use super::profile::PatientProfile;
use crate::models::ClinicalTrial;
use crate::pipeline::text::shares_token;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("Cannot read trial catalog {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Invalid trial catalog {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Trial catalog unavailable: {0}")]
    Unavailable(String),
}

/// Trial catalog lookup: candidate trials with structured criteria for a
/// patient profile. The retrieval mechanism is the implementor's concern.
#[async_trait]
pub trait TrialCatalog: Send + Sync {
    async fn search(&self, profile: &PatientProfile) -> Result<Vec<ClinicalTrial>, CatalogError>;
}

/// Whether a trial studies any of the profile's diagnoses.
fn is_candidate(trial: &ClinicalTrial, profile: &PatientProfile) -> bool {
    let diagnoses = profile.all_diagnoses();
    trial
        .conditions
        .iter()
        .any(|condition| diagnoses.iter().any(|d| shares_token(condition, d)))
}

fn candidates(trials: &[ClinicalTrial], profile: &PatientProfile) -> Vec<ClinicalTrial> {
    trials
        .iter()
        .filter(|t| is_candidate(t, profile))
        .cloned()
        .collect()
}

/// Catalog file: a bare array of trials or `{"trials": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogFile {
    Bare(Vec<ClinicalTrial>),
    Wrapped { trials: Vec<ClinicalTrial> },
}

/// Trial catalog backed by a JSON file, re-read on every search so catalog
/// edits apply without a restart.
pub struct JsonTrialCatalog {
    path: PathBuf,
}

impl JsonTrialCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Vec<ClinicalTrial>, CatalogError> {
        let display = self.path.display().to_string();
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CatalogError::Read {
                path: display.clone(),
                reason: e.to_string(),
            })?;
        let file: CatalogFile = serde_json::from_str(&content).map_err(|e| CatalogError::Parse {
            path: display,
            reason: e.to_string(),
        })?;
        Ok(match file {
            CatalogFile::Bare(trials) | CatalogFile::Wrapped { trials } => trials,
        })
    }
}

#[async_trait]
impl TrialCatalog for JsonTrialCatalog {
    async fn search(&self, profile: &PatientProfile) -> Result<Vec<ClinicalTrial>, CatalogError> {
        let trials = self.load().await?;
        let found = candidates(&trials, profile);
        tracing::debug!(catalog_size = trials.len(), candidates = found.len(), "Trial catalog searched");
        Ok(found)
    }
}

/// In-memory catalog for tests and embedding.
pub struct InMemoryTrialCatalog {
    trials: Vec<ClinicalTrial>,
}

impl InMemoryTrialCatalog {
    pub fn new(trials: Vec<ClinicalTrial>) -> Self {
        Self { trials }
    }
}

#[async_trait]
impl TrialCatalog for InMemoryTrialCatalog {
    async fn search(&self, profile: &PatientProfile) -> Result<Vec<ClinicalTrial>, CatalogError> {
        Ok(candidates(&self.trials, profile))
    }
}

/// Catalog whose lookups always fail.
#[cfg(test)]
pub struct FailingCatalog;

#[cfg(test)]
#[async_trait]
impl TrialCatalog for FailingCatalog {
    async fn search(&self, _profile: &PatientProfile) -> Result<Vec<ClinicalTrial>, CatalogError> {
        Err(CatalogError::Unavailable("connection refused".into()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::models::{ClinicalTrial, CriterionRule, EligibilityCriterion};

    pub fn criterion(text: &str, rule: CriterionRule) -> EligibilityCriterion {
        EligibilityCriterion {
            criterion: text.into(),
            rule,
        }
    }

    pub fn trial(id: &str, conditions: &[&str], criteria: Vec<EligibilityCriterion>) -> ClinicalTrial {
        ClinicalTrial {
            trial_id: id.into(),
            title: format!("Trial {id}"),
            phase: "Phase 3".into(),
            sponsor: "Synthetic Sponsor".into(),
            enrollment_status: "Recruiting".into(),
            conditions: conditions.iter().map(|c| c.to_string()).collect(),
            locations: vec!["Hyderabad".into()],
            contact_info: None,
            criteria,
        }
    }

    /// COPD trial: age, diagnosis, FEV1 and an exclusion.
    pub fn copd_trial() -> ClinicalTrial {
        trial(
            "CTRI-COPD-001",
            &["COPD", "Chronic Obstructive Pulmonary Disease"],
            vec![
                criterion("Age 40-80 years", CriterionRule::AgeRange { min: Some(40), max: Some(80) }),
                criterion(
                    "Diagnosis of COPD",
                    CriterionRule::Diagnosis { any_of: vec!["copd".into(), "chronic obstructive".into()] },
                ),
                criterion(
                    "FEV1 30-50% predicted",
                    CriterionRule::Measurement { attribute: "fev1".into(), min: Some(30.0), max: Some(50.0) },
                ),
                criterion(
                    "No active tuberculosis",
                    CriterionRule::ExcludeDiagnosis { any_of: vec!["active tuberculosis".into()] },
                ),
            ],
        )
    }

    /// Lung nodule trial with a BMI criterion the COPD fixture cannot resolve.
    pub fn nodule_trial() -> ClinicalTrial {
        trial(
            "CTRI-LUNG-002",
            &["Lung nodule", "Pulmonary opacity"],
            vec![
                criterion("Age 50-75 years", CriterionRule::AgeRange { min: Some(50), max: Some(75) }),
                criterion(
                    "Indeterminate lung opacity or nodule on imaging",
                    CriterionRule::Finding { any_of: vec!["opacity".into(), "nodule".into()] },
                ),
                criterion(
                    "BMI 18.5-35",
                    CriterionRule::Measurement { attribute: "bmi".into(), min: Some(18.5), max: Some(35.0) },
                ),
            ],
        )
    }

    pub fn diabetes_trial() -> ClinicalTrial {
        trial(
            "CTRI-DM-003",
            &["Type 2 Diabetes Mellitus"],
            vec![
                criterion(
                    "HbA1c 7.5-10.5%",
                    CriterionRule::Measurement { attribute: "hba1c".into(), min: Some(7.5), max: Some(10.5) },
                ),
                criterion(
                    "On metformin",
                    CriterionRule::Medication { any_of: vec!["metformin".into()] },
                ),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::consultation::fixtures as consultations;
    use crate::models::soap::fixtures as notes;
    use std::io::Write;

    fn copd_profile() -> PatientProfile {
        let consultation = consultations::consultation("Breathless for six months.");
        PatientProfile::extract(&consultation, &notes::copd_with_opacity())
    }

    #[tokio::test]
    async fn in_memory_catalog_filters_by_condition() {
        let catalog = InMemoryTrialCatalog::new(vec![
            fixtures::copd_trial(),
            fixtures::nodule_trial(),
            fixtures::diabetes_trial(),
        ]);
        let found = catalog.search(&copd_profile()).await.unwrap();
        let ids: Vec<_> = found.iter().map(|t| t.trial_id.as_str()).collect();
        assert_eq!(ids, vec!["CTRI-COPD-001", "CTRI-LUNG-002"]);
    }

    #[tokio::test]
    async fn json_catalog_reads_wrapped_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!({ "trials": [fixtures::copd_trial()] });
        write!(file, "{body}").unwrap();

        let catalog = JsonTrialCatalog::new(file.path());
        let found = catalog.search(&copd_profile()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].criteria.len(), 4);
    }

    #[tokio::test]
    async fn json_catalog_reads_bare_array() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!([fixtures::diabetes_trial()]);
        write!(file, "{body}").unwrap();

        let trials = JsonTrialCatalog::new(file.path()).load().await.unwrap();
        assert_eq!(trials[0].trial_id, "CTRI-DM-003");
    }

    #[tokio::test]
    async fn bundled_catalog_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/clinical_trials.json");
        let catalog = JsonTrialCatalog::new(path);
        assert_eq!(catalog.load().await.unwrap().len(), 7);

        let found = catalog.search(&copd_profile()).await.unwrap();
        assert!(found.iter().any(|t| t.trial_id == "CTRI-SYN-2024-004"));
    }

    #[tokio::test]
    async fn missing_file_is_read_error() {
        let catalog = JsonTrialCatalog::new("/nonexistent/clinical_trials.json");
        let result = catalog.search(&copd_profile()).await;
        assert!(matches!(result, Err(CatalogError::Read { .. })));
    }

    #[tokio::test]
    async fn malformed_file_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"trials\": 42}}").unwrap();
        let result = JsonTrialCatalog::new(file.path()).load().await;
        assert!(matches!(result, Err(CatalogError::Parse { .. })));
    }
}
