//! Trial Matcher: deterministic eligibility profile, catalog lookup and
//! criterion-level evaluation of candidate trials.

pub mod catalog;
pub mod criteria;
pub mod matcher;
pub mod profile;

pub use catalog::{CatalogError, InMemoryTrialCatalog, JsonTrialCatalog, TrialCatalog};
pub use matcher::{MatchSettings, TrialMatcher, FLAG_CATALOG_UNAVAILABLE};
pub use profile::PatientProfile;
