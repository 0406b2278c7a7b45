//! Summary Generator: plain-language patient summary derived from the SOAP
//! note, with a grounding check against it.

pub mod generator;
pub mod grounding;
pub mod prompt;

pub use generator::{SummaryGenerator, FLAG_SUMMARY_FAILED};
