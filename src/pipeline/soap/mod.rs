//! Section Extractor: converts a consultation narrative into a SOAP note with
//! per-section confidence and data-quality flags.

pub mod confidence;
pub mod extractor;
pub mod normalize;
pub mod prompt;

pub use confidence::thresholds;
pub use extractor::{ExtractionError, SectionExtractor};
