//! Generation capability: the opaque model that maps (instructions, schema,
//! context) to JSON text.
//!
//! Stages talk to it only through [`LlmClient`], so the Ollama adapter and the
//! scripted mock are interchangeable.

pub mod mock;
pub mod ollama;
pub mod parser;
pub mod retry;

pub use mock::MockLlmClient;
pub use ollama::OllamaClient;
pub use parser::parse_json_response;
pub use retry::generate_json;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("Ollama is not running at {0}")]
    Connection(String),

    #[error("Model returned error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("No compatible model available")]
    NoModelAvailable,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),
}

impl GenerationError {
    /// Transport-level failures worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::HttpClient(_) | Self::Upstream { .. }
        )
    }

    /// Output-level failures: a fresh generation may parse.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::MalformedResponse(_) | Self::JsonParsing(_))
    }
}

/// Which stage is asking. Lets adapters and mocks route per task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationTask {
    SoapNote,
    PatientSummary,
    ReferralLetter,
}

impl GenerationTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SoapNote => "soap_note",
            Self::PatientSummary => "patient_summary",
            Self::ReferralLetter => "referral_letter",
        }
    }
}

/// One call into the generation capability.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: GenerationTask,
    /// System-level task instructions.
    pub instructions: &'static str,
    /// JSON template the output must conform to.
    pub schema: &'static str,
    /// Task-specific context (narrative, SOAP JSON, names).
    pub context: String,
}

impl GenerationRequest {
    /// User prompt: context followed by the schema contract.
    pub fn prompt(&self) -> String {
        format!(
            "{}\n\nReturn ONLY valid JSON (no markdown, no code blocks) matching this structure:\n{}",
            self.context.trim_end(),
            self.schema.trim()
        )
    }
}

/// Generation capability abstraction (allows mocking).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;

    /// Identity reported in processing steps and metadata.
    fn model_name(&self) -> &str;

    async fn is_available(&self) -> bool;
}
