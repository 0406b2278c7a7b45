use serde_json::Value;

use super::parser::parse_json_response;
use super::{GenerationError, GenerationRequest, LlmClient};

/// Call the generation capability and parse its JSON, retrying transport and
/// parse failures up to `max_retries` extra attempts.
///
/// Non-retryable errors (e.g. no model installed) propagate immediately.
pub async fn generate_json(
    llm: &dyn LlmClient,
    request: &GenerationRequest,
    max_retries: u32,
) -> Result<Value, GenerationError> {
    let mut last_error: Option<GenerationError> = None;

    for attempt in 0..=max_retries {
        let response = match llm.generate(request).await {
            Ok(resp) => resp,
            Err(e) if e.is_retryable() && attempt < max_retries => {
                tracing::warn!(
                    task = request.task.as_str(),
                    attempt = attempt + 1,
                    error = %e,
                    "Generation call failed, retrying"
                );
                last_error = Some(e);
                continue;
            }
            Err(e) => return Err(e),
        };

        match parse_json_response(&response) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_parse_error() && attempt < max_retries => {
                tracing::warn!(
                    task = request.task.as_str(),
                    attempt = attempt + 1,
                    response_len = response.len(),
                    error = %e,
                    "Generation response parse failed, retrying"
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        GenerationError::MalformedResponse("All retry attempts exhausted".into())
    }))
}
