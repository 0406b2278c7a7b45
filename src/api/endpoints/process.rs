//! Consultation processing endpoint.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;

use crate::api::envelope::decode_payload;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{Consultation, ProcessingResult};

/// `POST /api/process`: body is a Consultation, raw or wrapped as
/// `{"body": "<stringified JSON>"}`.
pub async fn process(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<ProcessingResult>, ApiError> {
    let consultation: Consultation = decode_payload(&body)?;
    let result = ctx.pipeline.run(&consultation).await?;
    Ok(Json(result))
}
