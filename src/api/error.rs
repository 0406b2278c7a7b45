//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::envelope::EnvelopeError;
use crate::models::ERROR_DISCLAIMER;
use crate::pipeline::PipelineError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    pub disclaimer: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Generation unavailable: {0}")]
    Upstream(String),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                detail.clone(),
            ),
            ApiError::Upstream(detail) => {
                tracing::warn!(detail, "SOAP extraction unavailable");
                (
                    StatusCode::BAD_GATEWAY,
                    "EXTRACTION_FAILED",
                    "The generation model could not produce a SOAP note".to_string(),
                )
            }
            ApiError::Timeout(detail) => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                detail.clone(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
            disclaimer: ERROR_DISCLAIMER,
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => ApiError::BadRequest(e.to_string()),
            PipelineError::Extraction(e) => ApiError::Upstream(e.to_string()),
            e @ PipelineError::Timeout { .. } => ApiError::Timeout(e.to_string()),
            PipelineError::Phase(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
