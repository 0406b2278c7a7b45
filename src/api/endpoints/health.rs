//! Health check endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::{APP_VERSION, SERVICE_NAME};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_available: bool,
}

/// `GET /health`: liveness plus generation model reachability.
pub async fn check(State(ctx): State<ApiContext>) -> Result<Json<HealthResponse>, ApiError> {
    let llm = ctx.pipeline.llm();
    let model_available = llm.is_available().await;
    if !model_available {
        tracing::warn!(model = llm.model_name(), "Generation model unavailable");
    }

    Ok(Json(HealthResponse {
        status: "ok",
        service: SERVICE_NAME,
        version: APP_VERSION,
        model: llm.model_name().to_string(),
        model_available,
    }))
}
