//! API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::pipeline::ConsultationPipeline;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Build the API router over a shared pipeline.
pub fn api_router(pipeline: Arc<ConsultationPipeline>) -> Router {
    build_router(ApiContext::new(pipeline))
}

fn build_router(ctx: ApiContext) -> Router {
    Router::new()
        .route("/api/process", post(endpoints::process::process))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::models::soap::fixtures as notes;
    use crate::models::{ProcessingResult, ERROR_DISCLAIMER};
    use crate::pipeline::generation::{GenerationError, GenerationTask, MockLlmClient};
    use crate::pipeline::trials::catalog::fixtures;
    use crate::pipeline::trials::InMemoryTrialCatalog;
    use crate::pipeline::PipelineSettings;
    use crate::api::decode_payload;

    fn consultation_json(text: &str) -> Value {
        json!({
            "id": "CONSULT-001",
            "patient": {"name": "Rajesh Kumar Sharma", "age": 58, "gender": "Male", "patient_id": "SYN-PT-10001"},
            "doctor": {"name": "Dr. Priya Venkatesh", "speciality": "Internal Medicine", "hospital": "Apollo Clinic, Bengaluru"},
            "consultation_text": text,
            "referral_reason": null,
            "specialist_type": null
        })
    }

    const ROUTINE_TEXT: &str = "Type 2 diabetes follow-up. BP 132/84. HbA1c 7.4%. Continue metformin.";

    fn test_app(llm: MockLlmClient, settings: PipelineSettings) -> Router {
        let catalog = InMemoryTrialCatalog::new(vec![fixtures::diabetes_trial(), fixtures::copd_trial()]);
        let pipeline = ConsultationPipeline::new(Arc::new(llm), Arc::new(catalog), settings);
        api_router(Arc::new(pipeline))
    }

    fn routine_llm() -> MockLlmClient {
        MockLlmClient::new()
            .with_response(
                GenerationTask::SoapNote,
                &serde_json::to_string(&notes::routine_diabetes()).unwrap(),
            )
            .with_response(GenerationTask::PatientSummary, r#"{"visit_summary": "Routine check-up."}"#)
    }

    fn post_json(body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/process")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_service_and_model() {
        let app = test_app(MockLlmClient::new(), PipelineSettings::default());
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["service"], "ClinicalSetu API");
        assert_eq!(json["model"], "mock-medgemma");
        assert_eq!(json["model_available"], true);
    }

    #[tokio::test]
    async fn process_returns_full_result() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let response = app
            .oneshot(post_json(consultation_json(ROUTINE_TEXT).to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert!(json["referral_letter"]["referral_letter"].is_null());
        assert_eq!(json["processing_steps"].as_array().unwrap().len(), 4);
        assert_eq!(json["metadata"]["consultation_id"], "CONSULT-001");
        assert_eq!(json["metadata"]["patient_id"], "SYN-PT-10001");
        assert!(json["soap_note"]["confidence_scores"]["plan"].is_number());
    }

    #[tokio::test]
    async fn process_accepts_stringified_body_wrapper() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let wrapped = json!({ "body": consultation_json(ROUTINE_TEXT).to_string() });
        let response = app.oneshot(post_json(wrapped.to_string())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let result: ProcessingResult = decode_payload(&bytes).unwrap();
        assert_eq!(result.metadata.consultation_id, "CONSULT-001");
    }

    #[tokio::test]
    async fn empty_narrative_is_400() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let response = app
            .oneshot(post_json(consultation_json("  ").to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = read_json(response).await;
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
        assert_eq!(json["disclaimer"], ERROR_DISCLAIMER);
    }

    #[tokio::test]
    async fn malformed_payload_is_400() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let response = app.oneshot(post_json("{\"patient\": 5".into())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_required_field_is_400() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let mut body = consultation_json(ROUTINE_TEXT);
        body.as_object_mut().unwrap().remove("patient");
        let response = app.oneshot(post_json(body.to_string())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn extraction_failure_is_502() {
        let llm = MockLlmClient::new().with_error(
            GenerationTask::SoapNote,
            GenerationError::Connection("http://localhost:11434".into()),
        );
        let settings = PipelineSettings {
            max_retries: 0,
            ..PipelineSettings::default()
        };
        let response = test_app(llm, settings)
            .oneshot(post_json(consultation_json(ROUTINE_TEXT).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn extraction_timeout_is_504() {
        let llm = routine_llm().with_delay(GenerationTask::SoapNote, Duration::from_secs(5));
        let settings = PipelineSettings {
            stage_timeout: Duration::from_millis(50),
            ..PipelineSettings::default()
        };
        let response = test_app(llm, settings)
            .oneshot(post_json(consultation_json(ROUTINE_TEXT).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = test_app(routine_llm(), PipelineSettings::default());
        let huge = "x".repeat(MAX_BODY_BYTES + 1);
        let response = app
            .oneshot(post_json(consultation_json(&huge).to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() {
        let app = test_app(MockLlmClient::new(), PipelineSettings::default());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/process")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("access-control-allow-origin"));
    }
}
