use std::sync::Arc;

use crate::pipeline::ConsultationPipeline;

/// Shared state for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<ConsultationPipeline>,
}

impl ApiContext {
    pub fn new(pipeline: Arc<ConsultationPipeline>) -> Self {
        Self { pipeline }
    }
}
