//! HTTP API.
//!
//! `POST /api/process` runs the consultation pipeline and returns the
//! aggregated `ProcessingResult`; `GET /health` reports service and model
//! availability. `api_router()` returns a composable `Router` that can be
//! mounted on any axum server instance.

pub mod endpoints;
pub mod envelope;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use envelope::{decode_payload, EnvelopeError};
pub use error::ApiError;
pub use router::api_router;
pub use server::{start_server, ApiServer, ServerError};
pub use types::ApiContext;
