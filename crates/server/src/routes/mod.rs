//! API route handlers
//!
//! - `health`: liveness, readiness, Prometheus metrics and metadata
//! - `submissions`: upload, lifecycle and plagiarism results

pub mod health;
pub mod submissions;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
/// This is the root endpoint (GET /).
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "plagcheck",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "/api/submissions/upload",
            "/api/submissions/{id}",
            "/api/submissions/{id}/grade",
            "/api/submissions/{id}/check-plagiarism",
            "/api/submissions/{id}/plagiarism",
            "/api/submissions/assignment/{assignmentId}",
            "/api/submissions/assignment/{assignmentId}/plagiarism-results",
            "/api/submissions/student/{studentId}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
