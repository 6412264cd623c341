use crate::error::{ServerError, ServerResult};
use crate::state::{ServerMetadata, ServerState};
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use std::time::SystemTime;

/// Global server start time for uptime calculation
static SERVER_START_TIME: once_cell::sync::Lazy<SystemTime> =
    once_cell::sync::Lazy::new(SystemTime::now);

fn uptime_seconds() -> u64 {
    SERVER_START_TIME
        .elapsed()
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Health check endpoint (liveness)
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "plagcheck-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptimeSeconds": uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// Ready once the similarity indexes can be read.
pub async fn readiness_check(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    let assignments = state
        .checker
        .indexes()
        .assignment_count()
        .map_err(|e| ServerError::Engine(e.into()))?;

    Ok(Json(json!({
        "status": "ready",
        "service": "plagcheck-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptimeSeconds": uptime_seconds(),
        "components": {
            "api": "ready",
            "index": "ready",
        },
        "indexedAssignments": assignments,
    })))
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    if !state.config.metrics_enabled {
        return Err(ServerError::NotFound);
    }
    let body = match &state.metrics {
        Some(handle) => handle.render(),
        None => String::new(),
    };
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], body))
}

/// Server metadata endpoint
pub async fn server_metadata(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<impl IntoResponse> {
    Ok(Json(ServerMetadata {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
        checks_in_flight: state.checker.checks_in_flight(),
    }))
}
