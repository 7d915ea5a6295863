//! Health check endpoint.

use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

/// Health check response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Whether the Gemini credential is configured; sessions are refused
    /// without it.
    pub gemini_configured: bool,
}

/// Health check handler.
///
/// Reports liveness and whether the bridge is able to serve sessions. Does
/// not probe the upstream service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        gemini_configured: state.config.has_gemini_credential(),
    })
}
