//! Health check endpoint
//!
//! Reports that the bridge is up and which Ollama endpoint, if any, is
//! cached. Never probes anything.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Bridge status, always "OK"
    pub status: &'static str,
    /// "connected" when an endpoint is cached, "unresolved" otherwise
    pub connection: &'static str,
    pub cached_endpoint: Option<String>,
}

/// Health check handler
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let cached_endpoint = state
        .session()
        .lock()
        .await
        .cached_endpoint()
        .map(ToString::to_string);

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            connection: if cached_endpoint.is_some() {
                "connected"
            } else {
                "unresolved"
            },
            cached_endpoint,
        }),
    )
}
