//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// `GET /api/health`: liveness only, never touches providers.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: crate::config::APP_NAME,
        version: crate::config::APP_VERSION,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
