//! Liveness endpoint handler.

use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
}

/// GET /health - liveness probe for the control plane itself.
pub async fn handle() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}
