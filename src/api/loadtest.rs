//! Load-test kickoff handler.

use super::{ApiError, AppState};
use crate::loadtest::{LoadTestError, LoadTestRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

/// Body returned to a successful kickoff.
#[derive(Debug, Serialize)]
pub struct KickoffResponse {
    pub status: String,
    pub message: String,
    pub name: String,
    pub config: KickoffConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KickoffConfig {
    pub threads: u32,
    pub calls_per_thread: u32,
    pub total_calls: i64,
}

/// POST /loadtest - validate, then fire and forget.
///
/// The test runs on a detached task tied to the process root token; clients
/// poll results from the store. The response only acknowledges the start.
pub async fn handle(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoadTestRequest>, JsonRejection>,
) -> Result<Json<KickoffResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| ApiError::BadRequest(format!("invalid request body: {e}")))?;

    if request.name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }
    if request.url.is_empty() {
        return Err(ApiError::BadRequest("url is required".to_string()));
    }

    if state.store.name_exists(&request.name).await? {
        return Err(ApiError::Conflict(request.name));
    }

    let total_calls = request.total_calls() as i64;
    let response = KickoffResponse {
        status: "started".to_string(),
        message: format!(
            "Load test '{}' started. Results will be saved to loadtest_logs_{} and loadtest_metrics",
            request.name, request.name
        ),
        name: request.name.clone(),
        config: KickoffConfig {
            threads: request.threads,
            calls_per_thread: request.calls_per_thread,
            total_calls,
        },
    };

    tracing::info!(
        name = %request.name,
        threads = request.threads,
        calls_per_thread = request.calls_per_thread,
        total_calls,
        "load test started"
    );

    let engine = Arc::clone(&state.engine);
    let cancel = state.cancel.child_token();
    let name = request.name.clone();
    tokio::spawn(async move {
        match engine.execute(request, cancel).await {
            Ok(()) => {}
            Err(LoadTestError::Cancelled) => {
                tracing::info!(name = %name, "load test cancelled by shutdown");
            }
            Err(e) => tracing::error!(name = %name, error = %e, "load test failed"),
        }
    });

    Ok(Json(response))
}
