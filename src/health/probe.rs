//! Single-probe execution.

use super::types::{CheckDefinition, CheckLog};
use crate::store::{self, Store};
use chrono::Utc;
use reqwest::Method;
use std::sync::Arc;
use std::time::Instant;

/// Execute one probe against a definition and persist the outcome.
///
/// The stored `success` considers the status code only; an expected-body
/// mismatch downgrades the console line but not the log record.
pub(super) async fn execute(client: reqwest::Client, store: Arc<dyn Store>, def: CheckDefinition) {
    let start = Instant::now();

    let method = match Method::from_bytes(def.method.as_bytes()) {
        Ok(method) => method,
        Err(_) => {
            let error = format!("invalid HTTP method: {}", def.method);
            save_log(store.as_ref(), &def, 0, start, Some(error)).await;
            return;
        }
    };

    let mut request = client.request(method, &def.url);
    for (key, value) in &def.headers {
        request = request.header(key, value);
    }

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            save_log(store.as_ref(), &def, 0, start, Some(e.to_string())).await;
            return;
        }
    };

    let status = response.status().as_u16();

    // The body is always read so the connection returns to the pool.
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            save_log(store.as_ref(), &def, status, start, Some(e.to_string())).await;
            return;
        }
    };

    let mut success = status == def.status_code;
    if let Some(expected) = def.expected_body.as_deref().filter(|b| !b.is_empty()) {
        if expected.trim() != body.trim() {
            success = false;
        }
    }

    save_log(store.as_ref(), &def, status, start, None).await;

    let elapsed_ms = start.elapsed().as_millis() as u64;
    metrics::histogram!("vigil_probe_duration_seconds", "check" => def.name.clone())
        .record(start.elapsed().as_secs_f64());

    if success {
        tracing::info!(name = %def.name, status, elapsed_ms, "health check succeeded");
    } else {
        tracing::warn!(
            name = %def.name,
            expected = def.status_code,
            status,
            elapsed_ms,
            "health check failed"
        );
    }
}

async fn save_log(
    store: &dyn Store,
    def: &CheckDefinition,
    status_code: u16,
    start: Instant,
    error: Option<String>,
) {
    let log = CheckLog {
        timestamp: Utc::now(),
        status_code,
        response_time: start.elapsed().as_millis() as i64,
        success: error.is_none() && status_code == def.status_code,
        error,
    };

    let document = match bson::to_document(&log) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(name = %def.name, error = %e, "failed to encode probe log");
            return;
        }
    };

    let collection = store::check_log_collection(&def.name);
    if let Err(e) = store.insert_log(&collection, document).await {
        tracing::error!(name = %def.name, error = %e, "failed to save probe log");
    }
}
