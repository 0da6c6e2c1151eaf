//! Request logging middleware

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;
use uuid::Uuid;

/// Generate a new request ID using UUID v4
///
/// Returns a unique correlation ID that can be used to track a request
/// through the control plane.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Log one line per request: method, path, status, and elapsed time.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = generate_request_id();

    tracing::debug!(%method, %path, %request_id, "request received");

    let start = Instant::now();
    let response = next.run(request).await;

    tracing::info!(
        %method,
        %path,
        %request_id,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request completed"
    );

    response
}
