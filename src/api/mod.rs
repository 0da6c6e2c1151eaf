//! Control plane.
//!
//! Minimal HTTP surface for the execution plane: load-test kickoff and a
//! liveness probe. Configuration CRUD lives in the external portal; the
//! control plane only reads the store for uniqueness checks.
//!
//! ## Endpoints
//!
//! - `POST /loadtest` - start a load test; replies immediately
//! - `GET /health` - liveness with current server time

mod error;
mod health;
mod loadtest;

pub use error::ApiError;
pub use health::HealthResponse;
pub use loadtest::{KickoffConfig, KickoffResponse};

use crate::loadtest::LoadTestEngine;
use crate::logging::log_requests;
use crate::store::Store;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;

/// Maximum request body size (10 MB).
const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: Arc<LoadTestEngine>,
    /// Root token; detached load tests run on child tokens so their
    /// lifetime follows the process, not the handler.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, engine: Arc<LoadTestEngine>, cancel: CancellationToken) -> Self {
        Self {
            store,
            engine,
            cancel,
        }
    }
}

/// Create the control-plane router with all endpoints and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/loadtest", post(loadtest::handle))
        .route("/health", get(health::handle))
        .layer(axum::middleware::from_fn(log_requests))
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .with_state(state)
}

/// Serve the control plane until cancellation.
///
/// After the token fires, in-flight handlers get a drain window before the
/// server task is aborted.
pub async fn serve(
    router: Router,
    host: &str,
    port: u16,
    grace: Duration,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "control plane listening");

    let shutdown = cancel.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
    });

    tokio::select! {
        result = &mut server => {
            return flatten(result);
        }
        _ = cancel.cancelled() => {}
    }

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => flatten(result)?,
        Err(_) => {
            tracing::warn!("drain window expired, forcing control plane shutdown");
            server.abort();
        }
    }

    tracing::info!("control plane stopped");
    Ok(())
}

fn flatten(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> std::io::Result<()> {
    match result {
        Ok(inner) => inner,
        Err(join_error) => Err(std::io::Error::other(join_error)),
    }
}
