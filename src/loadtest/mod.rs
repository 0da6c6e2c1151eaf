//! On-demand load testing.
//!
//! The engine accepts a test request, fans it out over a bounded worker
//! pool, streams per-request outcomes into the store, and persists one
//! aggregate summary per run. A run never aborts for a single failed
//! request; only pre-flight validation and the final summary write are
//! fatal.

mod stats;
mod types;

pub use types::{
    LoadTestError, LoadTestLog, LoadTestRequest, LoadTestSummary, RequestResult, TestConfig,
    MAX_CALLS_PER_THREAD, MAX_THREADS,
};

use crate::config::HttpClientConfig;
use crate::store::{self, Store};
use chrono::Utc;
use reqwest::Method;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// Executes load tests against arbitrary HTTP targets.
pub struct LoadTestEngine {
    /// Shared client; the per-request timeout rides on each request.
    client: reqwest::Client,
    store: Arc<dyn Store>,
}

impl LoadTestEngine {
    pub fn new(store: Arc<dyn Store>, http: &HttpClientConfig) -> Self {
        Self {
            client: http.build_untimed(),
            store,
        }
    }

    /// Run one load test to completion.
    ///
    /// Validates the request, checks name uniqueness, drives
    /// `threads x callsPerThread` requests through the worker pool, then
    /// aggregates and persists the summary. Cancellation closes the job
    /// channel early; workers drain and exit, per-request logs remain, and
    /// the partial summary is discarded rather than persisted.
    pub async fn execute(
        &self,
        mut request: LoadTestRequest,
        cancel: CancellationToken,
    ) -> Result<(), LoadTestError> {
        request.apply_defaults();
        request.validate()?;

        if self.store.name_exists(&request.name).await? {
            return Err(LoadTestError::DuplicateName(request.name));
        }

        let log_collection = store::test_log_collection(&request.name);
        if let Err(e) = self.store.create_indexes(&log_collection).await {
            tracing::warn!(collection = %log_collection, error = %e, "failed to create log indexes");
        }

        let total_calls = request.total_calls();

        tracing::info!(
            name = %request.name,
            threads = request.threads,
            calls_per_thread = request.calls_per_thread,
            total_calls,
            url = %request.url,
            "starting load test"
        );

        let started = Instant::now();

        let (job_tx, job_rx) = mpsc::channel::<usize>(total_calls);
        let job_rx = Arc::new(Mutex::new(job_rx));
        // Pre-sized to the full run so worker emits never block.
        let (result_tx, mut result_rx) = mpsc::channel::<RequestResult>(total_calls);

        let request = Arc::new(request);

        let mut workers = Vec::with_capacity(request.threads as usize);
        for _ in 0..request.threads {
            let jobs = Arc::clone(&job_rx);
            let results = result_tx.clone();
            let client = self.client.clone();
            let store = Arc::clone(&self.store);
            let request = Arc::clone(&request);

            workers.push(tokio::spawn(async move {
                loop {
                    let job = { jobs.lock().await.recv().await };
                    if job.is_none() {
                        break;
                    }

                    let result = execute_request(&client, &request).await;
                    save_request_log(store.as_ref(), &request, &result).await;
                    let _ = results.send(result).await;
                }
            }));
        }
        drop(result_tx);

        let producer = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                for job in 0..total_calls {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        sent = job_tx.send(job) => {
                            if sent.is_err() {
                                break;
                            }
                        }
                    }
                }
                // Dropping the sender closes the channel; workers exit once
                // the backlog drains.
            }
        });

        for worker in workers {
            if let Err(e) = worker.await {
                tracing::error!(name = %request.name, error = %e, "load test worker panicked");
            }
        }
        let _ = producer.await;

        let total_duration = started.elapsed();

        let mut results = Vec::with_capacity(total_calls);
        while let Some(result) = result_rx.recv().await {
            results.push(result);
        }

        // A truncated run must never masquerade as a completed summary in
        // the metrics collection.
        if cancel.is_cancelled() {
            tracing::info!(
                name = %request.name,
                completed = results.len(),
                total_calls,
                "load test cancelled, discarding partial summary"
            );
            return Err(LoadTestError::Cancelled);
        }

        let summary = stats::aggregate(&request, results, total_duration)?;

        let document = bson::to_document(&summary)?;
        self.store
            .insert_metrics(store::METRICS_COLLECTION, document)
            .await?;

        metrics::counter!("vigil_loadtest_runs_total").increment(1);

        tracing::info!(
            name = %request.name,
            successful = summary.successful_requests,
            total = summary.total_requests,
            success_rate = summary.success_rate,
            requests_per_second = summary.requests_per_second,
            average_ms = summary.average_time,
            throughput_mbps = summary.throughput_mbps,
            "load test completed"
        );

        Ok(())
    }
}

/// Issue one request and capture its outcome. Transport errors are captured
/// as-is, never retried. Latency is measured to response headers; the body
/// is then drained fully to count bytes and recycle the connection.
async fn execute_request(client: &reqwest::Client, request: &LoadTestRequest) -> RequestResult {
    let start = Instant::now();

    let method = match Method::from_bytes(request.method.as_bytes()) {
        Ok(method) => method,
        Err(_) => {
            return RequestResult {
                status_code: 0,
                elapsed: start.elapsed(),
                bytes_received: 0,
                error: Some(format!("invalid HTTP method: {}", request.method)),
            }
        }
    };

    let mut builder = client
        .request(method, &request.url)
        .timeout(Duration::from_secs(request.timeout));
    for (key, value) in &request.headers {
        builder = builder.header(key, value);
    }
    if !request.body.is_empty() {
        builder = builder.body(request.body.clone());
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            return RequestResult {
                status_code: 0,
                elapsed: start.elapsed(),
                bytes_received: 0,
                error: Some(e.to_string()),
            }
        }
    };

    let elapsed = start.elapsed();
    let status_code = response.status().as_u16();
    let bytes_received = match response.bytes().await {
        Ok(body) => body.len() as u64,
        Err(_) => 0,
    };

    metrics::histogram!("vigil_loadtest_request_duration_seconds")
        .record(elapsed.as_secs_f64());

    RequestResult {
        status_code,
        elapsed,
        bytes_received,
        error: None,
    }
}

/// Persist one per-request log record. Failures are logged and swallowed;
/// a run is never aborted by a single failed log write.
async fn save_request_log(store: &dyn Store, request: &LoadTestRequest, result: &RequestResult) {
    let log = LoadTestLog {
        name: request.name.clone(),
        url: request.url.clone(),
        method: request.method.clone(),
        status_code: result.status_code,
        response_time: result.elapsed.as_millis() as f64,
        success: result.error.is_none() && result.status_code == request.expected_status_code,
        error: result.error.clone(),
        timestamp: Utc::now(),
    };

    let document = match bson::to_document(&log) {
        Ok(document) => document,
        Err(e) => {
            tracing::error!(name = %request.name, error = %e, "failed to encode request log");
            return;
        }
    };

    let collection = store::test_log_collection(&request.name);
    if let Err(e) = store.insert_log(&collection, document).await {
        tracing::warn!(name = %request.name, error = %e, "failed to save request log");
    }
}
