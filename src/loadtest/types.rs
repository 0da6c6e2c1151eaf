//! Load-test request, result, and log records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on calls per worker for one run.
pub const MAX_CALLS_PER_THREAD: u32 = 10_000;
/// Upper bound on concurrent workers for one run.
pub const MAX_THREADS: u32 = 1_000;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Errors from load-test execution
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("load test with name '{0}' already exists. Please use a different name")]
    DuplicateName(String),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    #[error("failed to encode summary: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("no requests were executed")]
    NoRequests,

    #[error("load test cancelled before completion")]
    Cancelled,
}

/// Caller-supplied test description.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestRequest {
    /// Unique across historical tests; doubles as the log-collection suffix.
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: String,
    pub calls_per_thread: u32,
    pub threads: u32,
    /// Per-request timeout in seconds; 0 means the default.
    #[serde(default)]
    pub timeout: u64,
    #[serde(default)]
    pub expected_status_code: u16,
}

impl LoadTestRequest {
    /// Fill unset optional fields: method GET, expected status 200,
    /// timeout 30 s.
    pub fn apply_defaults(&mut self) {
        if self.method.is_empty() {
            self.method = "GET".to_string();
        }
        if self.expected_status_code == 0 {
            self.expected_status_code = DEFAULT_EXPECTED_STATUS;
        }
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_SECONDS;
        }
    }

    pub fn validate(&self) -> Result<(), LoadTestError> {
        if self.name.is_empty() {
            return Err(LoadTestError::InvalidRequest("name is required".to_string()));
        }
        if self.calls_per_thread == 0 {
            return Err(LoadTestError::InvalidRequest(
                "callsPerThread must be greater than 0".to_string(),
            ));
        }
        if self.calls_per_thread > MAX_CALLS_PER_THREAD {
            return Err(LoadTestError::InvalidRequest(format!(
                "callsPerThread must be at most {MAX_CALLS_PER_THREAD}"
            )));
        }
        if self.threads == 0 {
            return Err(LoadTestError::InvalidRequest(
                "threads must be greater than 0".to_string(),
            ));
        }
        if self.threads > MAX_THREADS {
            return Err(LoadTestError::InvalidRequest(format!(
                "threads must be at most {MAX_THREADS}"
            )));
        }
        Ok(())
    }

    pub fn total_calls(&self) -> usize {
        self.threads as usize * self.calls_per_thread as usize
    }
}

/// Echo of the run configuration stored inside the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub url: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    pub calls_per_thread: u32,
    pub threads: u32,
    pub total_calls: i64,
    pub timeout: u64,
    pub expected_status_code: u16,
}

impl TestConfig {
    pub fn from_request(request: &LoadTestRequest) -> Self {
        Self {
            url: request.url.clone(),
            method: request.method.clone(),
            headers: request.headers.clone(),
            body: request.body.clone(),
            calls_per_thread: request.calls_per_thread,
            threads: request.threads,
            total_calls: request.total_calls() as i64,
            timeout: request.timeout,
            expected_status_code: request.expected_status_code,
        }
    }
}

/// Aggregated metrics document, one per completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestSummary {
    pub name: String,
    pub test_config: TestConfig,
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    /// Wall-clock duration in seconds.
    pub total_duration: f64,
    pub requests_per_second: f64,
    /// Latencies in milliseconds.
    pub average_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub median_time: f64,
    pub p95_time: f64,
    pub p99_time: f64,
    /// Histogram over non-errored requests, keyed by status code.
    pub status_codes: HashMap<String, i64>,
    /// Transport failures (DNS, connect, TLS, I/O, timeout).
    pub error_count: i64,
    pub total_bytes_received: i64,
    #[serde(rename = "throughputMBps")]
    pub throughput_mbps: f64,
    /// Successful requests as a percentage of the total.
    pub success_rate: f64,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

/// One per dispatched request, written to `loadtest_logs_<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestLog {
    pub name: String,
    pub url: String,
    pub method: String,
    pub status_code: u16,
    /// Milliseconds.
    pub response_time: f64,
    /// Transport succeeded and the status matched the expectation.
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a single dispatched request.
#[derive(Debug, Clone)]
pub struct RequestResult {
    /// 0 when the transport failed.
    pub status_code: u16,
    /// Time to response headers; body drain excluded.
    pub elapsed: Duration,
    pub bytes_received: u64,
    pub error: Option<String>,
}
