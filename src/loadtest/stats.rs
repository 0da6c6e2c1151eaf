//! Result aggregation for one load-test run.

use super::types::{LoadTestError, LoadTestRequest, LoadTestSummary, RequestResult, TestConfig};
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;

/// Fold per-request results into the summary document.
///
/// Latency figures are whole milliseconds. Percentiles use the nearest-rank
/// rule `sorted[floor(len * p / 100)]`, clamped to the last index; existing
/// summaries depend on these exact numbers.
pub fn aggregate(
    request: &LoadTestRequest,
    results: Vec<RequestResult>,
    total_duration: Duration,
) -> Result<LoadTestSummary, LoadTestError> {
    let mut total_requests: i64 = 0;
    let mut successful_requests: i64 = 0;
    let mut failed_requests: i64 = 0;
    let mut error_count: i64 = 0;
    let mut total_time_ms: i64 = 0;
    let mut total_bytes: i64 = 0;
    let mut response_times: Vec<f64> = Vec::with_capacity(results.len());
    let mut status_codes: HashMap<u16, i64> = HashMap::new();
    let mut min_time = f64::INFINITY;
    let mut max_time: f64 = 0.0;

    for result in &results {
        total_requests += 1;

        let elapsed_ms = result.elapsed.as_millis() as f64;
        response_times.push(elapsed_ms);
        total_time_ms += result.elapsed.as_millis() as i64;
        total_bytes += result.bytes_received as i64;

        if elapsed_ms < min_time {
            min_time = elapsed_ms;
        }
        if elapsed_ms > max_time {
            max_time = elapsed_ms;
        }

        match &result.error {
            Some(_) => {
                failed_requests += 1;
                error_count += 1;
            }
            None => {
                if result.status_code == request.expected_status_code {
                    successful_requests += 1;
                } else {
                    failed_requests += 1;
                }
                *status_codes.entry(result.status_code).or_insert(0) += 1;
            }
        }
    }

    if total_requests == 0 {
        return Err(LoadTestError::NoRequests);
    }

    let total_seconds = total_duration.as_secs_f64();
    let average_time = total_time_ms as f64 / total_requests as f64;
    let requests_per_second = total_requests as f64 / total_seconds;
    let success_rate = successful_requests as f64 / total_requests as f64 * 100.0;
    let throughput_mbps = (total_bytes as f64 / 1_048_576.0) / total_seconds;

    response_times.sort_by(|a, b| a.total_cmp(b));

    let median_time = percentile(&response_times, 50.0);
    let p95_time = percentile(&response_times, 95.0);
    let p99_time = percentile(&response_times, 99.0);

    if min_time.is_infinite() {
        min_time = 0.0;
    }

    Ok(LoadTestSummary {
        name: request.name.clone(),
        test_config: TestConfig::from_request(request),
        total_requests,
        successful_requests,
        failed_requests,
        total_duration: total_seconds,
        requests_per_second,
        average_time,
        min_time,
        max_time,
        median_time,
        p95_time,
        p99_time,
        status_codes: status_codes
            .into_iter()
            .map(|(code, count)| (code.to_string(), count))
            .collect(),
        error_count,
        total_bytes_received: total_bytes,
        throughput_mbps,
        success_rate,
        timestamp: Utc::now(),
    })
}

/// Nearest-rank percentile with floor indexing over an ascending slice.
fn percentile(sorted_times: &[f64], pct: f64) -> f64 {
    if sorted_times.is_empty() {
        return 0.0;
    }

    let mut index = (sorted_times.len() as f64 * pct / 100.0) as usize;
    if index >= sorted_times.len() {
        index = sorted_times.len() - 1;
    }

    sorted_times[index]
}
