//! Outbound HTTP client tuning

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection pool settings for the shared outbound clients.
///
/// Sized for the load-test worst case: many workers hammering one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    pub timeout_seconds: u64,
    pub max_idle_per_host: usize,
    pub idle_timeout_seconds: u64,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_idle_per_host: 100,
            idle_timeout_seconds: 90,
        }
    }
}

impl HttpClientConfig {
    /// Build a pooled client with a fixed per-request timeout.
    pub fn build_with_timeout(&self, timeout: Duration) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(self.idle_timeout_seconds))
            .build()
            .expect("Failed to build HTTP client")
    }

    /// Build a pooled client with no global timeout; callers attach a
    /// per-request timeout instead.
    pub fn build_untimed(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .pool_max_idle_per_host(self.max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(self.idle_timeout_seconds))
            .build()
            .expect("Failed to build HTTP client")
    }
}
