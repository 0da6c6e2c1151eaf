//! Health-check scheduler configuration

use serde::{Deserialize, Serialize};

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the in-memory mirror is reconciled with the store.
    pub reconcile_interval_seconds: u64,
    /// Per-probe HTTP timeout.
    pub probe_timeout_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_seconds: 30,
            probe_timeout_seconds: 10,
        }
    }
}
