//! Health-check records shared with the configuration store.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A health-check definition owned by the external configuration portal.
///
/// Field names follow the store's BSON layout. `name` doubles as the
/// log-collection suffix and is pre-normalized by the portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDefinition {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub url: String,
    pub method: String,
    /// Probe interval in whole seconds.
    pub interval: i64,
    /// Expected response status code.
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub expected_body: Option<String>,
    /// Lifecycle status; only `"active"` definitions are scheduled.
    pub status: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// In-memory pairing of a definition with its remaining-seconds countdown.
///
/// Lives only inside the scheduler mirror: created when the definition first
/// appears active, destroyed when it leaves the active set.
#[derive(Debug, Clone)]
pub struct CheckEntry {
    pub definition: CheckDefinition,
    pub countdown: i64,
}

/// Append-only record of one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLog {
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub timestamp: DateTime<Utc>,
    /// Observed status code; 0 on transport failure.
    pub status_code: u16,
    /// Wall-clock milliseconds from request build to log emission.
    pub response_time: i64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
