//! Persistence gateway shared by the scheduler and the load-test engine.
//!
//! The gateway is a narrow, document-valued contract over the configuration
//! store: append log and metric documents, enumerate active health-check
//! definitions, count by filter, and keep the log-collection indexes in
//! place. [`MongoStore`] is the production implementation; [`MemoryStore`]
//! backs the test suite and local development.

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use bson::{doc, Document};
use thiserror::Error;

/// Collection holding health-check definitions (written by the portal).
pub const DEFINITIONS_COLLECTION: &str = "healthchecks";

/// Collection holding one summary document per completed load test.
pub const METRICS_COLLECTION: &str = "loadtest_metrics";

/// Per-check probe log collection. `name` is pre-normalized by the portal
/// (lowercase alphanumerics, `-`/`_` only).
pub fn check_log_collection(name: &str) -> String {
    format!("healthcheck_{name}")
}

/// Per-run request log collection for one load test.
pub fn test_log_collection(name: &str) -> String {
    format!("loadtest_logs_{name}")
}

/// Errors from gateway operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("document decode error: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("operation cancelled")]
    Cancelled,
}

/// Uniform contract for the document store.
///
/// Operations observe the root cancellation token supplied to the concrete
/// implementation at construction; a fired token aborts the in-flight call
/// and surfaces [`StoreError::Cancelled`]. No operation retries.
#[async_trait]
pub trait Store: Send + Sync {
    /// Append a log document to `collection`.
    async fn insert_log(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Commit a final summary document to `collection`.
    async fn insert_metrics(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// All documents in `collection` where `status == "active"`.
    async fn find_active(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Count documents in `collection` matching `filter`.
    async fn count_by_filter(&self, collection: &str, filter: Document)
        -> Result<u64, StoreError>;

    /// Whether a load test with this name has ever run.
    async fn name_exists(&self, test_name: &str) -> Result<bool, StoreError> {
        let count = self
            .count_by_filter(METRICS_COLLECTION, doc! { "name": test_name })
            .await?;
        Ok(count > 0)
    }

    /// Idempotently create the log-collection indexes:
    /// `{timestamp: -1}`, `{success: 1}`, `{statusCode: 1}`.
    async fn create_indexes(&self, collection: &str) -> Result<(), StoreError>;
}
