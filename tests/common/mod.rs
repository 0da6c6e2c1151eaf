//! Shared test utilities for Vigil integration tests.

#![allow(dead_code)]

use bson::oid::ObjectId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vigil::api::{create_router, AppState};
use vigil::config::{HttpClientConfig, SchedulerConfig};
use vigil::health::{CheckDefinition, Scheduler};
use vigil::loadtest::{LoadTestEngine, LoadTestRequest};
use vigil::store::MemoryStore;

/// Create an engine backed by the given in-memory store.
pub fn make_engine(store: Arc<MemoryStore>) -> LoadTestEngine {
    LoadTestEngine::new(store, &HttpClientConfig::default())
}

/// Create a scheduler backed by the given in-memory store with a short
/// probe timeout.
pub fn make_scheduler(store: Arc<MemoryStore>) -> Scheduler {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    Scheduler::with_client(store, SchedulerConfig::default(), client)
}

/// Create a control-plane router over a fresh in-memory store.
pub fn make_app(store: Arc<MemoryStore>) -> axum::Router {
    let engine = Arc::new(make_engine(Arc::clone(&store)));
    let state = Arc::new(AppState::new(store, engine, CancellationToken::new()));
    create_router(state)
}

/// Minimal load-test request against `url`.
pub fn make_request(name: &str, url: &str, calls_per_thread: u32, threads: u32) -> LoadTestRequest {
    LoadTestRequest {
        name: name.to_string(),
        url: url.to_string(),
        method: String::new(),
        headers: HashMap::new(),
        body: String::new(),
        calls_per_thread,
        threads,
        timeout: 0,
        expected_status_code: 0,
    }
}

/// Active health-check definition probing `url`.
pub fn make_definition(name: &str, url: &str, interval: i64) -> CheckDefinition {
    CheckDefinition {
        id: ObjectId::new(),
        name: name.to_string(),
        url: url.to_string(),
        method: "GET".to_string(),
        interval,
        status_code: 200,
        headers: HashMap::new(),
        expected_body: None,
        status: "active".to_string(),
        created_at: Utc::now(),
    }
}

/// Install definitions as the store's active set.
pub fn seed_definitions(store: &MemoryStore, definitions: &[CheckDefinition]) {
    let documents = definitions
        .iter()
        .map(|d| bson::to_document(d).unwrap())
        .collect();
    store.set_documents(vigil::store::DEFINITIONS_COLLECTION, documents);
}

/// Wait until `collection` holds at least `count` documents.
pub async fn wait_for_documents(
    store: &MemoryStore,
    collection: &str,
    count: usize,
) -> Vec<bson::Document> {
    for _ in 0..100 {
        let documents = store.documents(collection);
        if documents.len() >= count {
            return documents;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "timed out waiting for {count} documents in {collection}; have {}",
        store.documents(collection).len()
    );
}
