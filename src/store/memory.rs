//! In-process persistence gateway for tests and local development.

use super::{Store, StoreError};
use async_trait::async_trait;
use bson::{Bson, Document};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Document store held entirely in memory.
///
/// Collections are plain vectors of documents; the `status == "active"`
/// filter and index bookkeeping mirror the production gateway so the
/// scheduler and engine can run against it unchanged.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    indexed: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of one collection's documents, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .expect("memory store poisoned")
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace a collection's contents wholesale. Fixture hook for tests
    /// that simulate portal edits.
    pub fn set_documents(&self, collection: &str, documents: Vec<Document>) {
        self.collections
            .lock()
            .expect("memory store poisoned")
            .insert(collection.to_string(), documents);
    }

    /// Whether `create_indexes` has been called for this collection.
    pub fn is_indexed(&self, collection: &str) -> bool {
        self.indexed
            .lock()
            .expect("memory store poisoned")
            .contains(collection)
    }

    fn push(&self, collection: &str, document: Document) {
        self.collections
            .lock()
            .expect("memory store poisoned")
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    fn matches(document: &Document, filter: &Document) -> bool {
        filter
            .iter()
            .all(|(key, value)| document.get(key) == Some(value))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_log(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.push(collection, document);
        Ok(())
    }

    async fn insert_metrics(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        self.push(collection, document);
        Ok(())
    }

    async fn find_active(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.lock().expect("memory store poisoned");
        let docs = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.get("status") == Some(&Bson::String("active".to_string())))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(docs)
    }

    async fn count_by_filter(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, StoreError> {
        let collections = self.collections.lock().expect("memory store poisoned");
        let count = collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| Self::matches(d, &filter)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn create_indexes(&self, collection: &str) -> Result<(), StoreError> {
        self.indexed
            .lock()
            .expect("memory store poisoned")
            .insert(collection.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::METRICS_COLLECTION;
    use bson::doc;

    #[tokio::test]
    async fn test_find_active_filters_status() {
        let store = MemoryStore::new();
        store
            .insert_log("healthchecks", doc! { "name": "a", "status": "active" })
            .await
            .unwrap();
        store
            .insert_log("healthchecks", doc! { "name": "b", "status": "paused" })
            .await
            .unwrap();

        let active = store.find_active("healthchecks").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].get_str("name").unwrap(), "a");
    }

    #[tokio::test]
    async fn test_count_by_filter_matches_all_fields() {
        let store = MemoryStore::new();
        store
            .insert_log("logs", doc! { "success": true, "statusCode": 200 })
            .await
            .unwrap();
        store
            .insert_log("logs", doc! { "success": false, "statusCode": 200 })
            .await
            .unwrap();

        let count = store
            .count_by_filter("logs", doc! { "statusCode": 200 })
            .await
            .unwrap();
        assert_eq!(count, 2);

        let count = store
            .count_by_filter("logs", doc! { "success": true, "statusCode": 200 })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_name_exists_uses_metrics_collection() {
        let store = MemoryStore::new();
        assert!(!store.name_exists("t1").await.unwrap());

        store
            .insert_metrics(METRICS_COLLECTION, doc! { "name": "t1" })
            .await
            .unwrap();
        assert!(store.name_exists("t1").await.unwrap());
        assert!(!store.name_exists("t2").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_indexes_is_idempotent() {
        let store = MemoryStore::new();
        store.create_indexes("healthcheck_a").await.unwrap();
        store.create_indexes("healthcheck_a").await.unwrap();
        assert!(store.is_indexed("healthcheck_a"));
        assert!(!store.is_indexed("healthcheck_b"));
    }
}
