//! MongoDB-backed persistence gateway.

use super::{Store, StoreError};
use async_trait::async_trait;
use bson::{doc, Document};
use futures::stream::TryStreamExt;
use mongodb::{Database, IndexModel};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Gateway over a `mongodb::Database`.
///
/// Holds the process root cancellation token; every driver call races
/// against it so shutdown aborts in-flight store traffic.
pub struct MongoStore {
    db: Database,
    cancel: CancellationToken,
}

impl MongoStore {
    pub fn new(db: Database, cancel: CancellationToken) -> Self {
        Self { db, cancel }
    }

    async fn run<T>(
        &self,
        op: impl Future<Output = Result<T, mongodb::error::Error>> + Send,
    ) -> Result<T, StoreError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            result = op => result.map_err(StoreError::from),
        }
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_log(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let coll = self.db.collection::<Document>(collection);
        let result = self
            .run(async move { coll.insert_one(document, None).await.map(|_| ()) })
            .await;
        if let Err(e) = &result {
            tracing::error!(collection, error = %e, "failed to insert log document");
        }
        result
    }

    async fn insert_metrics(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let coll = self.db.collection::<Document>(collection);
        self.run(async move { coll.insert_one(document, None).await.map(|_| ()) })
            .await?;
        tracing::info!(collection, "metrics saved");
        Ok(())
    }

    async fn find_active(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let coll = self.db.collection::<Document>(collection);
        let cursor = self
            .run(async move { coll.find(doc! { "status": "active" }, None).await })
            .await?;
        self.run(cursor.try_collect::<Vec<Document>>()).await
    }

    async fn count_by_filter(
        &self,
        collection: &str,
        filter: Document,
    ) -> Result<u64, StoreError> {
        let coll = self.db.collection::<Document>(collection);
        self.run(async move { coll.count_documents(filter, None).await })
            .await
    }

    async fn create_indexes(&self, collection: &str) -> Result<(), StoreError> {
        let indexes = vec![
            IndexModel::builder().keys(doc! { "timestamp": -1 }).build(),
            IndexModel::builder().keys(doc! { "success": 1 }).build(),
            IndexModel::builder().keys(doc! { "statusCode": 1 }).build(),
        ];

        let coll = self.db.collection::<Document>(collection);
        self.run(async move { coll.create_indexes(indexes, None).await.map(|_| ()) })
            .await?;
        tracing::debug!(collection, "indexes ensured");
        Ok(())
    }
}
