//! Per-collection cache of learned document schemas.
//!
//! Learning a schema costs one full collection read, so results are memoised
//! until a write introduces fields the cached schema lacks. The cache is an
//! explicit object owned by whoever wires up the data layer and passed to the
//! services that need it.
//!
//! Concurrent warm-ups for the same collection may both compute; the last
//! writer wins. Schemas are monotone over a collection's lifetime, so either
//! result is a valid snapshot.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use document_schema::{SchemaNode, derive_schema};
use tracing::debug;

use crate::domain::CollectionName;
use crate::domain::ports::{DocumentStore, DocumentStoreError, QueryFilter};

/// Memoised schemas keyed by collection.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: Mutex<HashMap<CollectionName, Arc<SchemaNode>>>,
}

impl SchemaCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<CollectionName, Arc<SchemaNode>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached schema, if any.
    pub fn get(&self, collection: &CollectionName) -> Option<Arc<SchemaNode>> {
        self.lock_entries().get(collection).cloned()
    }

    /// Return the cached schema or compute, store and return it.
    ///
    /// The lock is not held while `compute` runs. A failed computation leaves
    /// the cache untouched.
    ///
    /// # Examples
    /// ```
    /// use document_schema::SchemaNode;
    /// use fleet_backend::domain::{EntityKind, SchemaCache};
    ///
    /// # fn block_on<F: std::future::Future>(future: F) -> F::Output {
    /// #     tokio::runtime::Builder::new_current_thread()
    /// #         .build()
    /// #         .expect("runtime")
    /// #         .block_on(future)
    /// # }
    /// # block_on(async {
    /// let cache = SchemaCache::new();
    /// let clients = EntityKind::Client.collection();
    /// let schema = cache
    ///     .get_or_compute(&clients, || async { Ok::<_, ()>(SchemaNode::empty_object()) })
    ///     .await
    ///     .expect("compute succeeds");
    /// assert!(schema.is_empty());
    /// assert!(cache.get(&clients).is_some());
    /// # });
    /// ```
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        collection: &CollectionName,
        compute: F,
    ) -> Result<Arc<SchemaNode>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SchemaNode, E>>,
    {
        if let Some(schema) = self.get(collection) {
            debug!(collection = %collection, "schema cache hit");
            return Ok(schema);
        }

        debug!(collection = %collection, "schema cache miss");
        let schema = Arc::new(compute().await?);
        self.lock_entries()
            .insert(collection.clone(), Arc::clone(&schema));
        Ok(schema)
    }

    /// Drop the cached schema for one collection.
    ///
    /// Returns `true` when an entry was removed.
    pub fn invalidate(&self, collection: &CollectionName) -> bool {
        let removed = self.lock_entries().remove(collection).is_some();
        if removed {
            debug!(collection = %collection, "schema cache entry invalidated");
        }
        removed
    }

    /// Drop every cached schema.
    pub fn clear(&self) {
        self.lock_entries().clear();
    }
}

/// Schema lookups for collections served by one document store.
pub struct CollectionSchemas<S> {
    store: Arc<S>,
    cache: Arc<SchemaCache>,
}

impl<S> Clone for CollectionSchemas<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S> CollectionSchemas<S> {
    /// Bind a store to a cache.
    pub fn new(store: Arc<S>, cache: Arc<SchemaCache>) -> Self {
        Self { store, cache }
    }

    /// Drop the cached schema for `collection`.
    pub fn invalidate(&self, collection: &CollectionName) -> bool {
        self.cache.invalidate(collection)
    }
}

impl<S: DocumentStore> CollectionSchemas<S> {
    /// Return the schema of `collection`, learning it with one bulk read on a
    /// cache miss.
    ///
    /// An empty collection yields an empty object schema, which callers treat
    /// as the bootstrap signal.
    pub async fn schema_for(
        &self,
        collection: &CollectionName,
    ) -> Result<Arc<SchemaNode>, DocumentStoreError> {
        self.cache
            .get_or_compute(collection, || async {
                let documents = self.store.query(collection, &QueryFilter::all()).await?;
                debug!(
                    collection = %collection,
                    documents = documents.len(),
                    "derived collection schema"
                );
                Ok::<_, DocumentStoreError>(derive_schema(
                    documents.iter().map(|stored| &stored.fields),
                ))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for schema memoisation.

    use super::*;
    use crate::domain::EntityKind;
    use crate::domain::ports::{MockDocumentStore, StoredDocument};
    use document_schema::document_from_json;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn clients() -> CollectionName {
        EntityKind::Client.collection()
    }

    fn stored(id: &str, value: serde_json::Value) -> StoredDocument {
        StoredDocument::new(
            id,
            document_from_json(value).expect("test documents are objects"),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn compute_runs_once_per_collection(clients: CollectionName) {
        let cache = SchemaCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            cache
                .get_or_compute(&clients, || {
                    calls += 1;
                    async { Ok::<_, ()>(SchemaNode::Value) }
                })
                .await
                .expect("compute succeeds");
        }

        assert_eq!(calls, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn failed_compute_is_not_cached(clients: CollectionName) {
        let cache = SchemaCache::new();
        let result = cache
            .get_or_compute(&clients, || async { Err::<SchemaNode, _>("offline") })
            .await;

        assert_eq!(result, Err("offline"));
        assert!(cache.get(&clients).is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn invalidate_forces_recompute(clients: CollectionName) {
        let cache = SchemaCache::new();
        cache
            .get_or_compute(&clients, || async { Ok::<_, ()>(SchemaNode::Value) })
            .await
            .expect("first compute");

        assert!(cache.invalidate(&clients));
        assert!(!cache.invalidate(&clients));

        let schema = cache
            .get_or_compute(&clients, || async {
                Ok::<_, ()>(SchemaNode::empty_object())
            })
            .await
            .expect("second compute");
        assert_eq!(*schema, SchemaNode::empty_object());
    }

    #[rstest]
    #[tokio::test]
    async fn clear_drops_every_collection(clients: CollectionName) {
        let cache = SchemaCache::new();
        let drivers = EntityKind::Driver.collection();
        for collection in [&clients, &drivers] {
            cache
                .get_or_compute(collection, || async { Ok::<_, ()>(SchemaNode::Value) })
                .await
                .expect("compute");
        }

        cache.clear();

        assert!(cache.get(&clients).is_none());
        assert!(cache.get(&drivers).is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn schema_for_reads_collection_once(clients: CollectionName) {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .withf(|collection, filter| collection.as_str() == "clients" && filter.is_empty())
            .times(1)
            .return_once(|_, _| {
                Ok(vec![
                    stored("a", json!({"name": "Ali", "address": {"city": "Riyadh"}})),
                    stored("b", json!({"phone": "0500"})),
                ])
            });
        let schemas = CollectionSchemas::new(Arc::new(store), Arc::new(SchemaCache::new()));

        let first = schemas.schema_for(&clients).await.expect("learn schema");
        let second = schemas.schema_for(&clients).await.expect("cached schema");

        assert_eq!(
            first.field_paths(),
            vec!["address", "address.city", "name", "phone"]
        );
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[rstest]
    #[tokio::test]
    async fn schema_for_propagates_store_failures(clients: CollectionName) {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .times(1)
            .return_once(|_, _| Err(DocumentStoreError::connection("offline")));
        let cache = Arc::new(SchemaCache::new());
        let schemas = CollectionSchemas::new(Arc::new(store), Arc::clone(&cache));

        let err = schemas.schema_for(&clients).await.expect_err("store offline");

        assert_eq!(err, DocumentStoreError::connection("offline"));
        assert!(cache.get(&clients).is_none());
    }
}
