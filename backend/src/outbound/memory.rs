//! Process-local document store.
//!
//! Collections live in a mutex-guarded map for the lifetime of the process.
//! Uniqueness-guarded creates check and insert under one lock acquisition,
//! so concurrent callers cannot both claim the same value.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use document_schema::Document;
use mockable::Clock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::CollectionName;
use crate::domain::ports::{
    DocumentStore, DocumentStoreError, QueryFilter, StoredDocument, display_value,
    ensure_no_document_id,
};
use crate::outbound::server_time::resolve_server_timestamps;

type Collection = BTreeMap<String, Document>;

/// In-memory [`DocumentStore`] adapter.
pub struct InMemoryDocumentStore {
    collections: Mutex<HashMap<CollectionName, Collection>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryDocumentStore {
    /// Create an empty store resolving server timestamps with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            collections: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<CollectionName, Collection>>, DocumentStoreError> {
        self.collections
            .lock()
            .map_err(|_| DocumentStoreError::connection("in-memory store lock poisoned"))
    }

    /// Insert a document under a caller-chosen identifier, replacing any
    /// existing one. Intended for seeding fixtures.
    pub fn seed(
        &self,
        collection: &CollectionName,
        id: impl Into<String>,
        fields: Document,
    ) -> Result<(), DocumentStoreError> {
        ensure_no_document_id(&fields)?;
        let resolved = resolve_server_timestamps(&fields, self.clock.utc());
        self.lock()?
            .entry(collection.clone())
            .or_default()
            .insert(id.into(), resolved);
        Ok(())
    }

    fn insert(
        &self,
        collection: &CollectionName,
        entries: &mut Collection,
        payload: &Document,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        entries.insert(id.clone(), resolve_server_timestamps(payload, self.clock.utc()));
        debug!(collection = %collection, id = %id, "document created in memory");
        id
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn query(
        &self,
        collection: &CollectionName,
        filter: &QueryFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, fields)| filter.matches(fields))
                    .map(|(id, fields)| StoredDocument::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(
        &self,
        collection: &CollectionName,
        payload: &Document,
    ) -> Result<String, DocumentStoreError> {
        ensure_no_document_id(payload)?;
        let mut collections = self.lock()?;
        let entries = collections.entry(collection.clone()).or_default();
        Ok(self.insert(collection, entries, payload))
    }

    async fn create_unique(
        &self,
        collection: &CollectionName,
        payload: &Document,
        unique_field: &str,
    ) -> Result<String, DocumentStoreError> {
        ensure_no_document_id(payload)?;
        let mut collections = self.lock()?;
        let entries = collections.entry(collection.clone()).or_default();
        if let Some(value) = payload.get(unique_field) {
            let filter = QueryFilter::eq(unique_field, value.clone());
            if entries.values().any(|fields| filter.matches(fields)) {
                return Err(DocumentStoreError::unique_violation(
                    collection.as_str(),
                    unique_field,
                    display_value(value),
                ));
            }
        }
        Ok(self.insert(collection, entries, payload))
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &str,
        patch: &Document,
    ) -> Result<(), DocumentStoreError> {
        ensure_no_document_id(patch)?;
        let mut collections = self.lock()?;
        let fields = collections
            .get_mut(collection)
            .and_then(|entries| entries.get_mut(id))
            .ok_or_else(|| DocumentStoreError::not_found(collection.as_str(), id))?;
        fields.extend(resolve_server_timestamps(patch, self.clock.utc()));
        Ok(())
    }
}
