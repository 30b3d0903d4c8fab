//! JSON file document store.
//!
//! Each collection is one `<collection>.json` file holding an array of
//! objects; the store-assigned identifier is kept in each object's `id`
//! field. Files are replaced atomically on every write. All writes from one
//! store instance are serialised through an async lock, which makes
//! uniqueness-guarded creates atomic within the process. Separate processes
//! writing the same directory are not coordinated.

mod atomic_write;

use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::ambient_authority;
use cap_std::fs::Dir;
use document_schema::{DOCUMENT_ID_FIELD, Document, document_from_json, document_to_json};
use mockable::Clock;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use self::atomic_write::write_atomic;
use crate::domain::CollectionName;
use crate::domain::ports::{
    DocumentStore, DocumentStoreError, QueryFilter, StoredDocument, display_value,
    ensure_no_document_id,
};
use crate::outbound::server_time::resolve_server_timestamps;

/// File-backed [`DocumentStore`] adapter.
pub struct JsonFileDocumentStore {
    dir: Dir,
    clock: Arc<dyn Clock>,
    write_lock: Mutex<()>,
}

impl JsonFileDocumentStore {
    /// Open `path`, creating it when missing.
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> io::Result<Self> {
        Dir::create_ambient_dir_all(path, ambient_authority())?;
        let dir = Dir::open_ambient_dir(path, ambient_authority())?;
        Ok(Self::from_dir(dir, clock))
    }

    /// Use an already opened directory.
    pub fn from_dir(dir: Dir, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    fn file_name(collection: &CollectionName) -> String {
        format!("{collection}.json")
    }

    fn load(
        &self,
        collection: &CollectionName,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let file_name = Self::file_name(collection);
        let raw = match self.dir.read_to_string(&file_name) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(DocumentStoreError::query(format!(
                    "failed to read {file_name}: {err}"
                )));
            }
        };
        parse_collection(&raw)
            .map_err(|message| DocumentStoreError::query(format!("{file_name}: {message}")))
    }

    fn save(
        &self,
        collection: &CollectionName,
        documents: &[StoredDocument],
    ) -> Result<(), DocumentStoreError> {
        let file_name = Self::file_name(collection);
        let contents =
            serde_json::to_string_pretty(&render_collection(documents)).map_err(|err| {
                DocumentStoreError::write(format!("failed to encode {file_name}: {err}"))
            })?;
        write_atomic(&self.dir, &file_name, &contents).map_err(|err| {
            warn!(collection = %collection, error = %err, "collection file write failed");
            DocumentStoreError::write(format!("failed to write {file_name}: {err}"))
        })
    }

    fn append(
        &self,
        collection: &CollectionName,
        mut documents: Vec<StoredDocument>,
        payload: &Document,
    ) -> Result<String, DocumentStoreError> {
        let id = Uuid::new_v4().to_string();
        documents.push(StoredDocument::new(
            id.clone(),
            resolve_server_timestamps(payload, self.clock.utc()),
        ));
        self.save(collection, &documents)?;
        debug!(collection = %collection, id = %id, "document appended to collection file");
        Ok(id)
    }
}

fn parse_collection(raw: &str) -> Result<Vec<StoredDocument>, String> {
    let value: Value = serde_json::from_str(raw).map_err(|err| err.to_string())?;
    let Value::Array(records) = value else {
        return Err("collection file must hold a JSON array".to_owned());
    };
    records
        .into_iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record))
        .collect()
}

fn parse_record(index: usize, record: Value) -> Result<StoredDocument, String> {
    let Value::Object(mut entries) = record else {
        return Err(format!("record {index} is not an object"));
    };
    let Some(Value::String(id)) = entries.remove(DOCUMENT_ID_FIELD) else {
        return Err(format!("record {index} has no string id"));
    };
    let fields = document_from_json(Value::Object(entries))
        .map_err(|err| format!("record {index}: {err}"))?;
    Ok(StoredDocument::new(id, fields))
}

fn render_collection(documents: &[StoredDocument]) -> Value {
    Value::Array(
        documents
            .iter()
            .map(|stored| {
                let mut record = serde_json::Map::new();
                record.insert(
                    DOCUMENT_ID_FIELD.to_owned(),
                    Value::String(stored.id.clone()),
                );
                if let Value::Object(fields) = document_to_json(&stored.fields) {
                    record.extend(fields);
                }
                Value::Object(record)
            })
            .collect(),
    )
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    async fn query(
        &self,
        collection: &CollectionName,
        filter: &QueryFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        let mut documents = self.load(collection)?;
        documents.retain(|stored| filter.matches(&stored.fields));
        Ok(documents)
    }

    async fn create(
        &self,
        collection: &CollectionName,
        payload: &Document,
    ) -> Result<String, DocumentStoreError> {
        ensure_no_document_id(payload)?;
        let _guard = self.write_lock.lock().await;
        let documents = self.load(collection)?;
        self.append(collection, documents, payload)
    }

    async fn create_unique(
        &self,
        collection: &CollectionName,
        payload: &Document,
        unique_field: &str,
    ) -> Result<String, DocumentStoreError> {
        ensure_no_document_id(payload)?;
        let _guard = self.write_lock.lock().await;
        let documents = self.load(collection)?;
        if let Some(value) = payload.get(unique_field) {
            let filter = QueryFilter::eq(unique_field, value.clone());
            if documents.iter().any(|stored| filter.matches(&stored.fields)) {
                return Err(DocumentStoreError::unique_violation(
                    collection.as_str(),
                    unique_field,
                    display_value(value),
                ));
            }
        }
        self.append(collection, documents, payload)
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &str,
        patch: &Document,
    ) -> Result<(), DocumentStoreError> {
        ensure_no_document_id(patch)?;
        let _guard = self.write_lock.lock().await;
        let mut documents = self.load(collection)?;
        let target = documents
            .iter_mut()
            .find(|stored| stored.id == id)
            .ok_or_else(|| DocumentStoreError::not_found(collection.as_str(), id))?;
        target
            .fields
            .extend(resolve_server_timestamps(patch, self.clock.utc()));
        self.save(collection, &documents)
    }
}
