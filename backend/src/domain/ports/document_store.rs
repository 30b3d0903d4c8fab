//! Port for the schemaless document store backing every collection.
//!
//! The dashboard talks to a hosted document database: collections of JSON
//! like records keyed by store-assigned identifiers. The [`DocumentStore`]
//! trait captures the four operations the data core needs (bulk query,
//! create, uniqueness-guarded create, and partial update) so domain services
//! stay independent of the concrete backend.

use async_trait::async_trait;
use document_schema::{DOCUMENT_ID_FIELD, Document, FieldValue};
use serde::Serialize;

use crate::domain::CollectionName;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document store adapters.
    pub enum DocumentStoreError {
        /// The store could not be reached or refused the session.
        Connection { message: String } =>
            "document store connection failed: {message}",
        /// A read failed during execution.
        Query { message: String } =>
            "document store query failed: {message}",
        /// A write failed during execution.
        Write { message: String } =>
            "document store write failed: {message}",
        /// The addressed document does not exist.
        NotFound { collection: String, id: String } =>
            "document '{id}' not found in {collection}",
        /// The payload carries a field the store owns.
        InvalidPayload { message: String } =>
            "document store rejected payload: {message}",
        /// A uniqueness-guarded write found the value already in use.
        UniqueViolation { collection: String, field: String, value: String } =>
            "{field} '{value}' already exists in {collection}",
    }
}

/// A document together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredDocument {
    /// Store-assigned identifier.
    pub id: String,
    /// Document body, excluding the identifier.
    pub fields: Document,
}

impl StoredDocument {
    /// Create a stored document.
    pub fn new(id: impl Into<String>, fields: Document) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Conjunction of equality predicates over document fields.
///
/// Paths are either top-level field names or dotted paths into nested maps
/// (`address.city`). An empty filter matches every document.
///
/// # Examples
/// ```
/// use document_schema::document_from_json;
/// use fleet_backend::domain::ports::QueryFilter;
/// use serde_json::json;
///
/// let doc = document_from_json(json!({"refid": "12345678", "address": {"city": "Riyadh"}}))
///     .expect("object root");
/// assert!(QueryFilter::eq("address.city", "Riyadh").matches(&doc));
/// assert!(!QueryFilter::eq("refid", "87654321").matches(&doc));
/// assert!(QueryFilter::all().matches(&doc));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryFilter {
    predicates: Vec<(String, FieldValue)>,
}

impl QueryFilter {
    /// Filter matching every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter matching documents whose `path` equals `value`.
    pub fn eq(path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::all().and_eq(path, value)
    }

    /// Add another equality predicate.
    pub fn and_eq(mut self, path: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.predicates.push((path.into(), value.into()));
        self
    }

    /// Borrow the predicates in insertion order.
    pub fn predicates(&self) -> &[(String, FieldValue)] {
        &self.predicates
    }

    /// Return `true` when the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Evaluate the filter against a document body.
    pub fn matches(&self, document: &Document) -> bool {
        self.predicates
            .iter()
            .all(|(path, expected)| lookup_path(document, path) == Some(expected))
    }
}

/// Resolve a dotted path inside a document.
pub fn lookup_path<'a>(document: &'a Document, path: &str) -> Option<&'a FieldValue> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(document.get(first)?, |current, segment| {
        current.as_map()?.get(segment)
    })
}

/// Reject payloads that set the store-owned identifier field.
///
/// Adapters call this before every create and update so the identifier
/// stays the one the store assigned.
pub fn ensure_no_document_id(payload: &Document) -> Result<(), DocumentStoreError> {
    if payload.contains_key(DOCUMENT_ID_FIELD) {
        return Err(DocumentStoreError::invalid_payload(format!(
            "top-level '{DOCUMENT_ID_FIELD}' is assigned by the store"
        )));
    }
    Ok(())
}

/// Render a field value as the plain text used in error messages.
pub(crate) fn display_value(value: &FieldValue) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_json().to_string(), str::to_owned)
}

/// Port for reading and writing documents.
///
/// # Uniqueness
///
/// [`DocumentStore::create_unique`] ships with a check-then-write default:
/// it queries for the value and writes only when nothing matched. Two
/// concurrent callers can both pass the check, so adapters that can make the
/// check and the insert atomic should override it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return every document in `collection` matching `filter`.
    async fn query(
        &self,
        collection: &CollectionName,
        filter: &QueryFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError>;

    /// Write a new document and return its assigned identifier.
    ///
    /// [`FieldValue::ServerTimestamp`] markers are replaced with the store's
    /// clock when the write commits. A top-level `id` field is rejected with
    /// [`DocumentStoreError::InvalidPayload`]; see [`ensure_no_document_id`].
    async fn create(
        &self,
        collection: &CollectionName,
        payload: &Document,
    ) -> Result<String, DocumentStoreError>;

    /// Write a new document unless another document already holds the same
    /// top-level `unique_field` value.
    ///
    /// A payload without `unique_field` is written unconditionally.
    async fn create_unique(
        &self,
        collection: &CollectionName,
        payload: &Document,
        unique_field: &str,
    ) -> Result<String, DocumentStoreError> {
        if let Some(value) = payload.get(unique_field) {
            let existing = self
                .query(collection, &QueryFilter::eq(unique_field, value.clone()))
                .await?;
            if !existing.is_empty() {
                return Err(DocumentStoreError::unique_violation(
                    collection.as_str(),
                    unique_field,
                    display_value(value),
                ));
            }
        }
        self.create(collection, payload).await
    }

    /// Merge `patch` into the top-level fields of an existing document.
    async fn update(
        &self,
        collection: &CollectionName,
        id: &str,
        patch: &Document,
    ) -> Result<(), DocumentStoreError>;
}

/// Fixture implementation for testing without a real store.
///
/// Every collection reads as empty and writes are discarded. Use it in unit
/// tests where persistence behaviour is not under test.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDocumentStore;

/// Identifier returned by [`FixtureDocumentStore`] for every write.
pub const FIXTURE_DOCUMENT_ID: &str = "fixture-document";

#[async_trait]
impl DocumentStore for FixtureDocumentStore {
    async fn query(
        &self,
        _collection: &CollectionName,
        _filter: &QueryFilter,
    ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
        Ok(Vec::new())
    }

    async fn create(
        &self,
        _collection: &CollectionName,
        _payload: &Document,
    ) -> Result<String, DocumentStoreError> {
        Ok(FIXTURE_DOCUMENT_ID.to_owned())
    }

    async fn update(
        &self,
        _collection: &CollectionName,
        _id: &str,
        _patch: &Document,
    ) -> Result<(), DocumentStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for filters and the default uniqueness check.

    use super::*;
    use crate::domain::EntityKind;
    use document_schema::document_from_json;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        document_from_json(value).expect("test documents are objects")
    }

    fn clients() -> CollectionName {
        EntityKind::Client.collection()
    }

    #[rstest]
    #[case("name", json!("Ali"), true)]
    #[case("address.city", json!("Riyadh"), true)]
    #[case("address.city", json!("Jeddah"), false)]
    #[case("address.city.name", json!("Riyadh"), false)]
    #[case("missing", json!(null), false)]
    #[case("wallet.balance", json!(15), true)]
    fn filters_follow_dotted_paths(
        #[case] path: &str,
        #[case] expected: Value,
        #[case] matched: bool,
    ) {
        let document = doc(json!({
            "name": "Ali",
            "address": {"city": "Riyadh"},
            "wallet": {"balance": 15},
        }));
        let value = FieldValue::try_from(expected).expect("plain value");
        assert_eq!(QueryFilter::eq(path, value).matches(&document), matched);
    }

    #[rstest]
    fn predicates_are_conjunctive() {
        let document = doc(json!({"name": "Ali", "phone": "0500"}));
        let filter = QueryFilter::eq("name", "Ali").and_eq("phone", "0599");
        assert!(!filter.matches(&document));
    }

    #[rstest]
    fn explicit_null_matches_null_filter() {
        let document = doc(json!({"refid": null}));
        assert!(QueryFilter::eq("refid", FieldValue::Null).matches(&document));
    }

    #[rstest]
    #[tokio::test]
    async fn default_create_unique_rejects_taken_values() {
        let mut store = MockDocumentStore::new();
        store.expect_query().times(1).return_once(|_, _| {
            Ok(vec![StoredDocument::new(
                "existing",
                doc(json!({"refid": "12345678"})),
            )])
        });
        store.expect_create().never();

        let store = CheckThenWrite(store);
        let payload = doc(json!({"refid": "12345678"}));
        let err = store
            .create_unique(&clients(), &payload, "refid")
            .await
            .expect_err("taken refid");

        assert_eq!(
            err,
            DocumentStoreError::unique_violation("clients", "refid", "12345678")
        );
    }

    #[rstest]
    #[tokio::test]
    async fn default_create_unique_writes_free_values() {
        let mut store = MockDocumentStore::new();
        store
            .expect_query()
            .withf(|collection, filter| {
                collection.as_str() == "clients"
                    && filter == &QueryFilter::eq("refid", "12345678")
            })
            .times(1)
            .return_once(|_, _| Ok(Vec::new()));
        store
            .expect_create()
            .times(1)
            .return_once(|_, _| Ok("new-id".to_owned()));

        let store = CheckThenWrite(store);
        let payload = doc(json!({"refid": "12345678"}));
        let id = store
            .create_unique(&clients(), &payload, "refid")
            .await
            .expect("free refid");

        assert_eq!(id, "new-id");
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_store_reads_empty_and_accepts_writes() {
        let store = FixtureDocumentStore;
        let documents = store
            .query(&clients(), &QueryFilter::all())
            .await
            .expect("fixture query");
        assert!(documents.is_empty());

        let id = store
            .create_unique(&clients(), &doc(json!({"refid": "1"})), "refid")
            .await
            .expect("fixture create");
        assert_eq!(id, FIXTURE_DOCUMENT_ID);
    }

    /// Forwards the required methods to a mock so the trait's default
    /// `create_unique` runs instead of the mocked one.
    struct CheckThenWrite(MockDocumentStore);

    #[async_trait]
    impl DocumentStore for CheckThenWrite {
        async fn query(
            &self,
            collection: &CollectionName,
            filter: &QueryFilter,
        ) -> Result<Vec<StoredDocument>, DocumentStoreError> {
            self.0.query(collection, filter).await
        }

        async fn create(
            &self,
            collection: &CollectionName,
            payload: &Document,
        ) -> Result<String, DocumentStoreError> {
            self.0.create(collection, payload).await
        }

        async fn update(
            &self,
            collection: &CollectionName,
            id: &str,
            patch: &Document,
        ) -> Result<(), DocumentStoreError> {
            self.0.update(collection, id, patch).await
        }
    }
}
