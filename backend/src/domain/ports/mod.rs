//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod document_store;

#[cfg(test)]
pub use document_store::MockDocumentStore;
pub(crate) use document_store::display_value;
pub use document_store::{
    DocumentStore, DocumentStoreError, FIXTURE_DOCUMENT_ID, FixtureDocumentStore, QueryFilter,
    StoredDocument, ensure_no_document_id, lookup_path,
};
