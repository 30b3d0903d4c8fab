//! Schema inference and null-filling projection for schemaless document
//! collections.
//!
//! Collections in a hosted document database have no declared schema, yet
//! dashboard screens expect every record of a kind to carry the same fields.
//! This crate learns a collection's shape from the documents already stored
//! and projects new, partially filled records onto it:
//!
//! - [`derive_schema`] folds existing documents into a [`SchemaNode`].
//! - [`project`] and [`project_document`] emit exactly the learned fields,
//!   nulling whatever the caller omitted.
//! - [`overlay_unknown_fields`] keeps genuinely new fields the caller added.
//! - [`apply_timestamp_defaults`] swaps null creation/update timestamps for
//!   the store-resolved [`FieldValue::ServerTimestamp`] marker.
//!
//! The crate performs no I/O and holds no state.
//!
//! # Example
//!
//! ```
//! use document_schema::{
//!     apply_timestamp_defaults, derive_schema, document_from_json, overlay_unknown_fields,
//!     project_document, FieldValue,
//! };
//! use serde_json::json;
//!
//! let stored = document_from_json(json!({
//!     "name": "Ali",
//!     "createdAt": {"$timestamp": "2024-01-01T00:00:00Z"},
//!     "address": {"city": "Riyadh"},
//! }))
//! .expect("object root");
//! let schema = derive_schema([&stored]);
//!
//! let form = document_from_json(json!({"name": "Sara", "vip": true})).expect("object root");
//! let mut payload = project_document(&schema, &form);
//! overlay_unknown_fields(&mut payload, &form);
//! apply_timestamp_defaults(&mut payload);
//!
//! assert_eq!(payload.get("vip"), Some(&FieldValue::Bool(true)));
//! assert_eq!(payload.get("createdAt"), Some(&FieldValue::ServerTimestamp));
//! ```

mod project;
mod schema;
mod timestamps;
mod value;

pub use project::{overlay_unknown_fields, project, project_document};
pub use schema::{DOCUMENT_ID_FIELD, SchemaNode, derive_schema, merge_value};
pub use timestamps::{TIMESTAMP_FIELDS, apply_timestamp_defaults, apply_timestamp_defaults_with};
pub use value::{
    Document, FieldValue, SERVER_TIMESTAMP_KEY, TIMESTAMP_KEY, ValueError, document_from_json,
    document_to_json,
};
