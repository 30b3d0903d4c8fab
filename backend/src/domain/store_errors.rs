//! Translation of document store failures into domain errors.

use serde_json::json;

use crate::domain::Error;
use crate::domain::ports::DocumentStoreError;

/// Map a store failure onto the domain error taxonomy.
///
/// Connection failures are retryable by the operator and surface as
/// service unavailable; uniqueness violations surface as conflicts.
pub(crate) fn map_store_error(error: DocumentStoreError) -> Error {
    match error {
        DocumentStoreError::Connection { message } => {
            Error::service_unavailable(format!("document store unavailable: {message}"))
        }
        DocumentStoreError::Query { message } => {
            Error::internal(format!("document store query failed: {message}"))
        }
        DocumentStoreError::Write { message } => {
            Error::internal(format!("document store write failed: {message}"))
        }
        DocumentStoreError::InvalidPayload { message } => {
            Error::invalid_request(format!("document rejected by the store: {message}"))
        }
        DocumentStoreError::NotFound { collection, id } => {
            Error::not_found(format!("document '{id}' not found in {collection}"))
                .with_details(json!({ "collection": collection, "id": id }))
        }
        DocumentStoreError::UniqueViolation {
            collection,
            field,
            value,
        } => Error::conflict(format!("{field} '{value}' already exists in {collection}"))
            .with_details(json!({ "collection": collection, "field": field, "value": value })),
    }
}
