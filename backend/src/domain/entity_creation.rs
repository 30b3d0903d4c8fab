//! Entity creation service.
//!
//! Creating a record from a dashboard form runs the same pipeline for every
//! kind:
//!
//! 1. Full-schema kinds learn their collection's schema (cached), project the
//!    form onto it so omitted fields are stored as null, then overlay any
//!    genuinely new fields from the form.
//! 2. Null creation/update timestamps become server-time markers.
//! 3. A reference code is issued and the document is written with a
//!    uniqueness guard on `refid`. A code claimed concurrently between the
//!    availability check and the write is retried within the same attempt
//!    budget.
//! 4. When the write added fields the cached schema lacked, the cache entry
//!    is dropped so the next creation relearns it.
//!
//! Running out of attempts aborts before anything is written.

use std::sync::Arc;

use document_schema::{
    DOCUMENT_ID_FIELD, Document, SchemaNode, apply_timestamp_defaults, overlay_unknown_fields,
    project_document,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{DocumentStore, DocumentStoreError};
use crate::domain::store_errors::map_store_error;
use crate::domain::{
    CodeSource, CollectionName, CollectionSchemas, EntityKind, Error, IssueError, IssuedCode,
    REFID_FIELD, RefId, RefIdIssuer, RefIdPolicy, SchemaCache,
};

/// Request to create one record.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateEntityRequest {
    /// Kind of record, which selects the collection.
    pub kind: EntityKind,
    /// Form values supplied by the operator.
    pub fields: Document,
}

/// A record written by [`EntityCreationService::create`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEntity {
    /// Kind of record.
    pub kind: EntityKind,
    /// Store-assigned identifier.
    pub id: String,
    /// Reference code stored in the `refid` field.
    pub refid: RefId,
    /// Issuance attempts consumed, across write retries.
    pub attempts: u32,
    /// Document body as sent to the store.
    pub document: Document,
}

struct PreparedPayload {
    payload: Document,
    schema_stale: bool,
}

/// Entity creation service implementing the create pipeline.
pub struct EntityCreationService<S> {
    store: Arc<S>,
    schemas: CollectionSchemas<S>,
    issuer: RefIdIssuer<S>,
}

impl<S> Clone for EntityCreationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            schemas: self.schemas.clone(),
            issuer: self.issuer.clone(),
        }
    }
}

impl<S> EntityCreationService<S> {
    /// Create a service writing to `store`.
    pub fn new(
        store: Arc<S>,
        cache: Arc<SchemaCache>,
        code_source: Arc<dyn CodeSource>,
        policy: RefIdPolicy,
    ) -> Self {
        Self {
            schemas: CollectionSchemas::new(Arc::clone(&store), cache),
            issuer: RefIdIssuer::new(Arc::clone(&store), code_source, policy),
            store,
        }
    }
}

impl<S> EntityCreationService<S>
where
    S: DocumentStore,
{
    fn refid_exhausted(collection: &CollectionName, attempts: u32) -> Error {
        Error::refid_unavailable(format!(
            "failed to generate a unique refid for {collection} after {attempts} attempts"
        ))
        .with_details(json!({
            "collection": collection.as_str(),
            "attempts": attempts,
        }))
    }

    fn map_issue_error(
        collection: &CollectionName,
        consumed: u32,
        error: IssueError<DocumentStoreError>,
    ) -> Error {
        match error {
            IssueError::Exhausted { attempts } => {
                Self::refid_exhausted(collection, consumed + attempts)
            }
            IssueError::Lookup(source) => map_store_error(source),
        }
    }

    /// Return the learned schema of a kind's collection.
    pub async fn describe_schema(&self, kind: EntityKind) -> Result<Arc<SchemaNode>, Error> {
        self.schemas
            .schema_for(&kind.collection())
            .await
            .map_err(map_store_error)
    }

    /// Create one record.
    ///
    /// # Errors
    ///
    /// - [`ErrorCode::InvalidRequest`](crate::domain::ErrorCode::InvalidRequest)
    ///   when the form carries a top-level `id`.
    /// - [`ErrorCode::RefidUnavailable`](crate::domain::ErrorCode::RefidUnavailable)
    ///   when no unused code was found; nothing is written.
    /// - Store failures mapped by kind (connection failures become
    ///   service unavailable).
    pub async fn create(&self, request: CreateEntityRequest) -> Result<CreatedEntity, Error> {
        let CreateEntityRequest { kind, fields } = request;
        if fields.contains_key(DOCUMENT_ID_FIELD) {
            return Err(
                Error::invalid_request("document id is assigned by the store")
                    .with_details(json!({ "field": DOCUMENT_ID_FIELD })),
            );
        }

        let collection = kind.collection();
        let PreparedPayload {
            mut payload,
            schema_stale,
        } = self.prepare_payload(kind, &collection, fields).await?;

        let defaulted = apply_timestamp_defaults(&mut payload);
        if defaulted > 0 {
            debug!(collection = %collection, defaulted, "timestamp fields set to server time");
        }

        let (id, issued) = self.write_with_refid(&collection, &mut payload).await?;

        if schema_stale {
            self.schemas.invalidate(&collection);
        }

        info!(
            kind = %kind,
            id = %id,
            refid = %issued.refid,
            attempts = issued.attempts,
            "entity created"
        );
        Ok(CreatedEntity {
            kind,
            id,
            refid: issued.refid,
            attempts: issued.attempts,
            document: payload,
        })
    }

    async fn prepare_payload(
        &self,
        kind: EntityKind,
        collection: &CollectionName,
        fields: Document,
    ) -> Result<PreparedPayload, Error> {
        if !kind.uses_full_schema() {
            return Ok(PreparedPayload {
                payload: fields,
                schema_stale: false,
            });
        }

        let schema = self
            .schemas
            .schema_for(collection)
            .await
            .map_err(map_store_error)?;
        let bootstrapped = schema.is_empty() && !fields.is_empty();
        if bootstrapped {
            debug!(collection = %collection, "bootstrapping schema from first document");
        }

        let mut payload = project_document(&schema, &fields);
        let added = overlay_unknown_fields(&mut payload, &fields);
        if !added.is_empty() {
            debug!(collection = %collection, fields = ?added, "form adds fields unknown to schema");
        }

        Ok(PreparedPayload {
            payload,
            schema_stale: bootstrapped || !added.is_empty() || schema.field(REFID_FIELD).is_none(),
        })
    }

    async fn write_with_refid(
        &self,
        collection: &CollectionName,
        payload: &mut Document,
    ) -> Result<(String, IssuedCode), Error> {
        let policy = self.issuer.policy();
        let mut consumed = 0_u32;

        loop {
            let budget = policy
                .with_max_attempts(policy.max_attempts() - consumed)
                .map_err(|err| Error::internal(format!("invalid refid budget: {err}")))?;
            let issued = self
                .issuer
                .issue_with_policy(collection, &budget)
                .await
                .map_err(|err| Self::map_issue_error(collection, consumed, err))?;
            consumed += issued.attempts;

            payload.insert(REFID_FIELD.to_owned(), issued.refid.clone().into());
            match self
                .store
                .create_unique(collection, payload, REFID_FIELD)
                .await
            {
                Ok(id) => {
                    return Ok((
                        id,
                        IssuedCode {
                            refid: issued.refid,
                            attempts: consumed,
                        },
                    ));
                }
                Err(DocumentStoreError::UniqueViolation { .. })
                    if consumed < policy.max_attempts() =>
                {
                    debug!(
                        collection = %collection,
                        refid = %issued.refid,
                        consumed,
                        "refid claimed before write; issuing another"
                    );
                }
                Err(DocumentStoreError::UniqueViolation { .. }) => {
                    warn!(collection = %collection, consumed, "refid budget spent on write collisions");
                    return Err(Self::refid_exhausted(collection, consumed));
                }
                Err(err) => return Err(map_store_error(err)),
            }
        }
    }
}

#[cfg(test)]
#[path = "entity_creation_tests.rs"]
mod tests;
