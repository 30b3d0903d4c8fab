//! Command-line driving adapter.
//!
//! ```text
//! fleetctl create --kind client --payload form.json
//! fleetctl backfill --kind driver --dry-run
//! fleetctl schema --kind product
//! ```
//!
//! Requests arrive as parsed values, are mapped onto the domain services and
//! answered with JSON, so the binary only handles argument parsing and I/O.

use std::sync::Arc;

use document_schema::{ValueError, document_from_json, document_to_json};
use serde_json::{Value, json};

use crate::domain::ports::DocumentStore;
use crate::domain::{
    BackfillOptions, CodeSource, CreateEntityRequest, EntityCreationService, EntityKind, Error,
    RefIdBackfillService, RefIdPolicy, SchemaCache,
};

/// A request issued from the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum CliRequest {
    /// Create one record from a JSON form payload.
    Create {
        /// Kind of record.
        kind: EntityKind,
        /// Form values as a JSON object.
        payload: Value,
    },
    /// Assign reference codes to records lacking one.
    Backfill {
        /// Kind of record.
        kind: EntityKind,
        /// Report without writing.
        dry_run: bool,
    },
    /// Show the learned schema of a kind's collection.
    DescribeSchema {
        /// Kind of record.
        kind: EntityKind,
    },
}

/// Policies used by the handler's services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliPolicies {
    /// Policy for interactive creation.
    pub create: RefIdPolicy,
    /// Policy for the backfill pass.
    pub backfill: RefIdPolicy,
}

impl CliPolicies {
    /// Interactive creation and batch backfill budgets.
    pub fn standard() -> Self {
        Self {
            create: RefIdPolicy::interactive(),
            backfill: RefIdPolicy::batch(),
        }
    }
}

/// Dispatches [`CliRequest`]s to the domain services.
pub struct CliHandler<S> {
    creation: EntityCreationService<S>,
    backfill: RefIdBackfillService<S>,
}

impl<S> CliHandler<S> {
    /// Wire both services to one store and a fresh schema cache.
    pub fn new(store: Arc<S>, code_source: Arc<dyn CodeSource>, policies: CliPolicies) -> Self {
        Self {
            creation: EntityCreationService::new(
                Arc::clone(&store),
                Arc::new(SchemaCache::new()),
                Arc::clone(&code_source),
                policies.create,
            ),
            backfill: RefIdBackfillService::new(store, code_source, policies.backfill),
        }
    }
}

fn map_payload_error(err: ValueError) -> Error {
    match err {
        ValueError::NotAnObject { found } => {
            Error::invalid_request(format!("payload must be a JSON object, found {found}"))
                .with_details(json!({ "field": "payload", "code": "not_an_object" }))
        }
        ValueError::InvalidTimestamp { value, message } => {
            Error::invalid_request(format!("invalid timestamp '{value}': {message}"))
                .with_details(json!({ "field": "payload", "code": "invalid_timestamp" }))
        }
    }
}

impl<S: DocumentStore> CliHandler<S> {
    /// Run one request and return its JSON answer.
    ///
    /// # Errors
    ///
    /// Payload validation failures and every error of the underlying
    /// service.
    pub async fn handle(&self, request: CliRequest) -> Result<Value, Error> {
        match request {
            CliRequest::Create { kind, payload } => {
                let fields = document_from_json(payload).map_err(map_payload_error)?;
                let created = self
                    .creation
                    .create(CreateEntityRequest { kind, fields })
                    .await?;
                Ok(json!({
                    "kind": created.kind,
                    "id": created.id,
                    "refid": created.refid,
                    "attempts": created.attempts,
                    "document": document_to_json(&created.document),
                }))
            }
            CliRequest::Backfill { kind, dry_run } => {
                let report = self
                    .backfill
                    .backfill(kind, BackfillOptions { dry_run })
                    .await?;
                serde_json::to_value(report)
                    .map_err(|err| Error::internal(format!("failed to encode report: {err}")))
            }
            CliRequest::DescribeSchema { kind } => {
                let schema = self.creation.describe_schema(kind).await?;
                Ok(json!({
                    "kind": kind,
                    "collection": kind.collection(),
                    "fields": schema.field_paths(),
                    "schema": &*schema,
                }))
            }
        }
    }
}
