//! Batch pass assigning reference codes to records created before refids.
//!
//! The collection is read once. Every code already present seeds a
//! [`RefIdReservations`] set, so candidates colliding with existing records or
//! with codes handed out earlier in the same pass are rejected without a store
//! round trip. Codes use the batch attempt budget.
//!
//! A record whose issuance exhausts its budget is reported and skipped; the
//! pass carries on. Store failures abort the pass, leaving the records already
//! updated in place.

use std::sync::Arc;

use document_schema::{Document, FieldValue};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::ports::{DocumentStore, QueryFilter, display_value};
use crate::domain::store_errors::map_store_error;
use crate::domain::{
    CodeSource, EntityKind, Error, IssueError, REFID_FIELD, RefId, RefIdIssuer, RefIdPolicy,
    RefIdReservations,
};

/// Options for one backfill pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillOptions {
    /// Issue codes and report them without writing.
    pub dry_run: bool,
}

/// A code assigned to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignedRefId {
    /// Record identifier.
    pub id: String,
    /// Code assigned.
    pub refid: RefId,
}

/// Outcome of a backfill pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillReport {
    /// Kind of record processed.
    pub kind: EntityKind,
    /// Whether writes were skipped.
    pub dry_run: bool,
    /// Records read.
    pub scanned: usize,
    /// Records that already carried a code.
    pub already_set: usize,
    /// Codes assigned, in collection order.
    pub assigned: Vec<AssignedRefId>,
    /// Records left without a code because issuance ran out of attempts.
    pub failed: Vec<String>,
}

fn existing_refid(fields: &Document) -> Option<String> {
    match fields.get(REFID_FIELD) {
        None | Some(FieldValue::Null) => None,
        Some(FieldValue::String(code)) if code.trim().is_empty() => None,
        Some(value) => Some(display_value(value)),
    }
}

/// Assigns reference codes to records lacking one.
pub struct RefIdBackfillService<S> {
    store: Arc<S>,
    issuer: RefIdIssuer<S>,
}

impl<S> Clone for RefIdBackfillService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            issuer: self.issuer.clone(),
        }
    }
}

impl<S> RefIdBackfillService<S> {
    /// Create a service issuing codes under `policy`, normally
    /// [`RefIdPolicy::batch`].
    pub fn new(store: Arc<S>, code_source: Arc<dyn CodeSource>, policy: RefIdPolicy) -> Self {
        Self {
            issuer: RefIdIssuer::new(Arc::clone(&store), code_source, policy),
            store,
        }
    }
}

impl<S> RefIdBackfillService<S>
where
    S: DocumentStore,
{
    /// Run one pass over the collection of `kind`.
    ///
    /// # Errors
    ///
    /// Store failures while reading, checking codes or updating, mapped the same way
    /// as for entity creation.
    pub async fn backfill(
        &self,
        kind: EntityKind,
        options: BackfillOptions,
    ) -> Result<BackfillReport, Error> {
        let collection = kind.collection();
        let documents = self
            .store
            .query(&collection, &QueryFilter::all())
            .await
            .map_err(map_store_error)?;

        let mut reservations = RefIdReservations::new();
        let mut pending = Vec::new();
        for stored in &documents {
            match existing_refid(&stored.fields) {
                Some(code) => reservations.seed([code]),
                None => pending.push(stored.id.as_str()),
            }
        }

        let mut report = BackfillReport {
            kind,
            dry_run: options.dry_run,
            scanned: documents.len(),
            already_set: documents.len() - pending.len(),
            assigned: Vec::with_capacity(pending.len()),
            failed: Vec::new(),
        };
        debug!(
            collection = %collection,
            scanned = report.scanned,
            pending = pending.len(),
            "refid backfill started"
        );

        for id in pending {
            let issued = match self
                .issuer
                .issue_reserving(&collection, &mut reservations)
                .await
            {
                Ok(issued) => issued,
                Err(IssueError::Exhausted { attempts }) => {
                    warn!(collection = %collection, id, attempts, "no free refid for record");
                    report.failed.push(id.to_owned());
                    continue;
                }
                Err(IssueError::Lookup(source)) => return Err(map_store_error(source)),
            };

            if !options.dry_run {
                let mut patch = Document::new();
                patch.insert(REFID_FIELD.to_owned(), issued.refid.clone().into());
                self.store
                    .update(&collection, id, &patch)
                    .await
                    .map_err(map_store_error)?;
            }
            debug!(collection = %collection, id, refid = %issued.refid, "refid assigned");
            report.assigned.push(AssignedRefId {
                id: id.to_owned(),
                refid: issued.refid,
            });
        }

        info!(
            collection = %collection,
            scanned = report.scanned,
            assigned = report.assigned.len(),
            failed = report.failed.len(),
            dry_run = options.dry_run,
            "refid backfill finished"
        );
        Ok(report)
    }
}
