//! Domain primitives and services of the fleet data core.
//!
//! Purpose: turn operator form input into well-shaped documents and give
//! every record a unique reference code. Services depend only on the ports
//! in [`ports`]; adapters live in `outbound`.
//!
//! Public surface:
//! - Error / ErrorCode: error payload and stable identifiers.
//! - EntityKind / CollectionName: record kinds and their collections.
//! - SchemaCache / CollectionSchemas: memoised learned schemas.
//! - RefId / RefIdPolicy / RefIdIssuer: reference code issuance.
//! - EntityCreationService: the create pipeline.
//! - RefIdBackfillService: batch assignment of missing codes.

pub mod collection;
pub mod entity_creation;
pub mod error;
pub mod localization;
pub mod ports;
pub mod refid;
pub mod refid_backfill;
pub mod schema_cache;
pub(crate) mod store_errors;

pub use self::collection::{
    CollectionName, CollectionNameError, EntityKind, EntityKindParseError,
};
pub use self::entity_creation::{CreateEntityRequest, CreatedEntity, EntityCreationService};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::localization::{Locale, LocaleParseError};
#[cfg(test)]
pub use self::refid::MockCodeSource;
pub use self::refid::{
    BATCH_MAX_ATTEMPTS, CodeSource, DEFAULT_REFID_DIGITS, INTERACTIVE_MAX_ATTEMPTS, IssueError,
    IssuedCode, MAX_REFID_DIGITS, REFID_FIELD, RandomCodeSource, RefId, RefIdError, RefIdIssuer,
    RefIdPolicy, RefIdPolicyError, RefIdReservations, SequenceCodeSource, issue_reserved_code,
    issue_unique_code,
};
pub use self::refid_backfill::{
    AssignedRefId, BackfillOptions, BackfillReport, RefIdBackfillService,
};
pub use self::schema_cache::{CollectionSchemas, SchemaCache};

/// Convenient result alias for domain services.
///
/// # Examples
/// ```
/// use fleet_backend::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<u32> {
///     Err(Error::not_found("no such record"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
