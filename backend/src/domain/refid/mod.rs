//! Reference codes ("refids") for dashboard records.
//!
//! Every client, driver, product, coupon, transfer and notification carries a
//! short decimal code that operators read over the phone and print on
//! receipts. Codes are drawn at random from a fixed-width range and checked
//! against the collection before use, with a bounded number of attempts. When
//! the budget runs out issuance fails; there is no sentinel fallback code.
//!
//! Batch migrations issue many codes in one pass. They seed a
//! [`RefIdReservations`] set with every code already in the collection and
//! with each code they hand out, so candidates colliding inside the batch are
//! rejected without another store round trip.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use document_schema::FieldValue;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::CollectionName;
use crate::domain::ports::{DocumentStore, DocumentStoreError, QueryFilter};

/// Top-level document field holding the reference code.
pub const REFID_FIELD: &str = "refid";

/// Code width used by the dashboard.
pub const DEFAULT_REFID_DIGITS: u32 = 8;

/// Attempt budget for codes issued while an operator waits.
pub const INTERACTIVE_MAX_ATTEMPTS: u32 = 10;

/// Attempt budget for codes issued by batch migrations.
pub const BATCH_MAX_ATTEMPTS: u32 = 20;

/// Widest code whose range still fits in a `u64`.
pub const MAX_REFID_DIGITS: u32 = 18;

/// Validation errors for [`RefId`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefIdError {
    /// The code was empty.
    #[error("reference code must not be empty")]
    Empty,
    /// The code had the wrong number of digits.
    #[error("reference code must have {expected} digits, found {actual}")]
    WrongLength {
        /// Required width.
        expected: u32,
        /// Width supplied.
        actual: usize,
    },
    /// The code contained a non-digit character.
    #[error("reference code '{value}' must contain only decimal digits")]
    NonDigit {
        /// Rejected input.
        value: String,
    },
    /// The code started with `0`.
    #[error("reference code '{value}' must not start with zero")]
    LeadingZero {
        /// Rejected input.
        value: String,
    },
}

/// Fixed-width decimal reference code.
///
/// ## Invariants
/// - Only ASCII digits.
/// - Exactly the configured number of digits.
/// - No leading zero, so the numeric value has the same width.
///
/// # Examples
/// ```
/// use fleet_backend::domain::RefId;
///
/// let code = RefId::parse("12345678", 8).expect("valid code");
/// assert_eq!(code.as_str(), "12345678");
/// assert!(RefId::parse("01234567", 8).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Validate a code of `digits` width.
    pub fn parse(value: &str, digits: u32) -> Result<Self, RefIdError> {
        if value.is_empty() {
            return Err(RefIdError::Empty);
        }
        if !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(RefIdError::NonDigit {
                value: value.to_owned(),
            });
        }
        if value.len() != digits as usize {
            return Err(RefIdError::WrongLength {
                expected: digits,
                actual: value.len(),
            });
        }
        if value.starts_with('0') {
            return Err(RefIdError::LeadingZero {
                value: value.to_owned(),
            });
        }
        Ok(Self(value.to_owned()))
    }

    /// Build a code from a candidate already drawn from a policy's range.
    fn from_candidate(candidate: u64) -> Self {
        Self(candidate.to_string())
    }

    /// Borrow the code text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<RefId> for FieldValue {
    fn from(value: RefId) -> Self {
        Self::String(value.0)
    }
}

impl From<RefId> for String {
    fn from(value: RefId) -> Self {
        value.0
    }
}

/// Validation errors for [`RefIdPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefIdPolicyError {
    /// Width outside `1..=18`.
    #[error("reference code width must be between 1 and {MAX_REFID_DIGITS}, got {digits}")]
    DigitsOutOfRange {
        /// Rejected width.
        digits: u32,
    },
    /// Attempt budget of zero.
    #[error("reference code attempt budget must be at least 1")]
    ZeroAttempts,
}

/// Width and attempt budget for issuing codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefIdPolicy {
    digits: u32,
    max_attempts: u32,
}

impl RefIdPolicy {
    /// Validate and build a policy.
    pub fn new(digits: u32, max_attempts: u32) -> Result<Self, RefIdPolicyError> {
        if !(1..=MAX_REFID_DIGITS).contains(&digits) {
            return Err(RefIdPolicyError::DigitsOutOfRange { digits });
        }
        if max_attempts == 0 {
            return Err(RefIdPolicyError::ZeroAttempts);
        }
        Ok(Self {
            digits,
            max_attempts,
        })
    }

    /// Eight digits, ten attempts.
    pub const fn interactive() -> Self {
        Self {
            digits: DEFAULT_REFID_DIGITS,
            max_attempts: INTERACTIVE_MAX_ATTEMPTS,
        }
    }

    /// Eight digits, twenty attempts.
    pub const fn batch() -> Self {
        Self {
            digits: DEFAULT_REFID_DIGITS,
            max_attempts: BATCH_MAX_ATTEMPTS,
        }
    }

    /// Same width with a different attempt budget.
    pub fn with_max_attempts(self, max_attempts: u32) -> Result<Self, RefIdPolicyError> {
        Self::new(self.digits, max_attempts)
    }

    /// Code width.
    pub fn digits(&self) -> u32 {
        self.digits
    }

    /// Attempt budget.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Inclusive range of candidate values: `10^(d-1) ..= 10^d - 1`.
    pub fn candidate_range(&self) -> RangeInclusive<u64> {
        let low = 10_u64.pow(self.digits - 1);
        let high = 10_u64.pow(self.digits) - 1;
        low..=high
    }
}

impl Default for RefIdPolicy {
    fn default() -> Self {
        Self::interactive()
    }
}

/// Source of candidate code values.
#[cfg_attr(test, mockall::automock)]
pub trait CodeSource: Send + Sync {
    /// Draw a value from `range`, uniformly for production sources.
    fn draw(&self, range: RangeInclusive<u64>) -> u64;
}

/// Thread-local RNG backed code source.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn draw(&self, range: RangeInclusive<u64>) -> u64 {
        rand::thread_rng().gen_range(range)
    }
}

/// Deterministic code source replaying a fixed list of values.
///
/// Values cycle once exhausted and are clamped into the requested range. An
/// empty list always yields the lower bound.
///
/// # Examples
/// ```
/// use fleet_backend::domain::{CodeSource, SequenceCodeSource};
///
/// let source = SequenceCodeSource::new([12_345_678, 5]);
/// assert_eq!(source.draw(10_000_000..=99_999_999), 12_345_678);
/// assert_eq!(source.draw(10_000_000..=99_999_999), 10_000_000);
/// assert_eq!(source.draw(10_000_000..=99_999_999), 12_345_678);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCodeSource {
    values: Vec<u64>,
    next: AtomicUsize,
}

impl SequenceCodeSource {
    /// Replay `values` in order.
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl CodeSource for SequenceCodeSource {
    fn draw(&self, range: RangeInclusive<u64>) -> u64 {
        let (low, high) = range.into_inner();
        if self.values.is_empty() {
            return low;
        }
        let position = self.next.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values
            .get(position)
            .map_or(low, |value| (*value).clamp(low, high))
    }
}

/// A successfully issued code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCode {
    /// The code.
    pub refid: RefId,
    /// Attempts consumed, including the successful one.
    pub attempts: u32,
}

/// Failures raised while issuing a code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IssueError<E> {
    /// Every attempt produced a code already in use.
    #[error("failed to generate a unique reference code after {attempts} attempts")]
    Exhausted {
        /// Attempts consumed.
        attempts: u32,
    },
    /// The availability check itself failed.
    #[error("reference code availability check failed: {0}")]
    Lookup(#[source] E),
}

/// Codes claimed during one batch pass.
#[derive(Debug, Clone, Default)]
pub struct RefIdReservations {
    codes: HashSet<String>,
}

impl RefIdReservations {
    /// Create an empty reservation set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record codes that already exist.
    pub fn seed<I, T>(&mut self, codes: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.codes.extend(codes.into_iter().map(Into::into));
    }

    /// Claim a code. Returns `false` when it was already claimed.
    pub fn reserve(&mut self, refid: &RefId) -> bool {
        self.codes.insert(refid.as_str().to_owned())
    }

    /// Return `true` when `code` is claimed.
    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Number of claimed codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Return `true` when nothing is claimed.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Issue a code that `is_taken` reports as unused.
///
/// `is_taken` answers "is this candidate taken?". It is called at most
/// `policy.max_attempts()` times, once per attempt. Exhausting the budget
/// returns [`IssueError::Exhausted`]; a failed lookup stops immediately.
///
/// # Examples
/// ```
/// use std::convert::Infallible;
///
/// use fleet_backend::domain::{RefIdPolicy, SequenceCodeSource, issue_unique_code};
///
/// # tokio::runtime::Builder::new_current_thread().build().expect("runtime").block_on(async {
/// let source = SequenceCodeSource::new([12_345_678, 87_654_321]);
/// let issued = issue_unique_code(&RefIdPolicy::interactive(), &source, |candidate| async move {
///     Ok::<_, Infallible>(candidate.as_str() == "12345678")
/// })
/// .await
/// .expect("second candidate is free");
///
/// assert_eq!(issued.refid.as_str(), "87654321");
/// assert_eq!(issued.attempts, 2);
/// # });
/// ```
pub async fn issue_unique_code<C, P, Fut, E>(
    policy: &RefIdPolicy,
    source: &C,
    is_taken: P,
) -> Result<IssuedCode, IssueError<E>>
where
    C: CodeSource + ?Sized,
    P: FnMut(RefId) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    issue(policy, source, None, is_taken).await
}

/// Batch variant of [`issue_unique_code`].
///
/// Candidates already in `reservations` consume an attempt without calling
/// `is_taken`. The issued code is added to `reservations`.
pub async fn issue_reserved_code<C, P, Fut, E>(
    policy: &RefIdPolicy,
    source: &C,
    reservations: &mut RefIdReservations,
    is_taken: P,
) -> Result<IssuedCode, IssueError<E>>
where
    C: CodeSource + ?Sized,
    P: FnMut(RefId) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    issue(policy, source, Some(reservations), is_taken).await
}

async fn issue<C, P, Fut, E>(
    policy: &RefIdPolicy,
    source: &C,
    mut reservations: Option<&mut RefIdReservations>,
    mut is_taken: P,
) -> Result<IssuedCode, IssueError<E>>
where
    C: CodeSource + ?Sized,
    P: FnMut(RefId) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let range = policy.candidate_range();
    for attempt in 1..=policy.max_attempts() {
        let candidate = RefId::from_candidate(
            source
                .draw(range.clone())
                .clamp(*range.start(), *range.end()),
        );

        if reservations
            .as_deref()
            .is_some_and(|claimed| claimed.contains(candidate.as_str()))
        {
            debug!(attempt, candidate = %candidate, "refid candidate reserved in this batch");
            continue;
        }

        if is_taken(candidate.clone()).await.map_err(IssueError::Lookup)? {
            debug!(attempt, candidate = %candidate, "refid candidate already in use");
            continue;
        }

        if let Some(claimed) = reservations.as_deref_mut() {
            claimed.reserve(&candidate);
        }
        return Ok(IssuedCode {
            refid: candidate,
            attempts: attempt,
        });
    }

    warn!(
        attempts = policy.max_attempts(),
        digits = policy.digits(),
        "refid issuance exhausted its attempt budget"
    );
    Err(IssueError::Exhausted {
        attempts: policy.max_attempts(),
    })
}

/// Issues codes that are unused in a document collection.
pub struct RefIdIssuer<S> {
    store: Arc<S>,
    source: Arc<dyn CodeSource>,
    policy: RefIdPolicy,
}

impl<S> Clone for RefIdIssuer<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            source: Arc::clone(&self.source),
            policy: self.policy,
        }
    }
}

impl<S> RefIdIssuer<S> {
    /// Create an issuer probing `store`.
    pub fn new(store: Arc<S>, source: Arc<dyn CodeSource>, policy: RefIdPolicy) -> Self {
        Self {
            store,
            source,
            policy,
        }
    }

    /// Default policy of this issuer.
    pub fn policy(&self) -> RefIdPolicy {
        self.policy
    }
}

impl<S: DocumentStore> RefIdIssuer<S> {
    /// Issue a code unused in `collection` with the default policy.
    pub async fn issue(
        &self,
        collection: &CollectionName,
    ) -> Result<IssuedCode, IssueError<DocumentStoreError>> {
        self.issue_with_policy(collection, &self.policy).await
    }

    /// Issue a code unused in `collection` with an explicit policy.
    pub async fn issue_with_policy(
        &self,
        collection: &CollectionName,
        policy: &RefIdPolicy,
    ) -> Result<IssuedCode, IssueError<DocumentStoreError>> {
        issue_unique_code(policy, self.source.as_ref(), |candidate| {
            self.is_taken(collection, candidate)
        })
        .await
    }

    /// Issue a code unused in `collection` and not in `reservations`.
    pub async fn issue_reserving(
        &self,
        collection: &CollectionName,
        reservations: &mut RefIdReservations,
    ) -> Result<IssuedCode, IssueError<DocumentStoreError>> {
        issue_reserved_code(
            &self.policy,
            self.source.as_ref(),
            reservations,
            |candidate| self.is_taken(collection, candidate),
        )
        .await
    }

    /// A candidate is taken when a document holds it as text or, for
    /// records written before codes were stored as strings, as a number.
    async fn is_taken(
        &self,
        collection: &CollectionName,
        candidate: RefId,
    ) -> Result<bool, DocumentStoreError> {
        let numeric = candidate.as_str().parse::<u64>().ok();
        let as_text = self
            .store
            .query(collection, &QueryFilter::eq(REFID_FIELD, candidate))
            .await?;
        if !as_text.is_empty() {
            return Ok(true);
        }
        let Some(number) = numeric else {
            return Ok(false);
        };
        let as_number = self
            .store
            .query(collection, &QueryFilter::eq(REFID_FIELD, number))
            .await?;
        Ok(!as_number.is_empty())
    }
}
