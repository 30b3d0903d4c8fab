//! Collection names and the entity kinds the dashboard creates.
//!
//! Every entity kind lives in its own top-level collection. Kinds whose
//! forms only show a subset of the collection's fields opt into full-schema
//! projection so new records carry every field their siblings have.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for [`CollectionName`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionNameError {
    /// The name was empty.
    #[error("collection name must not be empty")]
    Empty,
    /// The name contained a character outside `[A-Za-z0-9_-]`.
    #[error("collection name '{name}' may only contain ASCII letters, digits, '_' and '-'")]
    InvalidCharacter {
        /// Rejected name.
        name: String,
    },
}

/// Name of a top-level document collection.
///
/// ## Invariants
/// - Non-empty.
/// - ASCII letters, digits, `_` and `-` only, so the name is safe to use as
///   a file stem by filesystem-backed stores.
///
/// # Examples
/// ```
/// use fleet_backend::domain::CollectionName;
///
/// let name = CollectionName::new("clients").expect("valid name");
/// assert_eq!(name.as_str(), "clients");
/// assert!(CollectionName::new("../clients").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate and construct a collection name.
    pub fn new(name: impl Into<String>) -> Result<Self, CollectionNameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CollectionNameError::Empty);
        }
        if !name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
        {
            return Err(CollectionNameError::InvalidCharacter { name });
        }
        Ok(Self(name))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<String> for CollectionName {
    type Error = CollectionNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(value: CollectionName) -> Self {
        value.0
    }
}

/// Entity kinds created from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Customer requesting deliveries and services.
    Client,
    /// Delivery driver.
    Driver,
    /// Catalogue product (fuel grades, services, accessories).
    Product,
    /// Discount coupon.
    Coupon,
    /// Wallet transfer between accounts.
    Transfer,
    /// Push notification sent to clients or drivers.
    Notification,
}

/// Error returned when a kind name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown entity kind '{value}'")]
pub struct EntityKindParseError {
    /// Rejected input.
    pub value: String,
}

impl EntityKind {
    /// Every kind, in display order.
    pub const ALL: [Self; 6] = [
        Self::Client,
        Self::Driver,
        Self::Product,
        Self::Coupon,
        Self::Transfer,
        Self::Notification,
    ];

    /// Lowercase singular name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Driver => "driver",
            Self::Product => "product",
            Self::Coupon => "coupon",
            Self::Transfer => "transfer",
            Self::Notification => "notification",
        }
    }

    fn collection_str(self) -> &'static str {
        match self {
            Self::Client => "clients",
            Self::Driver => "drivers",
            Self::Product => "products",
            Self::Coupon => "coupons",
            Self::Transfer => "transfers",
            Self::Notification => "notifications",
        }
    }

    /// Collection holding documents of this kind.
    pub fn collection(self) -> CollectionName {
        CollectionName(self.collection_str().to_owned())
    }

    /// Whether new documents are projected onto the collection's learned
    /// schema before being written.
    pub fn uses_full_schema(self) -> bool {
        matches!(
            self,
            Self::Client | Self::Driver | Self::Product | Self::Coupon
        )
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EntityKind {
    type Err = EntityKindParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EntityKindParseError {
                value: value.to_owned(),
            })
    }
}
