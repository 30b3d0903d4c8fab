//! Document value model shared by schema derivation and projection.
//!
//! Documents are string-keyed maps of [`FieldValue`]s. Timestamps get their
//! own scalar variant so that schema derivation never mistakes them for
//! nested records, and [`FieldValue::ServerTimestamp`] is the marker a store
//! replaces with its own clock when the write commits.
//!
//! The JSON wire form is plain JSON except for the two time variants, which
//! are encoded as single-key objects: `{"$timestamp": "<RFC 3339>"}` and
//! `{"$serverTimestamp": true}`.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Wire-form key carrying a concrete timestamp.
pub const TIMESTAMP_KEY: &str = "$timestamp";

/// Wire-form key carrying the server timestamp marker.
pub const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// A document body keyed by field name.
pub type Document = BTreeMap<String, FieldValue>;

/// A single field value inside a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Explicit null, also used as the placeholder for omitted fields.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar, kept in JSON number form.
    Number(Number),
    /// String scalar.
    String(String),
    /// Concrete point in time. Always treated as an opaque scalar.
    Timestamp(DateTime<Utc>),
    /// "Now, as assigned by the store at write time."
    ServerTimestamp,
    /// Ordered sequence of values.
    Array(Vec<FieldValue>),
    /// Nested record.
    Map(Document),
}

/// Errors raised while converting JSON into document values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A document root was not a JSON object.
    #[error("document root must be a JSON object, found {found}")]
    NotAnObject {
        /// JSON kind that was supplied instead.
        found: &'static str,
    },
    /// A `$timestamp` wrapper held an unparsable value.
    #[error("invalid timestamp '{value}': {message}")]
    InvalidTimestamp {
        /// Raw timestamp text.
        value: String,
        /// Parser diagnostic.
        message: String,
    },
}

impl FieldValue {
    /// Return `true` for [`FieldValue::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string payload, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Borrow the nested record, if this is a map.
    #[must_use]
    pub const fn as_map(&self) -> Option<&Document> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Mutably borrow the nested record, if this is a map.
    pub fn as_map_mut(&mut self) -> Option<&mut Document> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Short name of the variant, used in diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::ServerTimestamp => "server_timestamp",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
        }
    }

    /// Encode the value in its JSON wire form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Number(number) => Value::Number(number.clone()),
            Self::String(text) => Value::String(text.clone()),
            Self::Timestamp(at) => {
                let mut wrapper = Map::new();
                wrapper.insert(
                    TIMESTAMP_KEY.to_owned(),
                    Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
                );
                Value::Object(wrapper)
            }
            Self::ServerTimestamp => {
                let mut wrapper = Map::new();
                wrapper.insert(SERVER_TIMESTAMP_KEY.to_owned(), Value::Bool(true));
                Value::Object(wrapper)
            }
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => document_to_json(entries),
        }
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(flag) => Ok(Self::Bool(flag)),
            Value::Number(number) => Ok(Self::Number(number)),
            Value::String(text) => Ok(Self::String(text)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(entries) => object_to_field_value(entries),
        }
    }
}

fn object_to_field_value(entries: Map<String, Value>) -> Result<FieldValue, ValueError> {
    if entries.len() == 1 {
        if let Some(Value::String(raw)) = entries.get(TIMESTAMP_KEY) {
            return parse_timestamp(raw).map(FieldValue::Timestamp);
        }
        if let Some(Value::Bool(true)) = entries.get(SERVER_TIMESTAMP_KEY) {
            return Ok(FieldValue::ServerTimestamp);
        }
    }
    map_entries(entries).map(FieldValue::Map)
}

fn map_entries(entries: Map<String, Value>) -> Result<Document, ValueError> {
    entries
        .into_iter()
        .map(|(name, value)| FieldValue::try_from(value).map(|field| (name, field)))
        .collect()
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ValueError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| ValueError::InvalidTimestamp {
            value: raw.to_owned(),
            message: err.to_string(),
        })
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode a JSON object into a [`Document`].
///
/// # Errors
///
/// Returns [`ValueError::NotAnObject`] when the root is not an object and
/// [`ValueError::InvalidTimestamp`] for malformed `$timestamp` wrappers.
///
/// # Examples
///
/// ```
/// use document_schema::{FieldValue, document_from_json};
/// use serde_json::json;
///
/// let doc = document_from_json(json!({"name": "Ali", "createdAt": null}))
///     .expect("object root");
/// assert_eq!(doc.get("name"), Some(&FieldValue::from("Ali")));
/// assert_eq!(doc.get("createdAt"), Some(&FieldValue::Null));
/// ```
pub fn document_from_json(value: Value) -> Result<Document, ValueError> {
    match value {
        Value::Object(entries) => map_entries(entries),
        other => Err(ValueError::NotAnObject {
            found: json_kind(&other),
        }),
    }
}

/// Encode a [`Document`] in its JSON wire form.
#[must_use]
pub fn document_to_json(document: &Document) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect(),
    )
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Number(Number::from(value))
    }
}

impl From<f64> for FieldValue {
    /// Non-finite floats have no JSON representation and become null.
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Vec<Self>> for FieldValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<Document> for FieldValue {
    fn from(value: Document) -> Self {
        Self::Map(value)
    }
}
