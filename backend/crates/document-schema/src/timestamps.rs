//! Server-assigned defaults for well-known timestamp fields.

use crate::value::{Document, FieldValue};

/// Field names treated as creation or update timestamps.
pub const TIMESTAMP_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "createdDate",
    "updatedDate",
    "created_at",
    "updated_at",
    "dateCreated",
    "dateUpdated",
    "createDate",
    "updateDate",
];

/// Replace null timestamp fields with [`FieldValue::ServerTimestamp`].
///
/// Walks nested maps and array elements. Fields that already hold a value
/// are left alone. Returns how many fields were defaulted.
///
/// # Examples
///
/// ```
/// use document_schema::{FieldValue, apply_timestamp_defaults, document_from_json};
/// use serde_json::json;
///
/// let mut doc = document_from_json(json!({
///     "createdDate": null,
///     "nested": {"updatedAt": null, "other": "x"},
/// }))
/// .expect("object root");
///
/// assert_eq!(apply_timestamp_defaults(&mut doc), 2);
/// assert_eq!(doc.get("createdDate"), Some(&FieldValue::ServerTimestamp));
/// ```
pub fn apply_timestamp_defaults(document: &mut Document) -> usize {
    apply_timestamp_defaults_with(document, TIMESTAMP_FIELDS)
}

/// [`apply_timestamp_defaults`] with a caller-supplied field name set.
pub fn apply_timestamp_defaults_with<S: AsRef<str>>(
    document: &mut Document,
    field_names: &[S],
) -> usize {
    let mut defaulted = 0;
    for (name, value) in document.iter_mut() {
        if value.is_null() && field_names.iter().any(|known| known.as_ref() == name.as_str()) {
            *value = FieldValue::ServerTimestamp;
            defaulted += 1;
        } else {
            defaulted += default_nested(value, field_names);
        }
    }
    defaulted
}

fn default_nested<S: AsRef<str>>(value: &mut FieldValue, field_names: &[S]) -> usize {
    match value {
        FieldValue::Map(entries) => apply_timestamp_defaults_with(entries, field_names),
        FieldValue::Array(items) => items
            .iter_mut()
            .map(|item| default_nested(item, field_names))
            .sum(),
        _ => 0,
    }
}
