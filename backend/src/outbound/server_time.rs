//! Resolution of server-time markers at commit.

use chrono::{DateTime, Utc};
use document_schema::{Document, FieldValue};

/// Replace every [`FieldValue::ServerTimestamp`] in `document` with `now`.
///
/// Markers nested in maps and arrays are resolved too.
pub(crate) fn resolve_server_timestamps(document: &Document, now: DateTime<Utc>) -> Document {
    document
        .iter()
        .map(|(key, value)| (key.clone(), resolve_value(value, now)))
        .collect()
}

fn resolve_value(value: &FieldValue, now: DateTime<Utc>) -> FieldValue {
    match value {
        FieldValue::ServerTimestamp => FieldValue::Timestamp(now),
        FieldValue::Map(fields) => FieldValue::Map(resolve_server_timestamps(fields, now)),
        FieldValue::Array(items) => {
            FieldValue::Array(items.iter().map(|item| resolve_value(item, now)).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server-time resolution.

    use super::*;
    use chrono::TimeZone;
    use document_schema::document_from_json;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn markers_are_replaced_at_every_depth() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        let document = document_from_json(json!({
            "createdAt": {"$serverTimestamp": true},
            "audit": {"updatedAt": {"$serverTimestamp": true}},
            "history": [{"$serverTimestamp": true}, "kept"],
            "name": "Sara",
        }))
        .expect("object root");

        let resolved = resolve_server_timestamps(&document, now);

        assert_eq!(resolved.get("createdAt"), Some(&FieldValue::Timestamp(now)));
        let audit = resolved
            .get("audit")
            .and_then(FieldValue::as_map)
            .expect("audit map");
        assert_eq!(audit.get("updatedAt"), Some(&FieldValue::Timestamp(now)));
        assert_eq!(
            resolved.get("history").and_then(FieldValue::as_array),
            Some([FieldValue::Timestamp(now), FieldValue::from("kept")].as_slice())
        );
        assert_eq!(resolved.get("name"), Some(&FieldValue::from("Sara")));
    }
}
