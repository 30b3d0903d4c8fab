//! Projection of caller-supplied values onto a learned schema.
//!
//! The schema drives the output shape: every field the schema knows is
//! emitted, values come from the source where present, and anything missing
//! becomes [`FieldValue::Null`] (or an empty array for array fields).

use crate::schema::{SchemaNode, derive_schema};
use crate::value::{Document, FieldValue};

/// Project `source` onto `schema`.
///
/// - `Value` returns the source as-is, or null when absent.
/// - `Array` returns an empty array unless the source is an array; each
///   element is projected through the element schema, or passed through
///   untouched when no element schema was ever learned.
/// - `Object` emits exactly the schema's fields. Source fields unknown to the
///   schema are dropped here; see [`overlay_unknown_fields`].
///
/// Projection never fails and is idempotent: projecting an already projected
/// value returns it unchanged.
#[must_use]
pub fn project(schema: &SchemaNode, source: Option<&FieldValue>) -> FieldValue {
    match schema {
        SchemaNode::Value => source.cloned().unwrap_or(FieldValue::Null),
        SchemaNode::Array { element } => match source {
            Some(FieldValue::Array(items)) => match element {
                Some(element_schema) => FieldValue::Array(
                    items
                        .iter()
                        .map(|item| project(element_schema, Some(item)))
                        .collect(),
                ),
                None => FieldValue::Array(items.clone()),
            },
            _ => FieldValue::Array(Vec::new()),
        },
        SchemaNode::Object { fields } => {
            let entries = source.and_then(FieldValue::as_map);
            FieldValue::Map(
                fields
                    .iter()
                    .map(|(name, child)| {
                        let value = entries.and_then(|map| map.get(name));
                        (name.clone(), project(child, value))
                    })
                    .collect(),
            )
        }
    }
}

/// Project a whole document onto a collection schema.
///
/// When the schema is still empty (first document ever, or an unwarmed
/// cache) and the source has fields, the schema is bootstrapped from the
/// source itself so the first write keeps its values.
///
/// # Examples
///
/// ```
/// use document_schema::{FieldValue, derive_schema, document_from_json, project_document};
/// use serde_json::json;
///
/// let existing = document_from_json(json!({"name": "Ali", "address": {"city": "Riyadh"}}))
///     .expect("object root");
/// let schema = derive_schema([&existing]);
/// let source = document_from_json(json!({"name": "Sara"})).expect("object root");
///
/// let projected = project_document(&schema, &source);
/// let expected = document_from_json(json!({"name": "Sara", "address": {"city": null}}))
///     .expect("object root");
/// assert_eq!(projected, expected);
/// ```
#[must_use]
pub fn project_document(schema: &SchemaNode, source: &Document) -> Document {
    let wrapped = FieldValue::Map(source.clone());
    let projected = if schema.is_empty() && !source.is_empty() {
        project(&derive_schema([source]), Some(&wrapped))
    } else {
        project(schema, Some(&wrapped))
    };
    match projected {
        FieldValue::Map(document) => document,
        _ => Document::new(),
    }
}

/// Copy source fields that the projection did not emit.
///
/// Nested maps present on both sides are merged recursively, and so are the
/// map elements of arrays, pairing each projected element with the source
/// element it came from. Genuinely new fields at any depth survive while
/// omitted known fields stay null. Returns the paths that were added, using
/// `[]` for array elements as [`SchemaNode::field_paths`] does.
pub fn overlay_unknown_fields(projected: &mut Document, source: &Document) -> Vec<String> {
    let mut added = Vec::new();
    overlay_into(projected, source, None, &mut added);
    added
}

fn overlay_into(
    target: &mut Document,
    source: &Document,
    prefix: Option<&str>,
    added: &mut Vec<String>,
) {
    for (name, value) in source {
        let path = prefix.map_or_else(|| name.clone(), |parent| format!("{parent}.{name}"));
        match target.get_mut(name) {
            None => {
                target.insert(name.clone(), value.clone());
                if !added.contains(&path) {
                    added.push(path);
                }
            }
            Some(existing) => overlay_value(existing, value, &path, added),
        }
    }
}

fn overlay_value(
    target: &mut FieldValue,
    source: &FieldValue,
    path: &str,
    added: &mut Vec<String>,
) {
    match (target, source) {
        (FieldValue::Map(existing), FieldValue::Map(nested)) => {
            overlay_into(existing, nested, Some(path), added);
        }
        // Projection keeps array length, so elements pair up by position.
        (FieldValue::Array(existing), FieldValue::Array(items))
            if existing.len() == items.len() =>
        {
            let element_path = format!("{path}[]");
            for (element, item) in existing.iter_mut().zip(items) {
                overlay_value(element, item, &element_path, added);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    //! Projection and overlay behaviour.

    use super::*;
    use crate::value::document_from_json;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        document_from_json(value).expect("test documents are objects")
    }

    #[rstest]
    fn missing_fields_become_null_at_every_depth() {
        let schema = derive_schema([&doc(json!({
            "name": "Ali",
            "address": {"city": "Riyadh", "geo": {"lat": 1.5}},
        }))]);
        let projected = project_document(&schema, &doc(json!({"name": "Sara"})));
        assert_eq!(
            projected,
            doc(json!({
                "name": "Sara",
                "address": {"city": null, "geo": {"lat": null}},
            }))
        );
    }

    #[rstest]
    fn array_with_scalar_elements_passes_through() {
        let schema = derive_schema([
            &doc(json!({"tags": ["a"]})),
            &doc(json!({"tags": ["a", "b"]})),
        ]);
        let projected = project_document(&schema, &doc(json!({"tags": ["x", "y", "z"]})));
        assert_eq!(projected, doc(json!({"tags": ["x", "y", "z"]})));
    }

    #[rstest]
    fn array_elements_are_projected_through_element_schema() {
        let schema = derive_schema([&doc(json!({"cars": [{"plate": "A1", "model": "Camry"}]}))]);
        let projected = project_document(&schema, &doc(json!({"cars": [{"plate": "B2"}]})));
        assert_eq!(
            projected,
            doc(json!({"cars": [{"plate": "B2", "model": null}]}))
        );
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"cars": "not a list"}))]
    #[case(json!({"cars": null}))]
    fn non_array_sources_become_empty_arrays(#[case] source: Value) {
        let schema = derive_schema([&doc(json!({"cars": [{"plate": "A1"}]}))]);
        let projected = project_document(&schema, &doc(source));
        assert_eq!(projected, doc(json!({"cars": []})));
    }

    #[rstest]
    fn unlearned_array_element_passes_source_through() {
        let schema = derive_schema([&doc(json!({"photos": []}))]);
        let projected =
            project_document(&schema, &doc(json!({"photos": [{"url": "a.png"}, 3]})));
        assert_eq!(projected, doc(json!({"photos": [{"url": "a.png"}, 3]})));
    }

    #[rstest]
    fn unknown_source_fields_are_not_projected() {
        let schema = derive_schema([&doc(json!({"name": "Ali"}))]);
        let projected = project_document(&schema, &doc(json!({"name": "Sara", "vip": true})));
        assert_eq!(projected, doc(json!({"name": "Sara"})));
    }

    #[rstest]
    fn empty_schema_bootstraps_from_source() {
        let source = doc(json!({"name": "Sara", "address": {"city": "Dammam"}}));
        let projected = project_document(&SchemaNode::empty_object(), &source);
        assert_eq!(projected, source);
    }

    #[rstest]
    fn empty_schema_and_empty_source_yield_empty_document() {
        let projected = project_document(&SchemaNode::empty_object(), &Document::new());
        assert!(projected.is_empty());
    }

    #[rstest]
    fn empty_source_yields_null_leaves_and_empty_arrays() {
        let schema = derive_schema([&doc(json!({
            "name": "Ali",
            "tags": ["a"],
            "wallet": {"balance": 3, "history": [{"amount": 1}]},
        }))]);
        let projected = project_document(&schema, &Document::new());
        assert_eq!(
            projected,
            doc(json!({
                "name": null,
                "tags": [],
                "wallet": {"balance": null, "history": []},
            }))
        );
    }

    #[rstest]
    fn projection_is_idempotent() {
        let schema = derive_schema([
            &doc(json!({"name": "Ali", "cars": [{"plate": "A1"}], "address": {"city": "x"}})),
            &doc(json!({"phone": "0500", "cars": [{"model": "Yaris"}]})),
        ]);
        let source = doc(json!({"name": "Sara", "cars": [{"plate": "Z9"}], "address": "oops"}));
        let once = project_document(&schema, &source);
        let twice = project_document(&schema, &once);
        assert_eq!(once, twice);
    }

    #[rstest]
    fn overlay_keeps_new_fields_and_nulls_omitted_ones() {
        let schema = derive_schema([&doc(json!({"name": "Ali", "address": {"city": "Riyadh"}}))]);
        let source = doc(json!({
            "name": "Sara",
            "nationalId": "1234",
            "address": {"district": "Olaya"},
        }));
        let mut projected = project_document(&schema, &source);
        let added = overlay_unknown_fields(&mut projected, &source);

        assert_eq!(added, vec!["address.district".to_owned(), "nationalId".to_owned()]);
        assert_eq!(
            projected,
            doc(json!({
                "name": "Sara",
                "nationalId": "1234",
                "address": {"city": null, "district": "Olaya"},
            }))
        );
    }

    #[rstest]
    fn overlay_keeps_new_fields_inside_array_elements() {
        let schema = derive_schema([&doc(json!({"cars": [{"plate": "A1"}]}))]);
        let source = doc(json!({
            "cars": [{"plate": "B2", "color": "red"}, {"plate": "C3", "color": "blue"}],
        }));
        let mut projected = project_document(&schema, &source);
        let added = overlay_unknown_fields(&mut projected, &source);

        assert_eq!(added, vec!["cars[].color".to_owned()]);
        assert_eq!(projected, source);
    }

    #[rstest]
    fn overlay_does_not_replace_projected_values() {
        let mut projected = doc(json!({"name": "Sara", "tags": []}));
        let added = overlay_unknown_fields(&mut projected, &doc(json!({"tags": "a,b"})));
        assert!(added.is_empty());
        assert_eq!(projected, doc(json!({"name": "Sara", "tags": []})));
    }
}
