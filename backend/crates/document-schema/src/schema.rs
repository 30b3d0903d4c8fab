//! Schema inference over previously stored documents.
//!
//! A [`SchemaNode`] is learned by folding every observed document into an
//! accumulator. Merging only ever adds structure: object field sets grow,
//! array element schemas gain structure, and a null or scalar never erases
//! nesting learned from another document.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::value::{Document, FieldValue};

/// Top-level field holding the store-assigned document identifier. It is
/// never part of a learned schema.
pub const DOCUMENT_ID_FIELD: &str = "id";

/// Inferred shape of a collection, or of one field inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchemaNode {
    /// Leaf field: string, number, boolean, timestamp, or unrecognised.
    Value,
    /// Nested record.
    Object {
        /// Every field ever observed at this level.
        fields: BTreeMap<String, SchemaNode>,
    },
    /// Homogeneous sequence.
    Array {
        /// Merged schema of every observed element; `None` when no element
        /// was ever seen.
        #[serde(skip_serializing_if = "Option::is_none")]
        element: Option<Box<SchemaNode>>,
    },
}

impl Default for SchemaNode {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl SchemaNode {
    /// An object schema without any fields.
    #[must_use]
    pub const fn empty_object() -> Self {
        Self::Object {
            fields: BTreeMap::new(),
        }
    }

    /// Return `true` when the schema carries no field information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Object { fields } => fields.is_empty(),
            Self::Array { element } => element.is_none(),
            Self::Value => false,
        }
    }

    /// Borrow the field map of an object schema.
    #[must_use]
    pub const fn fields(&self) -> Option<&BTreeMap<String, Self>> {
        match self {
            Self::Object { fields } => Some(fields),
            _ => None,
        }
    }

    /// Look up a direct child field of an object schema.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Self> {
        self.fields().and_then(|fields| fields.get(name))
    }

    /// Fold one document into this schema.
    ///
    /// The reserved [`DOCUMENT_ID_FIELD`] is skipped. A non-object schema is
    /// replaced by an object root first, since documents are always records.
    #[must_use]
    pub fn merge_document(self, document: &Document) -> Self {
        let mut fields = match self {
            Self::Object { fields } => fields,
            Self::Value | Self::Array { .. } => BTreeMap::new(),
        };
        for (name, value) in document {
            if name == DOCUMENT_ID_FIELD {
                continue;
            }
            let prior = fields.remove(name);
            fields.insert(name.clone(), merge_value(prior, value));
        }
        Self::Object { fields }
    }

    /// List every field path the schema knows about, sorted.
    ///
    /// Nested fields are joined with `.`, array elements are marked with
    /// `[]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use document_schema::{derive_schema, document_from_json};
    /// use serde_json::json;
    ///
    /// let doc = document_from_json(json!({
    ///     "name": "Ali",
    ///     "address": {"city": "Riyadh"},
    ///     "cars": [{"plate": "ABC"}],
    /// }))
    /// .expect("object root");
    /// let schema = derive_schema([&doc]);
    /// assert_eq!(
    ///     schema.field_paths(),
    ///     vec!["address", "address.city", "cars", "cars[]", "cars[].plate", "name"],
    /// );
    /// ```
    #[must_use]
    pub fn field_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        if let Self::Object { fields } = self {
            for (name, child) in fields {
                collect_paths(name.clone(), child, &mut paths);
            }
        }
        paths.sort();
        paths
    }
}

fn collect_paths(path: String, node: &SchemaNode, paths: &mut Vec<String>) {
    match node {
        SchemaNode::Value => paths.push(path),
        SchemaNode::Object { fields } => {
            for (name, child) in fields {
                collect_paths(format!("{path}.{name}"), child, paths);
            }
            paths.push(path);
        }
        SchemaNode::Array { element } => {
            if let Some(element_schema) = element {
                collect_paths(format!("{path}[]"), element_schema, paths);
            }
            paths.push(path);
        }
    }
}

/// Merge one observed value into the schema already learned for a field.
///
/// `existing` is `None` the first time a field is seen.
#[must_use]
pub fn merge_value(existing: Option<SchemaNode>, value: &FieldValue) -> SchemaNode {
    match value {
        FieldValue::Null => existing.unwrap_or(SchemaNode::Value),
        FieldValue::Array(items) => merge_array(existing, items),
        FieldValue::Map(entries) => merge_object(existing, entries),
        FieldValue::Bool(_)
        | FieldValue::Number(_)
        | FieldValue::String(_)
        | FieldValue::Timestamp(_)
        | FieldValue::ServerTimestamp => match existing {
            Some(structured @ (SchemaNode::Object { .. } | SchemaNode::Array { .. })) => {
                structured
            }
            Some(SchemaNode::Value) | None => SchemaNode::Value,
        },
    }
}

fn merge_array(existing: Option<SchemaNode>, items: &[FieldValue]) -> SchemaNode {
    let mut element = match existing {
        Some(SchemaNode::Array { element: learned }) => learned.map(|boxed| *boxed),
        Some(object @ SchemaNode::Object { .. }) => return object,
        Some(SchemaNode::Value) | None => None,
    };
    for item in items {
        element = Some(merge_value(element, item));
    }
    SchemaNode::Array {
        element: element.map(Box::new),
    }
}

fn merge_object(existing: Option<SchemaNode>, entries: &Document) -> SchemaNode {
    let mut fields = match existing {
        Some(SchemaNode::Object { fields }) => fields,
        Some(array @ SchemaNode::Array { .. }) => return array,
        Some(SchemaNode::Value) | None => BTreeMap::new(),
    };
    for (name, value) in entries {
        let prior = fields.remove(name);
        fields.insert(name.clone(), merge_value(prior, value));
    }
    SchemaNode::Object { fields }
}

/// Derive the unified schema of a document sequence.
///
/// An empty sequence yields an empty object schema.
///
/// # Examples
///
/// ```
/// use document_schema::{SchemaNode, derive_schema, document_from_json};
/// use serde_json::json;
///
/// let first = document_from_json(json!({"name": "Ali"})).expect("object root");
/// let second = document_from_json(json!({"phone": "0500"})).expect("object root");
/// let schema = derive_schema([&first, &second]);
///
/// assert_eq!(schema.field("name"), Some(&SchemaNode::Value));
/// assert_eq!(schema.field("phone"), Some(&SchemaNode::Value));
/// ```
#[must_use]
pub fn derive_schema<'a, I>(documents: I) -> SchemaNode
where
    I: IntoIterator<Item = &'a Document>,
{
    documents
        .into_iter()
        .fold(SchemaNode::empty_object(), SchemaNode::merge_document)
}

#[cfg(test)]
mod tests {
    //! Merge-rule coverage for schema derivation.

    use super::*;
    use crate::value::document_from_json;
    use rstest::rstest;
    use serde_json::{Value, json};

    fn doc(value: Value) -> Document {
        document_from_json(value).expect("test documents are objects")
    }

    fn object(fields: &[(&str, SchemaNode)]) -> SchemaNode {
        SchemaNode::Object {
            fields: fields
                .iter()
                .map(|(name, node)| ((*name).to_owned(), node.clone()))
                .collect(),
        }
    }

    fn array_of(element: SchemaNode) -> SchemaNode {
        SchemaNode::Array {
            element: Some(Box::new(element)),
        }
    }

    #[rstest]
    fn empty_input_yields_empty_object() {
        let schema = derive_schema(std::iter::empty());
        assert_eq!(schema, SchemaNode::empty_object());
        assert!(schema.is_empty());
    }

    #[rstest]
    fn reserved_id_field_is_ignored() {
        let schema = derive_schema([&doc(json!({"id": "abc", "name": "Ali"}))]);
        assert_eq!(schema, object(&[("name", SchemaNode::Value)]));
    }

    #[rstest]
    fn nested_id_fields_are_kept() {
        let schema = derive_schema([&doc(json!({"owner": {"id": "u1"}}))]);
        assert_eq!(
            schema,
            object(&[("owner", object(&[("id", SchemaNode::Value)]))])
        );
    }

    #[rstest]
    fn null_does_not_erase_learned_structure() {
        let schema = derive_schema([
            &doc(json!({"address": {"city": "Riyadh"}})),
            &doc(json!({"address": null})),
        ]);
        assert_eq!(
            schema,
            object(&[("address", object(&[("city", SchemaNode::Value)]))])
        );
    }

    #[rstest]
    fn scalar_does_not_erase_learned_structure() {
        let schema = derive_schema([
            &doc(json!({"address": {"city": "Riyadh"}})),
            &doc(json!({"address": "legacy free text"})),
        ]);
        assert_eq!(
            schema,
            object(&[("address", object(&[("city", SchemaNode::Value)]))])
        );
    }

    #[rstest]
    fn value_node_upgrades_to_structure() {
        let schema = derive_schema([
            &doc(json!({"address": null})),
            &doc(json!({"address": {"city": "Jeddah"}})),
        ]);
        assert_eq!(
            schema,
            object(&[("address", object(&[("city", SchemaNode::Value)]))])
        );
    }

    #[rstest]
    fn object_fields_accumulate_across_documents() {
        let schema = derive_schema([
            &doc(json!({"address": {"city": "Riyadh"}})),
            &doc(json!({"address": {"street": "King Fahd"}})),
        ]);
        assert_eq!(
            schema,
            object(&[(
                "address",
                object(&[("city", SchemaNode::Value), ("street", SchemaNode::Value)])
            )])
        );
    }

    #[rstest]
    fn array_elements_merge_into_one_schema() {
        let schema = derive_schema([
            &doc(json!({"cars": [{"plate": "A1"}]})),
            &doc(json!({"cars": [{"model": "Camry"}, {"plate": "B2", "year": 2020}]})),
        ]);
        assert_eq!(
            schema,
            object(&[(
                "cars",
                array_of(object(&[
                    ("model", SchemaNode::Value),
                    ("plate", SchemaNode::Value),
                    ("year", SchemaNode::Value),
                ]))
            )])
        );
    }

    #[rstest]
    fn empty_arrays_leave_element_absent() {
        let schema = derive_schema([&doc(json!({"tags": []}))]);
        assert_eq!(schema, object(&[("tags", SchemaNode::Array { element: None })]));
    }

    #[rstest]
    fn empty_array_keeps_previous_element_schema() {
        let schema = derive_schema([
            &doc(json!({"tags": ["a"]})),
            &doc(json!({"tags": []})),
        ]);
        assert_eq!(schema, object(&[("tags", array_of(SchemaNode::Value))]));
    }

    #[rstest]
    fn first_structural_shape_wins_on_conflict() {
        let schema = derive_schema([
            &doc(json!({"extra": {"a": 1}})),
            &doc(json!({"extra": [1, 2]})),
        ]);
        assert_eq!(
            schema,
            object(&[("extra", object(&[("a", SchemaNode::Value)]))])
        );
    }

    #[rstest]
    fn timestamps_are_opaque_scalars() {
        let schema = derive_schema([&doc(json!({
            "createdAt": {"$timestamp": "2024-01-01T00:00:00Z"},
        }))]);
        assert_eq!(schema, object(&[("createdAt", SchemaNode::Value)]));
    }

    #[rstest]
    fn field_paths_cover_every_depth() {
        let schema = derive_schema([&doc(json!({
            "name": "Ali",
            "wallet": {"balance": 10, "history": [{"amount": 5}]},
        }))]);
        assert_eq!(
            schema.field_paths(),
            vec![
                "name",
                "wallet",
                "wallet.balance",
                "wallet.history",
                "wallet.history[]",
                "wallet.history[].amount",
            ]
        );
    }
}
