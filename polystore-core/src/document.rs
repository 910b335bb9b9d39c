//! The opaque document representation shared by all backends.
//!
//! Read operations return documents as JSON maps; by convention a document
//! carries an `id` key identifying it to the owning backend. The id is never
//! inferred - mutation of a single logical row requires it to be present on
//! the result of a prior read.

use serde_json::Value;

/// An opaque key-value document as returned by read operations.
pub type Document = serde_json::Map<String, Value>;

/// Extracts the backend identity of a document from its `id` key.
///
/// Numeric ids (relational auto-increment keys) are stringified so that one
/// identity type flows through the adapter contract. Returns `None` when the
/// key is absent, null, or not representable as an id.
pub fn document_id(doc: &Document) -> Option<String> {
    match doc.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn string_and_numeric_ids_are_recognized() {
        assert_eq!(document_id(&doc(json!({"id": "abc"}))), Some("abc".into()));
        assert_eq!(document_id(&doc(json!({"id": 42}))), Some("42".into()));
    }

    #[test]
    fn missing_or_unusable_ids_are_none() {
        assert_eq!(document_id(&doc(json!({"name": "Ada"}))), None);
        assert_eq!(document_id(&doc(json!({"id": null}))), None);
        assert_eq!(document_id(&doc(json!({"id": ""}))), None);
        assert_eq!(document_id(&doc(json!({"id": [1, 2]}))), None);
    }
}
