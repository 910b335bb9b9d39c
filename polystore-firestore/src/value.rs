//! Conversion between JSON values and Firestore's typed value objects.
//!
//! The Firestore REST API wraps every value in a single-key object naming
//! its type, e.g. `{"stringValue": "Ada"}` or `{"integerValue": "42"}`
//! (integers travel as strings).

use serde_json::{Map, Value, json};

use polystore_core::document::Document;

/// Encodes a JSON value as a Firestore typed value.
pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encodes a document into a Firestore `fields` map.
pub(crate) fn encode_fields(document: &Map<String, Value>) -> Value {
    Value::Object(
        document
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Decodes a Firestore typed value back into JSON.
pub(crate) fn decode_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return Value::Null;
    };
    let Some((kind, inner)) = map.iter().next() else {
        return Value::Null;
    };
    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .or_else(|| inner.as_i64().map(Value::from))
            .unwrap_or(Value::Null),
        "doubleValue" => inner.clone(),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        "geoPointValue" => inner.clone(),
        _ => Value::Null,
    }
}

/// Decodes a Firestore document resource into a plain document, deriving the
/// `id` from the final segment of the resource name.
pub(crate) fn decode_document(resource: &Value) -> Document {
    let mut document: Document = resource
        .get("fields")
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .map(|(k, v)| (k.clone(), decode_value(v)))
                .collect()
        })
        .unwrap_or_default();

    if let Some(id) = resource
        .get("name")
        .and_then(Value::as_str)
        .and_then(|name| name.rsplit('/').next())
    {
        document.insert("id".to_string(), Value::String(id.to_string()));
    }
    document
}
