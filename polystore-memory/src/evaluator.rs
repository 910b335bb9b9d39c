//! Filter evaluation for in-memory document matching.

use serde_json::Value;
use std::{cmp::Ordering, collections::HashMap};

use polystore_core::{
    document::Document,
    query::{Filter, FilterOp},
};

/// Type-erased, comparable view of JSON values.
///
/// Numbers are normalized to f64 so integers and floats compare naturally.
/// Values of different kinds are never ordered relative to each other.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Value> for Comparable<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Comparable::Null,
            Value::Bool(b) => Comparable::Bool(*b),
            Value::Number(n) => Comparable::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Comparable::String(s),
            Value::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Value::Object(map) => Comparable::Map(
                map.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Compares two documents by one field for sorting. Documents without the
/// field sort as if the value were null, which is unordered and therefore
/// keeps its position (the sort is stable).
pub(crate) fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    let left = a.get(field).map(Comparable::from).unwrap_or(Comparable::Null);
    let right = b.get(field).map(Comparable::from).unwrap_or(Comparable::Null);
    left.partial_cmp(&right).unwrap_or(Ordering::Equal)
}

/// Evaluates one structured filter against a document.
///
/// A missing field never matches, whatever the operator.
pub(crate) fn matches_filter(document: &Document, filter: &Filter) -> bool {
    let Some(field_value) = document.get(&filter.field) else {
        return false;
    };
    let left = Comparable::from(field_value);
    let right = Comparable::from(&filter.value);

    match filter.op() {
        FilterOp::Eq => left == right,
        FilterOp::Ne => left != right,
        FilterOp::Lt => matches!(left.partial_cmp(&right), Some(Ordering::Less)),
        FilterOp::Lte => matches!(
            left.partial_cmp(&right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Gt => matches!(left.partial_cmp(&right), Some(Ordering::Greater)),
        FilterOp::Gte => matches!(
            left.partial_cmp(&right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Like => match (&left, &right) {
            (Comparable::String(haystack), Comparable::String(needle)) => {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            }
            (Comparable::Array(items), _) => items.iter().any(|item| item == &right),
            _ => false,
        },
        FilterOp::In => in_set(&left, &filter.value),
        FilterOp::NotIn => !in_set(&left, &filter.value),
    }
}

// A scalar comparison value is treated as a one-element set.
fn in_set(left: &Comparable<'_>, value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(|item| &Comparable::from(item) == left),
        single => &Comparable::from(single) == left,
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
    fn integers_and_floats_compare_as_numbers() {
        let d = doc(json!({"age": 30}));
        assert!(matches_filter(&d, &Filter::new("age", "=", json!(30.0))));
        assert!(matches_filter(&d, &Filter::new("age", ">", json!(29.5))));
        assert!(!matches_filter(&d, &Filter::new("age", "<", json!(30))));
    }

    #[test]
    fn missing_field_never_matches() {
        let d = doc(json!({"name": "Ada"}));
        assert!(!matches_filter(&d, &Filter::new("age", "=", json!(30))));
        assert!(!matches_filter(&d, &Filter::new("age", "!=", json!(30))));
    }

    #[test]
    fn cross_kind_comparisons_are_unordered() {
        let d = doc(json!({"age": "30"}));
        // "30" (string) vs 30 (number): not equal, not ordered.
        assert!(!matches_filter(&d, &Filter::new("age", "=", json!(30))));
        assert!(!matches_filter(&d, &Filter::new("age", ">", json!(30))));
        assert!(matches_filter(&d, &Filter::new("age", "!=", json!(30))));
    }

    #[test]
    fn like_is_case_insensitive_substring_on_strings() {
        let d = doc(json!({"name": "Ada Lovelace"}));
        assert!(matches_filter(&d, &Filter::new("name", "like", json!("lovelace"))));
        assert!(!matches_filter(&d, &Filter::new("name", "like", json!("Grace"))));
    }

    #[test]
    fn like_on_arrays_is_membership() {
        let d = doc(json!({"tags": ["a", "b"]}));
        assert!(matches_filter(&d, &Filter::new("tags", "contains", json!("b"))));
        assert!(!matches_filter(&d, &Filter::new("tags", "contains", json!("c"))));
    }

    #[test]
    fn in_accepts_sets_and_scalars() {
        let d = doc(json!({"id": 2}));
        assert!(matches_filter(&d, &Filter::new("id", "in", json!([1, 2, 3]))));
        assert!(matches_filter(&d, &Filter::new("id", "in", json!(2))));
        assert!(matches_filter(&d, &Filter::new("id", "nin", json!([5, 6]))));
        assert!(!matches_filter(&d, &Filter::new("id", "nin", json!([1, 2]))));
    }

    #[test]
    fn sorting_comparator_orders_by_field() {
        let a = doc(json!({"n": 1}));
        let b = doc(json!({"n": 2}));
        let c = doc(json!({"x": true}));
        assert_eq!(compare_field(&a, &b, "n"), Ordering::Less);
        assert_eq!(compare_field(&b, &a, "n"), Ordering::Greater);
        // Missing field is unordered: stable sort keeps position.
        assert_eq!(compare_field(&a, &c, "n"), Ordering::Equal);
    }
}
