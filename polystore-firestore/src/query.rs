//! Structured query construction for the Firestore REST API.

use serde_json::{Value, json};
use tracing::debug;

use polystore_core::{
    error::{DataError, DataResult},
    query::{Filter, FilterOp, QueryOptions, Sort, SortDirection},
};

use crate::value::encode_value;

fn op_token(op: FilterOp) -> &'static str {
    match op {
        FilterOp::Eq => "EQUAL",
        FilterOp::Ne => "NOT_EQUAL",
        FilterOp::Lt => "LESS_THAN",
        FilterOp::Lte => "LESS_THAN_OR_EQUAL",
        FilterOp::Gt => "GREATER_THAN",
        FilterOp::Gte => "GREATER_THAN_OR_EQUAL",
        FilterOp::In => "IN",
        FilterOp::NotIn => "NOT_IN",
        // Firestore has no substring operator.
        FilterOp::Like => {
            debug!("substring filter degrades to equality on this backend");
            "EQUAL"
        }
    }
}

fn field_filter(filter: &Filter) -> Value {
    let op = filter.op();
    // IN/NOT_IN comparisons require an array value.
    let value = match (op, &filter.value) {
        (FilterOp::In | FilterOp::NotIn, Value::Array(_)) => encode_value(&filter.value),
        (FilterOp::In | FilterOp::NotIn, single) => {
            encode_value(&Value::Array(vec![single.clone()]))
        }
        (_, value) => encode_value(value),
    };
    json!({
        "fieldFilter": {
            "field": { "fieldPath": filter.field },
            "op": op_token(op),
            "value": value,
        }
    })
}

/// Builds the `where` clause, or `None` for an unfiltered query.
///
/// A raw filter string is parsed as a JSON object of field-to-value equality
/// constraints and replaces the structured filters.
fn where_clause(options: &QueryOptions) -> DataResult<Option<Value>> {
    let filters: Vec<Filter> = match &options.raw_where {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).map_err(|e| {
                DataError::Configuration(format!("raw filter is not valid JSON: {e}"))
            })?;
            let Value::Object(map) = value else {
                return Err(DataError::Configuration(
                    "raw filter for the Firestore adapter must be a JSON object of equality constraints"
                        .to_string(),
                ));
            };
            map.into_iter().map(|(k, v)| Filter::eq(k, v)).collect()
        }
        None => options.filters.clone(),
    };

    let mut predicates: Vec<Value> = filters.iter().map(field_filter).collect();
    Ok(match predicates.len() {
        0 => None,
        1 => Some(predicates.remove(0)),
        _ => Some(json!({
            "compositeFilter": { "op": "AND", "filters": predicates }
        })),
    })
}

/// Renders the orderBy list: the requested sort plus `__name__` as a
/// tiebreaker, so cursor positions are always unique.
fn order_by(sort: &Sort) -> Value {
    let direction = match sort.direction {
        SortDirection::Asc => "ASCENDING",
        SortDirection::Desc => "DESCENDING",
    };
    json!([
        { "field": { "fieldPath": sort.field }, "direction": direction },
        { "field": { "fieldPath": "__name__" }, "direction": direction },
    ])
}

/// Builds the main structured query, optionally resuming after a cursor
/// produced by [`build_prefix_query`]'s results.
pub(crate) fn build_query(options: &QueryOptions, start_at: Option<Value>) -> DataResult<Value> {
    let mut map = serde_json::Map::new();
    map.insert(
        "from".to_string(),
        json!([{ "collectionId": options.collection_name }]),
    );

    if let Some(clause) = where_clause(options)? {
        map.insert("where".to_string(), clause);
    }
    if let Some(sort) = &options.sort_by {
        map.insert("orderBy".to_string(), order_by(sort));
    }
    if !options.fields.is_empty() {
        map.insert(
            "select".to_string(),
            json!({
                "fields": options
                    .fields
                    .iter()
                    .map(|f| json!({ "fieldPath": f }))
                    .collect::<Vec<_>>()
            }),
        );
    }
    if let Some(cursor) = start_at {
        map.insert("startAt".to_string(), cursor);
    }
    if let Some(limit) = options.limit {
        map.insert("limit".to_string(), json!(limit));
    }
    Ok(Value::Object(map))
}

/// Builds the query that fetches the documents to skip for an offset: the
/// same shape as the main query, capped at the offset, without projection so
/// the cursor can read the sort field.
pub(crate) fn build_prefix_query(options: &QueryOptions, offset: u64) -> DataResult<Value> {
    let mut prefix = options.clone();
    prefix.fields = vec![];
    prefix.limit = Some(offset);
    prefix.offset = None;
    build_query(&prefix, None)
}
