//! Query translation into MongoDB filter documents.

use bson::{Bson, Document as BsonDocument, doc};
use serde_json::Value;

use polystore_core::{
    error::{DataError, DataResult},
    query::{Filter, FilterOp, QueryOptions},
};

/// Converts a JSON value into its BSON equivalent.
pub(crate) fn json_to_bson(value: &Value) -> Bson {
    match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => Bson::String(s.clone()),
        Value::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        Value::Object(map) => Bson::Document(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_bson(v)))
                .collect(),
        ),
    }
}

/// Builds the find/mutation filter for a query.
///
/// A raw filter string is parsed as a full native MongoDB filter document
/// (e.g. `{"age": {"$gt": 30}}`) and used verbatim; otherwise the structured
/// filters are AND-combined.
pub(crate) fn build_filter(options: &QueryOptions) -> DataResult<BsonDocument> {
    if let Some(raw) = &options.raw_where {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DataError::Configuration(format!("raw filter is not valid JSON: {e}")))?;
        return match json_to_bson(&value) {
            Bson::Document(document) => Ok(document),
            _ => Err(DataError::Configuration(
                "raw filter for the MongoDB adapter must be a JSON object".to_string(),
            )),
        };
    }

    let mut predicates: Vec<BsonDocument> = options.filters.iter().map(translate).collect();
    Ok(match predicates.len() {
        0 => doc! {},
        1 => predicates.remove(0),
        _ => doc! { "$and": predicates },
    })
}

fn translate(filter: &Filter) -> BsonDocument {
    let value = json_to_bson(&filter.value);
    let predicate = match filter.op() {
        FilterOp::Eq => doc! { "$eq": value },
        FilterOp::Ne => doc! { "$ne": value },
        FilterOp::Gt => doc! { "$gt": value },
        FilterOp::Gte => doc! { "$gte": value },
        FilterOp::Lt => doc! { "$lt": value },
        FilterOp::Lte => doc! { "$lte": value },
        FilterOp::Like => match &value {
            // Substring match; non-string needles degrade to equality.
            Bson::String(s) => doc! { "$regex": format!(".*{}.*", s), "$options": "i" },
            other => doc! { "$eq": other.clone() },
        },
        FilterOp::In => doc! { "$in": set_of(value) },
        FilterOp::NotIn => doc! { "$nin": set_of(value) },
    };
    doc! { filter.field.clone(): predicate }
}

// $in/$nin require arrays; a scalar is a one-element set.
fn set_of(value: Bson) -> Vec<Bson> {
    match value {
        Bson::Array(items) => items,
        single => vec![single],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options_with(filters: Vec<Filter>) -> QueryOptions {
        let mut options = QueryOptions::new("users");
        options.filters = filters;
        options
    }

    #[test]
    fn empty_filters_match_everything() {
        assert_eq!(build_filter(&options_with(vec![])).unwrap(), doc! {});
    }

    #[test]
    fn single_filter_skips_the_and_wrapper() {
        let filter = build_filter(&options_with(vec![Filter::eq("name", "Ada")])).unwrap();
        assert_eq!(filter, doc! { "name": { "$eq": "Ada" } });
    }

    #[test]
    fn multiple_filters_combine_with_and() {
        let filter = build_filter(&options_with(vec![
            Filter::eq("name", "Ada"),
            Filter::new("age", ">", json!(30)),
        ]))
        .unwrap();
        assert_eq!(
            filter,
            doc! { "$and": [
                { "name": { "$eq": "Ada" } },
                { "age": { "$gt": Bson::Int64(30) } },
            ]}
        );
    }

    #[test]
    fn like_becomes_a_case_insensitive_regex() {
        let filter = build_filter(&options_with(vec![Filter::new(
            "name",
            "like",
            json!("ova"),
        )]))
        .unwrap();
        assert_eq!(
            filter,
            doc! { "name": { "$regex": ".*ova.*", "$options": "i" } }
        );
    }

    #[test]
    fn like_with_a_non_string_degrades_to_equality() {
        let filter =
            build_filter(&options_with(vec![Filter::new("age", "like", json!(30))])).unwrap();
        assert_eq!(filter, doc! { "age": { "$eq": Bson::Int64(30) } });
    }

    #[test]
    fn in_wraps_scalars_into_singleton_sets() {
        let filter =
            build_filter(&options_with(vec![Filter::new("id", "in", json!(7))])).unwrap();
        assert_eq!(filter, doc! { "id": { "$in": [Bson::Int64(7)] } });

        let filter = build_filter(&options_with(vec![Filter::new(
            "id",
            "nin",
            json!([1, 2]),
        )]))
        .unwrap();
        assert_eq!(
            filter,
            doc! { "id": { "$nin": [Bson::Int64(1), Bson::Int64(2)] } }
        );
    }

    #[test]
    fn unknown_operator_degrades_to_equality() {
        let filter =
            build_filter(&options_with(vec![Filter::new("name", "~=", json!("x"))])).unwrap();
        assert_eq!(filter, doc! { "name": { "$eq": "x" } });
    }

    #[test]
    fn raw_filter_is_a_native_filter_document() {
        let mut options = options_with(vec![Filter::eq("ignored", true)]);
        options.raw_where = Some(r#"{"age": {"$gt": 30}}"#.into());

        let filter = build_filter(&options).unwrap();
        assert_eq!(filter, doc! { "age": { "$gt": Bson::Int64(30) } });
    }

    #[test]
    fn raw_filter_must_be_a_json_object() {
        let mut options = options_with(vec![]);
        options.raw_where = Some("age > 30".into());
        assert!(matches!(
            build_filter(&options).unwrap_err(),
            DataError::Configuration(_)
        ));

        options.raw_where = Some("[1, 2]".into());
        assert!(matches!(
            build_filter(&options).unwrap_err(),
            DataError::Configuration(_)
        ));
    }
}
