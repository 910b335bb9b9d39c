//! Query-string construction for REST-style collection endpoints.
//!
//! Follows the common `_sort`/`_order`/`_limit`/`_page` conventions of
//! JSON-server-style APIs: filters become plain `field=value` pairs and an
//! offset is expressed as a page number relative to the limit.

use serde_json::Value;
use tracing::debug;

use polystore_core::{
    error::{DataError, DataResult},
    query::{FilterOp, QueryOptions, SortDirection},
};

/// Renders a comparison value as a query-string literal.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Builds the collection GET URL for a query.
///
/// A raw filter string is used as the query string verbatim (a leading `?`
/// is tolerated) and replaces the structured filters; paging and sort
/// parameters are appended either way.
pub(crate) fn build_get_url(base_path: &str, options: &QueryOptions) -> DataResult<reqwest::Url> {
    let mut url = collection_url(base_path, &options.collection_name)?;
    let mut pairs: Vec<(String, String)> = Vec::new();

    if let Some(raw) = &options.raw_where {
        url.set_query(Some(raw.trim_start_matches('?')));
    } else {
        for filter in &options.filters {
            if filter.op() != FilterOp::Eq {
                // The query-string convention only carries equality.
                debug!(
                    field = %filter.field,
                    operator = %filter.operator,
                    "non-equality filter sent as equality on this backend"
                );
            }
            pairs.push((filter.field.clone(), render_value(&filter.value)));
        }
    }

    if let Some(sort) = &options.sort_by {
        pairs.push(("_sort".into(), sort.field.clone()));
        let order = match sort.direction {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        };
        pairs.push(("_order".into(), order.into()));
    }
    if let Some(limit) = options.limit {
        pairs.push(("_limit".into(), limit.to_string()));
    }
    if let Some(offset) = options.offset.filter(|o| *o > 0) {
        match options.limit {
            // Pages are 1-based; the offset rounds down to a page boundary.
            Some(limit) if limit > 0 => {
                pairs.push(("_page".into(), (offset / limit + 1).to_string()));
            }
            _ => debug!(offset, "offset without a limit has no page equivalent, ignoring"),
        }
    }

    if !pairs.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in &pairs {
            query.append_pair(key, value);
        }
    }
    Ok(url)
}

/// The collection endpoint, e.g. `https://api.example.com/users`.
pub(crate) fn collection_url(base_path: &str, collection: &str) -> DataResult<reqwest::Url> {
    parse_url(&format!("{}/{collection}", base_path.trim_end_matches('/')))
}

/// The single-document endpoint, e.g. `https://api.example.com/users/7`.
pub(crate) fn document_url(base_path: &str, collection: &str, id: &str) -> DataResult<reqwest::Url> {
    parse_url(&format!(
        "{}/{collection}/{id}",
        base_path.trim_end_matches('/')
    ))
}

fn parse_url(raw: &str) -> DataResult<reqwest::Url> {
    reqwest::Url::parse(raw)
        .map_err(|e| DataError::Configuration(format!("invalid endpoint URL '{raw}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::query::{Filter, Sort};
    use serde_json::json;

    const BASE: &str = "https://api.example.com/v1/";

    #[test]
    fn filters_become_plain_query_pairs() {
        let mut options = QueryOptions::new("users");
        options.filters = vec![
            Filter::eq("name", "Ada Lovelace"),
            Filter::eq("age", json!(36)),
        ];
        let url = build_get_url(BASE, &options).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/users?name=Ada+Lovelace&age=36"
        );
    }

    #[test]
    fn raw_filter_replaces_the_structured_query_string() {
        let mut options = QueryOptions::new("users");
        options.filters = vec![Filter::eq("ignored", true)];
        options.raw_where = Some("?name_like=Ada&active=true".into());
        options.limit = Some(5);

        let url = build_get_url(BASE, &options).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/users?name_like=Ada&active=true&_limit=5"
        );
    }

    #[test]
    fn sort_and_paging_use_the_underscore_conventions() {
        let mut options = QueryOptions::new("users");
        options.sort_by = Some(Sort::new("age", SortDirection::Desc));
        options.limit = Some(10);
        options.offset = Some(25);

        let url = build_get_url(BASE, &options).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/users?_sort=age&_order=desc&_limit=10&_page=3"
        );
    }

    #[test]
    fn offset_without_a_limit_is_dropped() {
        let mut options = QueryOptions::new("users");
        options.offset = Some(25);
        let url = build_get_url(BASE, &options).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/users");
    }

    #[test]
    fn document_urls_nest_under_the_collection() {
        let url = document_url("https://api.example.com/v1", "users", "7").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/users/7");
    }

    #[test]
    fn invalid_base_paths_are_configuration_errors() {
        let err = collection_url("not a url", "users").unwrap_err();
        assert!(matches!(err, DataError::Configuration(_)));
    }
}
