//! The backend-agnostic query vocabulary.
//!
//! Every read or filtered mutation is described by a [`QueryOptions`] value:
//! structured [`Filter`]s (combined with logical AND), an optional raw filter
//! string that bypasses them, sort, limit/offset and a field projection. The
//! adapters translate this one vocabulary into their native query shapes.
//!
//! # Operator tokens
//!
//! Filter operators travel as plain tokens (`"="`, `"!="`, `"like"`, `"in"`,
//! ...). Adapters normalize them through [`FilterOp::from_token`], which maps
//! unrecognized tokens to equality rather than failing. This leniency is
//! deliberate and uniform across backends; implementers preferring strictness
//! should validate tokens before building the query.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A to Z, 0 to 9, earliest to latest).
    Asc,
    /// Descending order (Z to A, 9 to 0, latest to earliest).
    Desc,
}

/// Sort specification: which field to sort by and in which direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sort {
    /// The field name to sort by.
    pub field: String,
    /// The sort direction.
    pub direction: SortDirection,
}

impl Sort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self { field: field.into(), direction }
    }
}

/// A single structured filter: field, operator token and comparison value.
///
/// Filters within one query combine with logical AND; there is no structured
/// OR. The operator is kept as its wire token so the value round-trips
/// through persistence layers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: String,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// Equality filter, the default operator.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, "=", value)
    }

    /// The normalized operator for this filter.
    pub fn op(&self) -> FilterOp {
        FilterOp::from_token(&self.operator)
    }
}

/// Normalized filter operators understood by every adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Substring match (`like`/`contains`); backends without a native
    /// substring operator degrade to equality.
    Like,
    In,
    NotIn,
}

impl FilterOp {
    /// Normalizes an operator token.
    ///
    /// Unrecognized tokens fall back to [`FilterOp::Eq`]. This is the single
    /// normalization point for all adapters, so the fallback behaves
    /// identically everywhere.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "=" | "==" | "eq" => FilterOp::Eq,
            "!=" | "<>" | "ne" => FilterOp::Ne,
            "<" | "lt" => FilterOp::Lt,
            "<=" | "lte" => FilterOp::Lte,
            ">" | "gt" => FilterOp::Gt,
            ">=" | "gte" => FilterOp::Gte,
            "like" | "contains" => FilterOp::Like,
            "in" => FilterOp::In,
            "nin" | "notin" | "not in" => FilterOp::NotIn,
            other => {
                debug!(operator = other, "unrecognized filter operator, falling back to equality");
                FilterOp::Eq
            }
        }
    }
}

/// The backend-agnostic description of a read/mutate target.
///
/// When `raw_where` is set it overrides `filters` entirely in every adapter's
/// translation; the structured filters are ignored, not merged. An empty
/// `fields` list means "all fields".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub collection_name: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub raw_where: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub sort_by: Option<Sort>,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl QueryOptions {
    /// Creates empty options targeting one collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection_name: collection.into(),
            ..Default::default()
        }
    }

    /// A copy of these options limited to a single result.
    pub fn first_only(&self) -> Self {
        let mut options = self.clone();
        options.limit = Some(1);
        options
    }
}
