//! Pure SQL statement construction.
//!
//! Every builder returns the statement text plus the ordered bind values;
//! nothing here touches a connection, so translation is testable offline.
//! Identifiers are backtick-quoted; comparison values always travel as
//! placeholders. A raw filter string is spliced into the WHERE clause
//! verbatim and replaces the structured filters entirely.

use serde_json::Value;

use polystore_core::query::{FilterOp, QueryOptions, SortDirection};

/// MySQL's documented maximum row count, used when an OFFSET is requested
/// without a LIMIT (MySQL does not allow a bare OFFSET).
const NO_LIMIT: u64 = 18_446_744_073_709_551_615;

/// A statement plus its ordered bind values.
#[derive(Debug, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Value>,
}

fn quote(identifier: &str) -> String {
    format!("`{}`", identifier.replace('`', ""))
}

fn column_list(fields: &[String]) -> String {
    if fields.is_empty() {
        return "*".to_string();
    }
    let mut columns: Vec<String> = Vec::with_capacity(fields.len() + 1);
    // The id column always survives projection so mutations can target rows.
    if !fields.iter().any(|f| f == "id") {
        columns.push(quote("id"));
    }
    columns.extend(fields.iter().map(|f| quote(f)));
    columns.join(", ")
}

/// Renders the WHERE clause body for a set of structured filters.
fn where_body(options: &QueryOptions, binds: &mut Vec<Value>) -> Option<String> {
    if let Some(raw) = &options.raw_where {
        return Some(raw.clone());
    }
    if options.filters.is_empty() {
        return None;
    }

    let predicates: Vec<String> = options
        .filters
        .iter()
        .map(|filter| {
            let column = quote(&filter.field);
            match filter.op() {
                FilterOp::Eq => {
                    binds.push(filter.value.clone());
                    format!("{column} = ?")
                }
                FilterOp::Ne => {
                    binds.push(filter.value.clone());
                    format!("{column} <> ?")
                }
                FilterOp::Lt => {
                    binds.push(filter.value.clone());
                    format!("{column} < ?")
                }
                FilterOp::Lte => {
                    binds.push(filter.value.clone());
                    format!("{column} <= ?")
                }
                FilterOp::Gt => {
                    binds.push(filter.value.clone());
                    format!("{column} > ?")
                }
                FilterOp::Gte => {
                    binds.push(filter.value.clone());
                    format!("{column} >= ?")
                }
                FilterOp::Like => {
                    let needle = match &filter.value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    binds.push(Value::String(format!("%{needle}%")));
                    format!("{column} LIKE ?")
                }
                FilterOp::In | FilterOp::NotIn => {
                    // A scalar comparison value is a one-element set.
                    let values = match &filter.value {
                        Value::Array(items) => items.clone(),
                        single => vec![single.clone()],
                    };
                    if values.is_empty() {
                        // IN () is a syntax error. Nothing is in the empty
                        // set: IN matches no row, NOT IN matches every row.
                        if filter.op() == FilterOp::In {
                            "FALSE".to_string()
                        } else {
                            "TRUE".to_string()
                        }
                    } else {
                        let placeholders = vec!["?"; values.len()].join(", ");
                        binds.extend(values);
                        let keyword =
                            if filter.op() == FilterOp::In { "IN" } else { "NOT IN" };
                        format!("{column} {keyword} ({placeholders})")
                    }
                }
            }
        })
        .collect();

    Some(predicates.join(" AND "))
}

fn limit_clause(limit: Option<u64>, offset: Option<u64>) -> String {
    match (limit, offset) {
        (Some(limit), Some(offset)) => format!(" LIMIT {limit} OFFSET {offset}"),
        (Some(limit), None) => format!(" LIMIT {limit}"),
        (None, Some(offset)) => format!(" LIMIT {NO_LIMIT} OFFSET {offset}"),
        (None, None) => String::new(),
    }
}

/// Builds a SELECT for the full query vocabulary.
pub fn build_select(options: &QueryOptions) -> Statement {
    let mut binds = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM {}",
        column_list(&options.fields),
        quote(&options.collection_name)
    );

    if let Some(body) = where_body(options, &mut binds) {
        sql.push_str(" WHERE ");
        sql.push_str(&body);
    }

    if let Some(sort) = &options.sort_by {
        let direction = match sort.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {direction}", quote(&sort.field)));
    }

    sql.push_str(&limit_clause(options.limit, options.offset));
    Statement { sql, binds }
}

/// Builds an INSERT for one row.
pub fn build_insert(table: &str, data: &polystore_core::document::Document) -> Statement {
    if data.is_empty() {
        return Statement {
            sql: format!("INSERT INTO {} () VALUES ()", quote(table)),
            binds: vec![],
        };
    }
    let columns: Vec<String> = data.keys().map(|k| quote(k)).collect();
    let placeholders = vec!["?"; data.len()].join(", ");
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            quote(table),
            columns.join(", ")
        ),
        binds: data.values().cloned().collect(),
    }
}

/// Builds an UPDATE by id. Returns `None` for an empty payload, which the
/// adapter treats as a no-op.
pub fn build_update(
    table: &str,
    id: &str,
    data: &polystore_core::document::Document,
) -> Option<Statement> {
    if data.is_empty() {
        return None;
    }
    let assignments: Vec<String> = data.keys().map(|k| format!("{} = ?", quote(k))).collect();
    let mut binds: Vec<Value> = data.values().cloned().collect();
    binds.push(Value::String(id.to_string()));
    Some(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE `id` = ?",
            quote(table),
            assignments.join(", ")
        ),
        binds,
    })
}

/// Builds a DELETE by id.
pub fn build_delete(table: &str, id: &str) -> Statement {
    Statement {
        sql: format!("DELETE FROM {} WHERE `id` = ?", quote(table)),
        binds: vec![Value::String(id.to_string())],
    }
}

/// Builds a conditional UPDATE straight from the query vocabulary, avoiding
/// the read-then-mutate round trips of the simulated bulk path.
pub fn build_update_by_filter(
    options: &QueryOptions,
    data: &polystore_core::document::Document,
    limit_to_one: bool,
) -> Option<Statement> {
    if data.is_empty() {
        return None;
    }
    let assignments: Vec<String> = data.keys().map(|k| format!("{} = ?", quote(k))).collect();
    let mut binds: Vec<Value> = data.values().cloned().collect();

    let mut sql = format!(
        "UPDATE {} SET {}",
        quote(&options.collection_name),
        assignments.join(", ")
    );
    if let Some(body) = where_body(options, &mut binds) {
        sql.push_str(" WHERE ");
        sql.push_str(&body);
    }
    if limit_to_one {
        sql.push_str(" LIMIT 1");
    }
    Some(Statement { sql, binds })
}

/// Builds a conditional DELETE straight from the query vocabulary.
pub fn build_delete_by_filter(options: &QueryOptions, limit_to_one: bool) -> Statement {
    let mut binds = Vec::new();
    let mut sql = format!("DELETE FROM {}", quote(&options.collection_name));
    if let Some(body) = where_body(options, &mut binds) {
        sql.push_str(" WHERE ");
        sql.push_str(&body);
    }
    if limit_to_one {
        sql.push_str(" LIMIT 1");
    }
    Statement { sql, binds }
}
