//! MySQL value decoding into JSON documents.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use polystore_core::document::Document;

/// Converts one result row into a JSON document, decoding each column by its
/// reported MySQL type name.
pub fn row_to_document(row: &MySqlRow) -> Document {
    row.columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            (
                column.name().to_string(),
                decode_column(row, index, column.type_info().name()),
            )
        })
        .collect()
}

fn decode_column(row: &MySqlRow, index: usize, type_name: &str) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Err(_) => return Value::Null,
        _ => {}
    }

    match type_name {
        // MySQL booleans are TINYINT(1) under the hood.
        "BOOLEAN" | "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),

        "TINYINT" => int_value(row.try_get::<i8, _>(index).map(i64::from)),
        "TINYINT UNSIGNED" => int_value(row.try_get::<u8, _>(index).map(i64::from)),
        "SMALLINT" => int_value(row.try_get::<i16, _>(index).map(i64::from)),
        "SMALLINT UNSIGNED" => int_value(row.try_get::<u16, _>(index).map(i64::from)),
        "MEDIUMINT" | "INT" | "INTEGER" => int_value(row.try_get::<i32, _>(index).map(i64::from)),
        "MEDIUMINT UNSIGNED" | "INT UNSIGNED" | "INTEGER UNSIGNED" => {
            int_value(row.try_get::<u32, _>(index).map(i64::from))
        }
        "BIGINT" => int_value(row.try_get::<i64, _>(index)),
        "BIGINT UNSIGNED" => row
            .try_get::<u64, _>(index)
            .map(|v| Value::Number(Number::from(v)))
            .unwrap_or(Value::Null),
        "YEAR" => int_value(row.try_get::<i16, _>(index).map(i64::from)),

        "FLOAT" => float_value(row.try_get::<f32, _>(index).map(f64::from)),
        "DOUBLE" | "DOUBLE PRECISION" | "REAL" => float_value(row.try_get::<f64, _>(index)),

        // Decimals are rendered as strings to avoid float precision loss.
        "DECIMAL" | "NUMERIC" | "DEC" | "FIXED" => row
            .try_get::<Decimal, _>(index)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),

        "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),

        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|v| Value::String(v.to_rfc3339()))
            .or_else(|_| {
                row.try_get::<NaiveDateTime, _>(index)
                    .map(|v| Value::String(v.to_string()))
            })
            .unwrap_or(Value::Null),

        "JSON" => row
            .try_get::<Value, _>(index)
            .unwrap_or(Value::Null),

        _ if type_name.starts_with("ENUM") || type_name.starts_with("SET") => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),

        // Unknown types fall back to whatever representation decodes.
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .or_else(|_| row.try_get::<i64, _>(index).map(Value::from))
            .or_else(|_| row.try_get::<f64, _>(index).map(Value::from))
            .unwrap_or(Value::Null),
    }
}

fn int_value(result: Result<i64, sqlx::Error>) -> Value {
    result.map(Value::from).unwrap_or(Value::Null)
}

fn float_value(result: Result<f64, sqlx::Error>) -> Value {
    result.map(Value::from).unwrap_or(Value::Null)
}
