//! SQLite row conversion functions.
//!
//! Pure functions for converting between SQLite values and records.

use rusqlite::types::{Type, Value as SqlValue};
use serde_json::Value;

use depo_core::storage::{Attributes, Row};

/// Convert a SQLite row to a record.
///
/// Expected columns: id, attributes
pub fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Row> {
    let id: i64 = row.get(0)?;
    let attributes: String = row.get(1)?;

    Ok(Row {
        id,
        attributes: parse_attributes(&attributes)?,
    })
}

/// Converts a JSON value to a bound SQL parameter.
///
/// Booleans bind as 0/1, matching what `json_extract` returns for them.
/// Arrays and objects bind as their JSON text.
pub fn json_to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Parse the attributes column.
pub fn parse_attributes(s: &str) -> rusqlite::Result<Attributes> {
    serde_json::from_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))
}

/// Format attributes for SQLite storage.
pub fn format_attributes(attributes: &Attributes) -> rusqlite::Result<String> {
    serde_json::to_string(attributes).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}
