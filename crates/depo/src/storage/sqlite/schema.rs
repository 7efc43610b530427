//! SQLite schema definitions and SQL statement builders.
//!
//! Every model gets its own table of `(id, attributes)` where `attributes`
//! holds the record's columns as a JSON object. Query clauses compile to
//! `json_extract` expressions over that object with bound parameters.
//! Pure functions, no I/O.

use rusqlite::types::Value as SqlValue;

use depo_core::query::{is_identifier, Direction, Filter, Operator, QuerySpec};
use depo_core::storage::{RepositoryError, Result};

use super::conversions::json_to_sql;

/// Returns the DDL creating the table of a model.
pub fn create_table(table: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {table} (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    attributes TEXT NOT NULL DEFAULT '{{}}'
);
"#
    )
}

pub fn insert_row(table: &str) -> String {
    format!("INSERT INTO {table} (attributes) VALUES (?1)")
}

pub fn select_all(table: &str) -> String {
    format!("SELECT id, attributes FROM {table} ORDER BY id ASC")
}

pub fn select_row_by_id(table: &str) -> String {
    format!("SELECT id, attributes FROM {table} WHERE id = ?1")
}

pub fn update_row(table: &str) -> String {
    format!("UPDATE {table} SET attributes = ?2 WHERE id = ?1")
}

pub fn delete_row(table: &str) -> String {
    format!("DELETE FROM {table} WHERE id = ?1")
}

/// A SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// `SELECT id, attributes` of the rows matching `spec`, ordered and windowed.
pub fn select_rows(
    table: &str,
    spec: &QuerySpec,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Result<Statement> {
    let (filter, params) = where_clause(spec)?;
    let order = order_clause(spec)?;
    let window = window_clause(limit, offset);

    Ok(Statement {
        sql: format!("SELECT id, attributes FROM {table}{filter}{order}{window}"),
        params,
    })
}

/// `COUNT(*)` of the rows matching `spec`, honouring its window.
pub fn count_rows(table: &str, spec: &QuerySpec) -> Result<Statement> {
    let (filter, params) = where_clause(spec)?;
    let window = window_clause(spec.limit, spec.offset);

    Ok(Statement {
        sql: format!("SELECT COUNT(*) FROM (SELECT id FROM {table}{filter}{window})"),
        params,
    })
}

/// `COUNT(*)` of the rows matching the filters of `spec`, ignoring its window.
pub fn count_filtered(table: &str, spec: &QuerySpec) -> Result<Statement> {
    let (filter, params) = where_clause(spec)?;

    Ok(Statement {
        sql: format!("SELECT COUNT(*) FROM {table}{filter}"),
        params,
    })
}

/// Returns the SQL expression reading `column`.
///
/// `id` is the primary key; anything else is read out of the attributes.
pub fn column_expr(column: &str) -> Result<String> {
    if column == "id" {
        return Ok("id".to_string());
    }
    if !is_identifier(column) {
        return Err(RepositoryError::invalid_arguments(
            "column",
            format!("{column:?} is not a column name"),
        ));
    }
    Ok(format!("json_extract(attributes, '$.{column}')"))
}

fn where_clause(spec: &QuerySpec) -> Result<(String, Vec<SqlValue>)> {
    if spec.filters.is_empty() {
        return Ok((String::new(), Vec::new()));
    }

    let mut params = Vec::new();
    let mut predicates = Vec::with_capacity(spec.filters.len());
    for filter in &spec.filters {
        predicates.push(predicate(filter, &mut params)?);
    }

    Ok((format!(" WHERE {}", predicates.join(" AND ")), params))
}

fn predicate(filter: &Filter, params: &mut Vec<SqlValue>) -> Result<String> {
    let column = column_expr(&filter.column)?;

    let comparison = |op: &str, params: &mut Vec<SqlValue>| {
        params.push(json_to_sql(&filter.value));
        format!("{column} {op} ?{}", params.len())
    };

    let sql = match filter.operator {
        Operator::Eq => comparison("=", params),
        Operator::Ne => comparison("<>", params),
        Operator::Lt => comparison("<", params),
        Operator::Le => comparison("<=", params),
        Operator::Gt => comparison(">", params),
        Operator::Ge => comparison(">=", params),
        Operator::Like => comparison("LIKE", params),
        Operator::IsNull => format!("{column} IS NULL"),
        Operator::NotNull => format!("{column} IS NOT NULL"),
        Operator::In | Operator::NotIn => {
            let candidates: Vec<_> = filter
                .value
                .as_array()
                .map(|values| values.iter().filter(|v| !v.is_null()).collect())
                .unwrap_or_default();

            match (filter.operator, candidates.is_empty()) {
                (Operator::In, true) => "0 = 1".to_string(),
                (_, true) => format!("{column} IS NOT NULL"),
                (operator, false) => {
                    let placeholders: Vec<String> = candidates
                        .into_iter()
                        .map(|candidate| {
                            params.push(json_to_sql(candidate));
                            format!("?{}", params.len())
                        })
                        .collect();
                    let keyword = if operator == Operator::In { "IN" } else { "NOT IN" };
                    format!("{column} {keyword} ({})", placeholders.join(", "))
                }
            }
        }
    };

    Ok(sql)
}

fn order_clause(spec: &QuerySpec) -> Result<String> {
    let mut terms = Vec::with_capacity(spec.orders.len() + 1);
    for order in &spec.orders {
        let direction = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        terms.push(format!("{} {direction}", column_expr(&order.column)?));
    }
    terms.push("id ASC".to_string());

    Ok(format!(" ORDER BY {}", terms.join(", ")))
}

fn window_clause(limit: Option<usize>, offset: Option<usize>) -> String {
    match (limit, offset) {
        (None, None) => String::new(),
        (Some(limit), None) => format!(" LIMIT {limit}"),
        (limit, Some(offset)) => {
            let limit = limit.map_or_else(|| "-1".to_string(), |l| l.to_string());
            format!(" LIMIT {limit} OFFSET {offset}")
        }
    }
}
