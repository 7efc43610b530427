//! Evaluation of `QuerySpec` clauses against in-memory rows.
//!
//! Comparison follows SQLite's rules closely enough for the two engines to
//! agree: NULL never compares equal, booleans compare as 0/1, and values of
//! different kinds order as NULL < numbers < text < anything else.

use std::cmp::Ordering;

use serde_json::Value;

use depo_core::query::{Direction, Filter, Operator, Order, QuerySpec};
use depo_core::storage::Row;

/// Returns the value of `column` for `row`; `id` resolves to the primary key.
pub(super) fn column_value(row: &Row, column: &str) -> Value {
    if column == "id" {
        return Value::from(row.id);
    }
    row.attribute(column).cloned().unwrap_or(Value::Null)
}

/// Returns true if `row` satisfies every filter of `spec`.
pub(super) fn matches_all(spec: &QuerySpec, row: &Row) -> bool {
    spec.filters.iter().all(|filter| matches(filter, row))
}

/// Returns true if `row` satisfies `filter`.
pub(super) fn matches(filter: &Filter, row: &Row) -> bool {
    let value = column_value(row, &filter.column);

    match filter.operator {
        Operator::IsNull => value.is_null(),
        Operator::NotNull => !value.is_null(),
        _ if value.is_null() => false,
        Operator::Eq => compare_non_null(&value, &filter.value) == Some(Ordering::Equal),
        Operator::Ne => compare_non_null(&value, &filter.value)
            .is_some_and(|ordering| ordering != Ordering::Equal),
        Operator::Lt => compare_non_null(&value, &filter.value) == Some(Ordering::Less),
        Operator::Le => compare_non_null(&value, &filter.value)
            .is_some_and(|ordering| ordering != Ordering::Greater),
        Operator::Gt => compare_non_null(&value, &filter.value) == Some(Ordering::Greater),
        Operator::Ge => compare_non_null(&value, &filter.value)
            .is_some_and(|ordering| ordering != Ordering::Less),
        Operator::Like => filter
            .value
            .as_str()
            .is_some_and(|pattern| like(pattern, &as_text(&value))),
        Operator::In => filter.value.as_array().is_some_and(|candidates| {
            candidates
                .iter()
                .any(|candidate| compare_non_null(&value, candidate) == Some(Ordering::Equal))
        }),
        Operator::NotIn => filter.value.as_array().is_some_and(|candidates| {
            candidates
                .iter()
                .all(|candidate| compare_non_null(&value, candidate) != Some(Ordering::Equal))
        }),
    }
}

/// Sorts rows by the ordering terms, ties broken by id.
pub(super) fn sort_rows(rows: &mut [Row], orders: &[Order]) {
    rows.sort_by(|a, b| {
        for order in orders {
            let ordering = compare_values(
                &column_value(a, &order.column),
                &column_value(b, &order.column),
            );
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        a.id.cmp(&b.id)
    });
}

/// Total order over JSON values.
pub(super) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }

    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) == 1 => match (as_integer(a), as_integer(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => as_float(a)
                .partial_cmp(&as_float(b))
                .unwrap_or(Ordering::Equal),
        },
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn compare_non_null(a: &Value, b: &Value) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    Some(compare_values(a, b))
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Array(_) | Value::Object(_) => 3,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => i64::from(*b).to_string(),
        other => other.to_string(),
    }
}

/// SQL `LIKE`: `%` matches any run, `_` any single character, ASCII case-insensitive.
fn like(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, mark)) = backtrack {
            p = star + 1;
            t = mark + 1;
            backtrack = Some((star, mark + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}
