//! Backend-neutral description of a narrowed query.
//!
//! `QuerySpec` is what the bundled engines build while scope calls arrive:
//! filters, ordering and a limit/offset window. Engines translate it into
//! their own evaluation (in-process filtering, SQL).

use serde_json::Value;

use crate::storage::{RepositoryError, Result};

use super::{ScopeCommand, ScopeRegistry};

/// Column used by `latest` and `oldest` when none is given.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "created_at";

/// Returns true if `name` is safe to use as a column name.
///
/// Column names are restricted to ASCII letters, digits and `_`.
pub fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    NotIn,
    IsNull,
    NotNull,
}

impl Operator {
    /// Parses a binary comparison operator as written in a `where` call.
    pub fn parse(op: &str) -> Option<Self> {
        match op.trim().to_ascii_lowercase().as_str() {
            "=" | "==" => Some(Operator::Eq),
            "!=" | "<>" => Some(Operator::Ne),
            "<" => Some(Operator::Lt),
            "<=" => Some(Operator::Le),
            ">" => Some(Operator::Gt),
            ">=" => Some(Operator::Ge),
            "like" => Some(Operator::Like),
            _ => None,
        }
    }
}

/// A single `column <op> value` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub operator: Operator,
    pub value: Value,
}

impl Filter {
    /// Creates a filter. `value` is ignored by `IsNull`/`NotNull`.
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// `column = value`, or `column IS NULL` when `value` is null.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if value.is_null() {
            return Self::new(column, Operator::IsNull, Value::Null);
        }
        Self::new(column, Operator::Eq, value)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(direction: &str) -> Option<Self> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }
}

/// A single ordering term.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }
}

/// What applying a [`ScopeCommand`] did to a [`QuerySpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    /// The spec was narrowed.
    Constrained,
    /// Terminal: count the matching records.
    Count,
    /// Terminal: fetch the first matching record.
    First,
    /// Terminal: check whether any record matches.
    Exists,
}

/// Filters, ordering and window of a query under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySpec {
    pub filters: Vec<Filter>,
    pub orders: Vec<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing narrows or orders the query.
    pub fn is_unconstrained(&self) -> bool {
        self == &Self::default()
    }

    pub fn push_filter(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn push_order(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = Some(limit);
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = Some(offset);
    }

    /// Applies a forwarded call.
    ///
    /// Built-in clauses are handled first, then named scopes from `scopes`.
    /// On error the spec is left unchanged.
    pub fn apply(
        &mut self,
        command: &ScopeCommand,
        scopes: &ScopeRegistry,
        model: &str,
    ) -> Result<Clause> {
        let args = Args::new(command);

        match command.name.as_str() {
            "where" => {
                let filter = parse_where(&args)?;
                self.push_filter(filter);
            }
            "whereIn" | "whereNotIn" => {
                args.expect_len(2)?;
                let column = args.column(0)?;
                let values = args.array(1)?;
                let operator = if command.name == "whereIn" {
                    Operator::In
                } else {
                    Operator::NotIn
                };
                self.push_filter(Filter::new(column, operator, Value::Array(values)));
            }
            "whereNull" | "whereNotNull" => {
                args.expect_len(1)?;
                let column = args.column(0)?;
                let operator = if command.name == "whereNull" {
                    Operator::IsNull
                } else {
                    Operator::NotNull
                };
                self.push_filter(Filter::new(column, operator, Value::Null));
            }
            "orderBy" => {
                let column = args.column(0)?;
                let direction = match args.len() {
                    1 => Direction::Asc,
                    2 => args
                        .string(1)
                        .and_then(|d| {
                            Direction::parse(&d)
                                .ok_or_else(|| args.invalid("direction must be asc or desc"))
                        })?,
                    _ => return Err(args.invalid("expected (column[, direction])")),
                };
                self.push_order(Order { column, direction });
            }
            "orderByDesc" => {
                args.expect_len(1)?;
                self.push_order(Order::desc(args.column(0)?));
            }
            "latest" | "oldest" => {
                let column = match args.len() {
                    0 => DEFAULT_TIMESTAMP_COLUMN.to_string(),
                    1 => args.column(0)?,
                    _ => return Err(args.invalid("expected ([column])")),
                };
                let order = if command.name == "latest" {
                    Order::desc(column)
                } else {
                    Order::asc(column)
                };
                self.push_order(order);
            }
            "limit" | "take" => {
                args.expect_len(1)?;
                self.set_limit(args.count(0)?);
            }
            "offset" | "skip" => {
                args.expect_len(1)?;
                self.set_offset(args.count(0)?);
            }
            "count" => {
                args.expect_len(0)?;
                return Ok(Clause::Count);
            }
            "first" => {
                args.expect_len(0)?;
                return Ok(Clause::First);
            }
            "exists" => {
                args.expect_len(0)?;
                return Ok(Clause::Exists);
            }
            name => {
                // `.` separates keywords in a cache key
                if name.contains('.') {
                    return Err(RepositoryError::invalid_arguments(
                        name,
                        "scope names cannot contain '.'",
                    ));
                }
                let Some(scope) = scopes.get(name) else {
                    return Err(RepositoryError::UnknownScope {
                        model: model.to_string(),
                        scope: name.to_string(),
                    });
                };
                let mut next = self.clone();
                scope(&mut next, &command.args)?;
                *self = next;
            }
        }

        Ok(Clause::Constrained)
    }
}

fn parse_where(args: &Args<'_>) -> Result<Filter> {
    match args.len() {
        2 => Ok(Filter::eq(args.column(0)?, args.value(1))),
        3 => {
            let column = args.column(0)?;
            let op = args.string(1)?;
            let operator = Operator::parse(&op)
                .ok_or_else(|| args.invalid(format!("unsupported operator {op}")))?;
            let value = args.value(2);
            match (operator, value.is_null()) {
                (Operator::Eq, true) => Ok(Filter::new(column, Operator::IsNull, Value::Null)),
                (Operator::Ne, true) => Ok(Filter::new(column, Operator::NotNull, Value::Null)),
                _ => Ok(Filter::new(column, operator, value)),
            }
        }
        _ => Err(args.invalid("expected (column, value) or (column, operator, value)")),
    }
}

/// Typed access to the arguments of one command.
struct Args<'a> {
    scope: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    fn new(command: &'a ScopeCommand) -> Self {
        Self {
            scope: &command.name,
            values: &command.args,
        }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn invalid(&self, reason: impl Into<String>) -> RepositoryError {
        RepositoryError::invalid_arguments(self.scope, reason)
    }

    fn expect_len(&self, len: usize) -> Result<()> {
        if self.values.len() != len {
            return Err(self.invalid(format!(
                "expected {len} argument(s), got {}",
                self.values.len()
            )));
        }
        Ok(())
    }

    fn value(&self, index: usize) -> Value {
        self.values.get(index).cloned().unwrap_or(Value::Null)
    }

    fn string(&self, index: usize) -> Result<String> {
        match self.values.get(index) {
            Some(Value::String(s)) => Ok(s.clone()),
            _ => Err(self.invalid(format!("argument {index} must be a string"))),
        }
    }

    fn column(&self, index: usize) -> Result<String> {
        let column = self.string(index)?;
        if !is_identifier(&column) {
            return Err(self.invalid(format!("invalid column name {column:?}")));
        }
        Ok(column)
    }

    fn count(&self, index: usize) -> Result<usize> {
        self.values
            .get(index)
            .and_then(Value::as_u64)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| self.invalid(format!("argument {index} must be a non-negative integer")))
    }

    fn array(&self, index: usize) -> Result<Vec<Value>> {
        match self.values.get(index) {
            Some(Value::Array(values)) => Ok(values.clone()),
            _ => Err(self.invalid(format!("argument {index} must be an array"))),
        }
    }
}
