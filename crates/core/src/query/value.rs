use serde::{Deserialize, Serialize};

/// Outcome of forwarding a call to a query builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Delegated<V> {
    /// The call narrowed the query; keep building.
    Continue,
    /// The call produced a terminal value.
    Value(V),
}

impl<V> Delegated<V> {
    pub fn is_continue(&self) -> bool {
        matches!(self, Delegated::Continue)
    }

    pub fn into_value(self) -> Option<V> {
        match self {
            Delegated::Continue => None,
            Delegated::Value(value) => Some(value),
        }
    }
}

/// Terminal values a forwarded call can produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryValue<R> {
    Count(u64),
    First(Option<R>),
    Exists(bool),
}
