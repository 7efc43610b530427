mod command;
mod scopes;
mod spec;
mod traits;
mod value;

pub use command::ScopeCommand;
pub use scopes::{ScopeFn, ScopeRegistry};
pub use spec::{
    is_identifier, Clause, Direction, Filter, Operator, Order, QuerySpec,
    DEFAULT_TIMESTAMP_COLUMN,
};
pub use traits::QueryBuilder;
pub use value::{Delegated, QueryValue};
