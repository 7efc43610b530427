use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call forwarded to a query builder: a method name plus its arguments.
///
/// ```
/// use depo_core::query::ScopeCommand;
///
/// let command = ScopeCommand::new("where").arg("status").arg("open");
/// assert_eq!(command.keyword(), r#"where."status","open""#);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeCommand {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl ScopeCommand {
    /// Creates a command without arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Creates a command with the given arguments.
    pub fn with_args(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Appends an argument.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Renders the command as `name.arg1,arg2`.
    ///
    /// Arguments are rendered as compact JSON, so `"5"` and `5` stay distinct
    /// and separators inside strings are quoted.
    pub fn keyword(&self) -> String {
        let args: Vec<String> = self.args.iter().map(Value::to_string).collect();
        format!("{}.{}", self.name, args.join(","))
    }
}

impl fmt::Display for ScopeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.keyword())
    }
}
