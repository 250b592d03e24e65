//! Runtime values and the implicit coercion rules between them.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kinds of values an expression can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Boolean,
    Integer,
    String,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Boolean => "Boolean",
            ValueKind::Integer => "Integer",
            ValueKind::String => "String",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value produced by a literal or by evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    String(String),
}

/// A value could not be converted to the kind an operator requires.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {from} value '{value}' to {to}")]
pub struct CoercionError {
    pub from: ValueKind,
    pub to: ValueKind,
    pub value: String,
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Integer(_) => ValueKind::Integer,
            Value::String(_) => ValueKind::String,
        }
    }

    /// Coerce this value to the requested kind.
    ///
    /// - String to Integer parses a signed decimal literal.
    /// - Anything to String renders the canonical text.
    /// - Boolean is never produced from another kind, and never turns into
    ///   an Integer.
    pub fn coerce(self, kind: ValueKind) -> Result<Value, CoercionError> {
        match kind {
            ValueKind::Boolean => self.into_boolean().map(Value::Boolean),
            ValueKind::Integer => self.into_integer().map(Value::Integer),
            ValueKind::String => Ok(Value::String(self.into_string())),
        }
    }

    /// Coerce to an Integer, parsing strings as decimal literals
    pub fn into_integer(self) -> Result<i32, CoercionError> {
        match self {
            Value::Integer(n) => Ok(n),
            Value::String(s) => s.parse::<i32>().map_err(|_| CoercionError {
                from: ValueKind::String,
                to: ValueKind::Integer,
                value: s,
            }),
            Value::Boolean(b) => Err(CoercionError {
                from: ValueKind::Boolean,
                to: ValueKind::Integer,
                value: b.to_string(),
            }),
        }
    }

    /// Coerce to a Boolean. Only Boolean values qualify.
    pub fn into_boolean(self) -> Result<bool, CoercionError> {
        match self {
            Value::Boolean(b) => Ok(b),
            other => Err(CoercionError {
                from: other.kind(),
                to: ValueKind::Boolean,
                value: other.to_string(),
            }),
        }
    }

    /// Render as text. Always succeeds.
    pub fn into_string(self) -> String {
        match self {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
