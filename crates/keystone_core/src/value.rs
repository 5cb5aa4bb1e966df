//! Attribute values.

use crate::error::{CoreError, CoreResult};
use crate::reference::Reference;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of a resource attribute as written in a declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Quoted string literal
    String(String),
    /// Numeric literal
    Number(serde_json::Number),
    /// Boolean literal
    Bool(bool),
    /// Heredoc text
    Text(String),
    /// Bare expression, e.g. `role.ProductLambdaRole.arn`
    Expression(String),
    /// List of values
    List(Vec<Value>),
}

impl Value {
    /// Parse a numeric literal
    ///
    /// # Errors
    ///
    /// Returns error if the text is not a JSON-compatible number
    pub fn number(text: &str) -> CoreResult<Self> {
        serde_json::from_str::<serde_json::Number>(text)
            .map(Self::Number)
            .map_err(|_| CoreError::InvalidEncoding {
                message: format!("`{}` is not a number", text),
            })
    }

    /// Get the kind of this value as written
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) | Self::Text(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Expression(_) => ValueKind::Reference,
            Self::List(_) => ValueKind::ReferenceList,
        }
    }

    /// Text of this value if it may be read as a reference expression.
    ///
    /// Bare expressions always qualify. Quoted strings qualify too so that
    /// JSON declarations, which have no bare syntax, can carry references.
    #[must_use]
    pub fn as_reference_expr(&self) -> Option<&str> {
        match self {
            Self::Expression(expr) | Self::String(expr) => Some(expr),
            _ => None,
        }
    }

    /// Check whether this value can stand where `expected` is declared
    #[must_use]
    pub fn satisfies(&self, expected: ValueKind) -> bool {
        match expected {
            ValueKind::String => matches!(self, Self::String(_) | Self::Text(_)),
            ValueKind::Number => matches!(self, Self::Number(_)),
            ValueKind::Boolean => matches!(self, Self::Bool(_)),
            ValueKind::Reference => self
                .as_reference_expr()
                .is_some_and(|expr| Reference::split(expr).is_ok()),
            ValueKind::ReferenceList => match self {
                Self::List(items) => items.iter().all(|v| v.satisfies(ValueKind::Reference)),
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{:?}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Text(_) => f.write_str("<<heredoc>>"),
            Self::Expression(e) => f.write_str(e),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Kind of value an attribute schema expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// String or heredoc text
    String,
    /// Number
    Number,
    /// Boolean
    Boolean,
    /// Reference to another resource
    Reference,
    /// List of references
    ReferenceList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Reference => "reference",
            Self::ReferenceList => "reference list",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parse() {
        assert!(matches!(Value::number("5"), Ok(Value::Number(_))));
        assert!(matches!(Value::number("-0.25"), Ok(Value::Number(_))));
        assert!(Value::number("five").is_err());
    }

    #[test]
    fn test_satisfies_literals() {
        assert!(Value::String("x".into()).satisfies(ValueKind::String));
        assert!(Value::Text("doc".into()).satisfies(ValueKind::String));
        assert!(Value::Bool(true).satisfies(ValueKind::Boolean));
        assert!(!Value::Bool(true).satisfies(ValueKind::String));
        assert!(!Value::String("5".into()).satisfies(ValueKind::Number));
    }

    #[test]
    fn test_satisfies_reference() {
        assert!(Value::Expression("role.r.arn".into()).satisfies(ValueKind::Reference));
        assert!(Value::String("role.r.arn".into()).satisfies(ValueKind::Reference));
        assert!(!Value::String("not a reference".into()).satisfies(ValueKind::Reference));
        assert!(!Value::Text("role.r.arn".into()).satisfies(ValueKind::Reference));
    }

    #[test]
    fn test_satisfies_reference_list() {
        let list = Value::List(vec![
            Value::Expression("role.r".into()),
            Value::Expression("table.t".into()),
        ]);
        assert!(list.satisfies(ValueKind::ReferenceList));
        let mixed = Value::List(vec![Value::Expression("role.r".into()), Value::Bool(false)]);
        assert!(!mixed.satisfies(ValueKind::ReferenceList));
    }

    #[test]
    fn test_display_list() {
        let list = Value::List(vec![Value::Expression("role.r".into()), Value::Bool(true)]);
        assert_eq!(list.to_string(), "[role.r, true]");
    }
}
