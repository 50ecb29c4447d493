//! Dynamic Values
//!
//! Inputs and node results share one loosely shaped payload type. Tables are
//! kept behind an `Arc` so handing a cached result to several consumers never
//! copies the data.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::data::{Summary, Table};
use crate::error::ComputeError;

/// A value held by an input or produced by a computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Table(Arc<Table>),
    Summary(Summary),
}

impl Value {
    /// Short name of the variant, used in type mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Summary(_) => "summary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of a scalar. Integers widen to `f64`.
    pub fn as_f64(&self) -> Result<f64, ComputeError> {
        match self {
            Value::Int(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            other => Err(mismatch("number", other)),
        }
    }

    pub fn as_i64(&self) -> Result<i64, ComputeError> {
        match self {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch("int", other)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ComputeError> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ComputeError> {
        match self {
            Value::Text(v) => Ok(v),
            other => Err(mismatch("text", other)),
        }
    }

    pub fn as_list(&self) -> Result<&[Value], ComputeError> {
        match self {
            Value::List(v) => Ok(v),
            other => Err(mismatch("list", other)),
        }
    }

    pub fn as_table(&self) -> Result<&Arc<Table>, ComputeError> {
        match self {
            Value::Table(v) => Ok(v),
            other => Err(mismatch("table", other)),
        }
    }

    pub fn as_summary(&self) -> Result<&Summary, ComputeError> {
        match self {
            Value::Summary(v) => Ok(v),
            other => Err(mismatch("summary", other)),
        }
    }

    /// Interpret a list as a numeric sequence. `Null` elements become missing
    /// values; anything else that is not a number is a type mismatch.
    pub fn numbers(&self) -> Result<Vec<Option<f64>>, ComputeError> {
        self.as_list()?
            .iter()
            .map(|item| match item {
                Value::Null => Ok(None),
                other => other.as_f64().map(Some),
            })
            .collect()
    }

    /// Interpret a list as a sequence of strings, e.g. the selection of a
    /// multiselect widget.
    pub fn strings(&self) -> Result<Vec<&str>, ComputeError> {
        self.as_list()?.iter().map(Value::as_str).collect()
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ComputeError {
    ComputeError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Table(table) => write!(
                f,
                "<table {} rows x {} columns>",
                table.row_count(),
                table.column_count()
            ),
            Value::Summary(summary) => write!(f, "{summary}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Table> for Value {
    fn from(v: Table) -> Self {
        Value::Table(Arc::new(v))
    }
}

impl From<Summary> for Value {
    fn from(v: Summary) -> Self {
        Value::Summary(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_treat_null_as_missing() {
        let value = Value::from(vec![Value::Int(1), Value::Null, Value::Float(2.5)]);
        assert_eq!(value.numbers().unwrap(), vec![Some(1.0), None, Some(2.5)]);
    }

    #[test]
    fn numbers_reject_text() {
        let value = Value::from(vec![Value::Int(1), Value::from("x")]);
        assert_eq!(
            value.numbers(),
            Err(ComputeError::TypeMismatch {
                expected: "number",
                found: "text"
            })
        );
    }

    #[test]
    fn display_list() {
        let value = Value::from(vec![1i64, 2, 3]);
        assert_eq!(value.to_string(), "[1, 2, 3]");
    }
}
