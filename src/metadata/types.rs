//! Loosely typed values and rows returned by a [`MetadataProvider`].
//!
//! Rows are ordered field→value mappings. Only the discovery collector reads
//! them; everything downstream works on typed records.
//!
//! [`MetadataProvider`]: super::MetadataProvider

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{MetadataError, MetadataResult};

/// A single scalar returned by (or passed to) a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Whether the value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Interpret as an integer. Integral reals and numeric text are accepted.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Interpret as a boolean, accepting catalog spellings like `YES`/`NO`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Text(s) => match s.to_ascii_uppercase().as_str() {
                "YES" | "Y" | "TRUE" | "T" | "1" => Some(true),
                "NO" | "N" | "FALSE" | "F" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Integer(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// One result row: field names in statement order, paired with values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    fields: Vec<(String, Value)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a field.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Look up a field by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn require(&self, name: &str) -> MetadataResult<&Value> {
        self.get(name)
            .ok_or_else(|| MetadataError::MissingField(name.to_string()))
    }

    /// Required text field.
    pub fn text(&self, name: &str) -> MetadataResult<String> {
        match self.require(name)? {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(MetadataError::UnexpectedType {
                field: name.to_string(),
                expected: "text",
            }),
        }
    }

    /// Optional text field; NULL and absent both yield `None`.
    pub fn opt_text(&self, name: &str) -> MetadataResult<Option<String>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.text(name).map(Some),
        }
    }

    /// Required non-negative count.
    pub fn count(&self, name: &str) -> MetadataResult<u64> {
        self.require(name)?
            .as_i64()
            .and_then(|i| u64::try_from(i).ok())
            .ok_or_else(|| MetadataError::UnexpectedType {
                field: name.to_string(),
                expected: "a non-negative integer",
            })
    }

    /// Optional integer; NULL and absent both yield `None`.
    pub fn opt_i64(&self, name: &str) -> MetadataResult<Option<i64>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => v.as_i64().map(Some).ok_or_else(|| MetadataError::UnexpectedType {
                field: name.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Required boolean flag.
    pub fn flag(&self, name: &str) -> MetadataResult<bool> {
        self.require(name)?
            .as_bool()
            .ok_or_else(|| MetadataError::UnexpectedType {
                field: name.to_string(),
                expected: "a boolean",
            })
    }
}
