//! Bound SQL parameters

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::ValueKind;
use crate::plan::{Scalar, TIMESTAMP_FORMAT};

/// A single positional parameter
///
/// Timestamps from plans are bound as text in `TIMESTAMP_FORMAT`. `Null` only
/// appears in keyset cursors and is rendered as `IS NULL`, never bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SqlParam {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Null,
}

impl SqlParam {
    /// Keyset cursor value for a decoded row value.
    ///
    /// Text and timestamps are carried exactly as stored so the next page
    /// compares against the column's own representation. Returns `None` when
    /// the value does not fit the kind.
    pub fn cursor_value(kind: ValueKind, value: &Value) -> Option<Self> {
        match (kind, value) {
            (_, Value::Null) => Some(SqlParam::Null),
            (ValueKind::String | ValueKind::Timestamp, Value::String(s)) => {
                Some(SqlParam::Text(s.clone()))
            }
            (ValueKind::Number, Value::Number(n)) => match n.as_i64() {
                Some(i) => Some(SqlParam::Integer(i)),
                None => n.as_f64().map(SqlParam::Real),
            },
            (ValueKind::Boolean, Value::Bool(b)) => Some(SqlParam::Bool(*b)),
            _ => None,
        }
    }

    /// JSON rendering for diagnostics
    pub fn to_json(&self) -> Value {
        match self {
            SqlParam::Text(s) => Value::String(s.clone()),
            SqlParam::Integer(i) => Value::from(*i),
            SqlParam::Real(f) => Value::from(*f),
            SqlParam::Bool(b) => Value::Bool(*b),
            SqlParam::Null => Value::Null,
        }
    }
}

impl From<&Scalar> for SqlParam {
    fn from(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => SqlParam::Text(s.clone()),
            Scalar::Integer(i) => SqlParam::Integer(*i),
            Scalar::Real(f) => SqlParam::Real(*f),
            Scalar::Bool(b) => SqlParam::Bool(*b),
            Scalar::Timestamp(ts) => SqlParam::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
        }
    }
}

/// SQL text with `?` placeholders and the values bound to them, in order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlQuery {
    /// Number of `?` placeholders in the text
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Escapes `%`, `_` and `\` so they match literally under `ESCAPE '\'`,
/// then wraps the value for a contains match.
pub fn like_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}
