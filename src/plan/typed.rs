//! Validated, closed plan representation
//!
//! Everything the compiler consumes is expressed as enums over interned
//! catalog ids. Once a `ValidatedPlan` exists, no string vocabulary remains.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::catalog::{EntityId, FieldId, ValueKind};

/// Canonical text form for timestamps bound as parameters
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses the accepted timestamp spellings.
///
/// RFC 3339 values are converted to UTC. Date-only values mean midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Aggregate,
}

impl Operation {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "list" => Some(Operation::List),
            "aggregate" => Some(Operation::Aggregate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Aggregate => "aggregate",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "asc" => Some(Direction::Asc),
            "desc" => Some(Direction::Desc),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Avg),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Kind of the output column given the input field kind
    pub fn output_kind(&self, input: Option<ValueKind>) -> ValueKind {
        match self {
            AggregateFunction::Count | AggregateFunction::Sum | AggregateFunction::Avg => {
                ValueKind::Number
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                input.unwrap_or(ValueKind::Number)
            }
        }
    }
}

/// A typed filter value
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Timestamp(NaiveDateTime),
}

impl Scalar {
    /// Converts a JSON value into a scalar of the given kind.
    ///
    /// Returns `None` when the JSON type does not match the kind exactly;
    /// there is no coercion between kinds.
    pub fn from_json(kind: ValueKind, value: &Value) -> Option<Self> {
        match kind {
            ValueKind::String => value.as_str().map(|s| Scalar::Text(s.to_string())),
            ValueKind::Number => match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(Scalar::Integer)
                    .or_else(|| n.as_f64().map(Scalar::Real)),
                _ => None,
            },
            ValueKind::Boolean => value.as_bool().map(Scalar::Bool),
            ValueKind::Timestamp => value
                .as_str()
                .and_then(parse_timestamp)
                .map(Scalar::Timestamp),
        }
    }

    /// Orders two scalars of the same kind
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Text(a), Scalar::Text(b)) => Some(a.cmp(b)),
            (Scalar::Integer(a), Scalar::Integer(b)) => Some(a.cmp(b)),
            (Scalar::Integer(a), Scalar::Real(b)) => (*a as f64).partial_cmp(b),
            (Scalar::Real(a), Scalar::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Scalar::Real(a), Scalar::Real(b)) => a.partial_cmp(b),
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Timestamp(a), Scalar::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Single-value comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// Operator and value, with arity fixed by the variant
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare(CompareOp, Scalar),
    In(Vec<Scalar>),
    /// Raw caller text; wildcard wrapping happens in the compiler
    Like(String),
    Between(Scalar, Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundFilter {
    pub field: FieldId,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateTarget {
    AllRows,
    Field(FieldId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundAggregation {
    pub function: AggregateFunction,
    pub target: AggregateTarget,
    pub alias: String,
}

/// What an ordering key refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderTarget {
    Field(FieldId),
    /// Index into `ValidatedPlan::aggregations`
    Aggregate(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundOrder {
    pub target: OrderTarget,
    pub direction: Direction,
}

/// Inclusive, ordered time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundTimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A plan that passed validation against a specific catalog
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub entity: EntityId,
    pub operation: Operation,
    pub filters: Vec<BoundFilter>,
    pub order_by: Vec<BoundOrder>,
    pub group_by: Vec<FieldId>,
    pub aggregations: Vec<BoundAggregation>,
    pub time_range: Option<BoundTimeRange>,
    pub limit: u32,
    pub request_id: Option<String>,
}
