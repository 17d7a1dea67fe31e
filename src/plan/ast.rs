//! Wire-level query plan
//!
//! This is the JSON shape produced by the upstream plan generator. Vocabulary
//! fields stay strings here so that unknown values are reported by the
//! validator with a proper error code instead of failing deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structured, already-parsed query intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// Logical entity name
    pub entity: String,
    /// `list` or `aggregate`
    pub operation: String,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub order_by: Vec<OrderSpec>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Page size; the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
    /// Opaque caller identifier, echoed in logs and results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// A single filter on a logical field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

/// Ordering on a logical field or aggregate alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default = "default_direction")]
    pub direction: String,
}

fn default_direction() -> String {
    "asc".to_string()
}

/// Aggregate output column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub function: String,
    /// Logical field, or `*`/absent for all rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub alias: String,
}

/// Inclusive time window; both bounds must be present to count
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl TimeRange {
    /// Create a complete time range
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: Some(start.into()),
            end: Some(end.into()),
        }
    }
}

impl QueryPlan {
    /// Create a list plan
    pub fn list(entity: impl Into<String>) -> Self {
        Self::new(entity, "list")
    }

    /// Create an aggregate plan
    pub fn aggregate(entity: impl Into<String>) -> Self {
        Self::new(entity, "aggregate")
    }

    fn new(entity: impl Into<String>, operation: &str) -> Self {
        Self {
            entity: entity.into(),
            operation: operation.to_string(),
            filters: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            aggregations: Vec::new(),
            time_range: None,
            limit: None,
            request_id: None,
        }
    }

    /// Add a filter
    pub fn filter(mut self, field: &str, operator: &str, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            operator: operator.to_string(),
            value,
        });
        self
    }

    /// Add an ordering key
    pub fn order(mut self, field: &str, direction: &str) -> Self {
        self.order_by.push(OrderSpec {
            field: field.to_string(),
            direction: direction.to_string(),
        });
        self
    }

    /// Add a group-by field
    pub fn group(mut self, field: &str) -> Self {
        self.group_by.push(field.to_string());
        self
    }

    /// Add an aggregation; `None` field means all rows
    pub fn aggregation(mut self, function: &str, field: Option<&str>, alias: &str) -> Self {
        self.aggregations.push(Aggregation {
            function: function.to_string(),
            field: field.map(str::to_string),
            alias: alias.to_string(),
        });
        self
    }

    /// Set the time window
    pub fn between(mut self, start: &str, end: &str) -> Self {
        self.time_range = Some(TimeRange::new(start, end));
        self
    }

    /// Set the page size
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the request identifier
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}
