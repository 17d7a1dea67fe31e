//! Plan validator
//!
//! Checks run in a fixed order so the same plan always fails the same way:
//! 1. Entity is declared
//! 2. Operation and aggregation functions are in the vocabulary
//! 3. Every referenced field resolves
//! 4. Operators, values, directions and aliases are well formed
//! 5. Entity requirements (time range) hold
//! 6. Limit is within bounds
//!
//! The validator never builds SQL and never clamps values.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::catalog::{
    Catalog, EntityDescriptor, FieldDescriptor, FilterOperator, Requirement, ValueKind,
};

use super::ast::{Filter, QueryPlan, TimeRange};
use super::errors::{PlanError, PlanResult};
use super::typed::{
    parse_timestamp, AggregateFunction, AggregateTarget, BoundAggregation, BoundFilter,
    BoundOrder, BoundTimeRange, CompareOp, Direction, Operation, OrderTarget, Predicate, Scalar,
    ValidatedPlan,
};

/// Upper bound on `in` list length
pub const MAX_IN_VALUES: usize = 500;

/// Sentinel field name meaning "all rows" for `count`
pub const ALL_ROWS: &str = "*";

fn alias_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static pattern"))
}

/// Limit bounds applied in step 6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitPolicy {
    pub max_limit: u32,
    pub default_limit: u32,
}

impl Default for LimitPolicy {
    fn default() -> Self {
        Self {
            max_limit: 1000,
            default_limit: 100,
        }
    }
}

/// Ordering key after field resolution
enum OrderRef<'e> {
    Field(&'e FieldDescriptor),
    Aggregate(usize),
}

/// Step 3 output: every name resolved to a descriptor
struct Resolved<'e> {
    filters: Vec<&'e FieldDescriptor>,
    group_by: Vec<&'e FieldDescriptor>,
    aggregations: Vec<Option<&'e FieldDescriptor>>,
    order_by: Vec<OrderRef<'e>>,
}

/// Validates wire plans against a catalog.
pub struct PlanValidator<'a> {
    catalog: &'a Catalog,
    limits: LimitPolicy,
}

impl<'a> PlanValidator<'a> {
    pub fn new(catalog: &'a Catalog, limits: LimitPolicy) -> Self {
        Self { catalog, limits }
    }

    /// Validates a plan, returning the closed typed form or the first error.
    pub fn validate(&self, plan: &QueryPlan) -> PlanResult<ValidatedPlan> {
        // 1. Entity
        let entity = self
            .catalog
            .resolve_entity(&plan.entity)
            .map_err(|_| PlanError::unknown_entity(&plan.entity))?;

        // 2. Operation vocabulary and shape
        let operation = Operation::parse(&plan.operation).ok_or_else(|| {
            PlanError::unsupported_operation(format!(
                "Operation '{}' is not supported",
                plan.operation
            ))
        })?;
        let functions = check_operation_shape(operation, plan)?;

        // 3. Field resolution
        let resolved = self.resolve_fields(entity, operation, plan)?;

        // 4. Operators, values, directions, aliases
        let filters = plan
            .filters
            .iter()
            .zip(&resolved.filters)
            .map(|(filter, field)| bind_filter(field, filter))
            .collect::<PlanResult<Vec<_>>>()?;

        let group_by = check_group_by(&resolved.group_by)?;

        let aggregations = plan
            .aggregations
            .iter()
            .zip(functions)
            .zip(&resolved.aggregations)
            .map(|((agg, function), field)| BoundAggregation {
                function,
                target: field.map_or(AggregateTarget::AllRows, |f| AggregateTarget::Field(f.id)),
                alias: agg.alias.clone(),
            })
            .collect::<Vec<_>>();
        check_aggregations(&aggregations, &resolved, entity)?;

        let order_by = plan
            .order_by
            .iter()
            .zip(&resolved.order_by)
            .map(|(spec, target)| {
                let direction = Direction::parse(&spec.direction).ok_or_else(|| {
                    PlanError::invalid_filter(
                        &spec.field,
                        format!("ordering direction '{}' must be asc or desc", spec.direction),
                    )
                })?;
                let target = match target {
                    OrderRef::Field(field) => {
                        if operation == Operation::Aggregate && !group_by.contains(&field.id) {
                            return Err(PlanError::invalid_filter(
                                &field.name,
                                "aggregate plans can only order by group-by fields or aliases",
                            ));
                        }
                        OrderTarget::Field(field.id)
                    }
                    OrderRef::Aggregate(index) => OrderTarget::Aggregate(*index),
                };
                Ok(BoundOrder { target, direction })
            })
            .collect::<PlanResult<Vec<_>>>()?;

        // 5. Entity requirements
        let time_range = check_time_range(entity, plan.time_range.as_ref())?;

        // 6. Limit
        let limit = self.check_limit(plan.limit)?;

        Ok(ValidatedPlan {
            entity: entity.id,
            operation,
            filters,
            order_by,
            group_by,
            aggregations,
            time_range,
            limit,
            request_id: plan.request_id.clone(),
        })
    }

    fn resolve_fields<'e>(
        &self,
        entity: &'e EntityDescriptor,
        operation: Operation,
        plan: &QueryPlan,
    ) -> PlanResult<Resolved<'e>> {
        let resolve = |name: &str| -> PlanResult<&'e FieldDescriptor> {
            self.catalog
                .resolve_field(entity, name)
                .map_err(|_| PlanError::unknown_field(&entity.name, name))
        };

        let filters = plan
            .filters
            .iter()
            .map(|f| resolve(&f.field))
            .collect::<PlanResult<Vec<_>>>()?;

        let group_by = plan
            .group_by
            .iter()
            .map(|name| resolve(name))
            .collect::<PlanResult<Vec<_>>>()?;

        let aggregations = plan
            .aggregations
            .iter()
            .map(|agg| match agg.field.as_deref() {
                None | Some(ALL_ROWS) => Ok(None),
                Some(name) => resolve(name).map(Some),
            })
            .collect::<PlanResult<Vec<_>>>()?;

        let order_by = plan
            .order_by
            .iter()
            .map(|spec| {
                if operation == Operation::Aggregate {
                    if let Some(index) = plan.aggregations.iter().position(|a| a.alias == spec.field)
                    {
                        return Ok(OrderRef::Aggregate(index));
                    }
                }
                resolve(&spec.field).map(OrderRef::Field)
            })
            .collect::<PlanResult<Vec<_>>>()?;

        Ok(Resolved {
            filters,
            group_by,
            aggregations,
            order_by,
        })
    }

    fn check_limit(&self, limit: Option<i64>) -> PlanResult<u32> {
        let max = self.limits.max_limit;
        match limit {
            None => Ok(self.limits.default_limit),
            Some(n) if n >= 1 && n <= i64::from(max) => Ok(n as u32),
            Some(n) => Err(PlanError::limit_exceeded(n, max)),
        }
    }
}

/// Step 2: operation shape and aggregation function vocabulary.
fn check_operation_shape(
    operation: Operation,
    plan: &QueryPlan,
) -> PlanResult<Vec<AggregateFunction>> {
    match operation {
        Operation::List => {
            if !plan.aggregations.is_empty() {
                return Err(PlanError::unsupported_operation(
                    "list plans cannot carry aggregations",
                ));
            }
            if !plan.group_by.is_empty() {
                return Err(PlanError::unsupported_operation(
                    "list plans cannot carry groupBy",
                ));
            }
        }
        Operation::Aggregate => {
            if plan.aggregations.is_empty() {
                return Err(PlanError::unsupported_operation(
                    "aggregate plans need at least one aggregation",
                ));
            }
        }
    }

    plan.aggregations
        .iter()
        .map(|agg| {
            AggregateFunction::parse(&agg.function).ok_or_else(|| {
                PlanError::unsupported_operation(format!(
                    "Aggregation function '{}' is not supported",
                    agg.function
                ))
            })
        })
        .collect()
}

fn bind_filter(field: &FieldDescriptor, filter: &Filter) -> PlanResult<BoundFilter> {
    let op = FilterOperator::parse(&filter.operator).ok_or_else(|| {
        PlanError::invalid_filter(&field.name, format!("unknown operator '{}'", filter.operator))
    })?;
    if !field.allows(op) {
        return Err(PlanError::invalid_filter(
            &field.name,
            format!("operator '{}' is not allowed on this field", op),
        ));
    }

    let predicate = match op {
        FilterOperator::Eq => Predicate::Compare(CompareOp::Eq, scalar(field, &filter.value)?),
        FilterOperator::Neq => Predicate::Compare(CompareOp::Neq, scalar(field, &filter.value)?),
        FilterOperator::Gt => Predicate::Compare(CompareOp::Gt, scalar(field, &filter.value)?),
        FilterOperator::Gte => Predicate::Compare(CompareOp::Gte, scalar(field, &filter.value)?),
        FilterOperator::Lt => Predicate::Compare(CompareOp::Lt, scalar(field, &filter.value)?),
        FilterOperator::Lte => Predicate::Compare(CompareOp::Lte, scalar(field, &filter.value)?),
        FilterOperator::In => {
            let items = filter
                .value
                .as_array()
                .filter(|items| !items.is_empty())
                .ok_or_else(|| {
                    PlanError::invalid_filter(&field.name, "in requires a non-empty list")
                })?;
            if items.len() > MAX_IN_VALUES {
                return Err(PlanError::invalid_filter(
                    &field.name,
                    format!("in accepts at most {} values", MAX_IN_VALUES),
                ));
            }
            Predicate::In(
                items
                    .iter()
                    .map(|v| scalar(field, v))
                    .collect::<PlanResult<Vec<_>>>()?,
            )
        }
        FilterOperator::Like => {
            let text = filter.value.as_str().ok_or_else(|| {
                PlanError::invalid_filter(&field.name, "like requires a string value")
            })?;
            Predicate::Like(text.to_string())
        }
        FilterOperator::Between => {
            let bounds = match filter.value.as_array() {
                Some(bounds) if bounds.len() == 2 => bounds,
                _ => {
                    return Err(PlanError::invalid_filter(
                        &field.name,
                        "between requires exactly two bounds",
                    ))
                }
            };
            let low = scalar(field, &bounds[0])?;
            let high = scalar(field, &bounds[1])?;
            if low.compare(&high) == Some(Ordering::Greater) {
                return Err(PlanError::invalid_filter(
                    &field.name,
                    "between bounds must be ordered low to high",
                ));
            }
            Predicate::Between(low, high)
        }
    };

    Ok(BoundFilter {
        field: field.id,
        predicate,
    })
}

fn scalar(field: &FieldDescriptor, value: &Value) -> PlanResult<Scalar> {
    Scalar::from_json(field.kind, value).ok_or_else(|| {
        PlanError::invalid_filter(
            &field.name,
            format!("expected a {} value, got {}", field.kind, json_type_name(value)),
        )
    })
}

fn check_group_by(fields: &[&FieldDescriptor]) -> PlanResult<Vec<crate::catalog::FieldId>> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.id) {
            return Err(PlanError::invalid_filter(
                &field.name,
                "field appears twice in groupBy",
            ));
        }
    }
    Ok(fields.iter().map(|f| f.id).collect())
}

fn check_aggregations(
    aggregations: &[BoundAggregation],
    resolved: &Resolved<'_>,
    entity: &EntityDescriptor,
) -> PlanResult<()> {
    let group_names: HashSet<&str> = resolved.group_by.iter().map(|f| f.name.as_str()).collect();
    let mut aliases = HashSet::new();

    for (agg, field) in aggregations.iter().zip(&resolved.aggregations) {
        if !alias_pattern().is_match(&agg.alias) {
            return Err(PlanError::invalid_filter(
                &agg.alias,
                "alias must start with a letter or underscore and contain only letters, digits and underscores",
            ));
        }
        if !aliases.insert(agg.alias.as_str()) || group_names.contains(agg.alias.as_str()) {
            return Err(PlanError::invalid_filter(&agg.alias, "alias is not unique"));
        }

        match (agg.function, field) {
            (AggregateFunction::Count, _) => {}
            (function, None) => {
                return Err(PlanError::invalid_filter(
                    &agg.alias,
                    format!("{} requires a field of entity '{}'", function.as_sql(), entity.name),
                ));
            }
            (AggregateFunction::Sum | AggregateFunction::Avg, Some(f))
                if f.kind != ValueKind::Number =>
            {
                return Err(PlanError::invalid_filter(
                    &f.name,
                    format!("{} requires a number field", agg.function.as_sql()),
                ));
            }
            (AggregateFunction::Min | AggregateFunction::Max, Some(f))
                if f.kind == ValueKind::Boolean =>
            {
                return Err(PlanError::invalid_filter(
                    &f.name,
                    format!("{} cannot apply to a boolean field", agg.function.as_sql()),
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Step 5. Presence means both bounds are non-empty strings; nothing else
/// in the plan (such as a filter on the time field) counts as a time range.
fn check_time_range(
    entity: &EntityDescriptor,
    range: Option<&TimeRange>,
) -> PlanResult<Option<BoundTimeRange>> {
    let required = entity.requires(Requirement::RequiresTimeRange);
    let present = |bound: &Option<String>| bound.clone().filter(|s| !s.trim().is_empty());
    let (start, end) = match range {
        Some(r) => (present(&r.start), present(&r.end)),
        None => (None, None),
    };

    let (start, end) = match (start, end) {
        (None, None) if required => {
            return Err(PlanError::time_range_required(
                &entity.name,
                "timeRange.start and timeRange.end are missing",
            ))
        }
        (None, None) => return Ok(None),
        (Some(_), None) => {
            return Err(PlanError::time_range_required(&entity.name, "timeRange.end is missing"))
        }
        (None, Some(_)) => {
            return Err(PlanError::time_range_required(
                &entity.name,
                "timeRange.start is missing",
            ))
        }
        (Some(start), Some(end)) => (start, end),
    };

    if entity.time_field().is_none() {
        return Err(PlanError::invalid_filter(
            "timeRange",
            format!("entity '{}' has no time field", entity.name),
        ));
    }

    let parse = |label: &str, raw: &str| {
        parse_timestamp(raw).ok_or_else(|| {
            PlanError::invalid_filter(
                "timeRange",
                format!("{} '{}' is not a recognised timestamp", label, raw),
            )
        })
    };
    let start = parse("start", &start)?;
    let end = parse("end", &end)?;

    if start > end {
        return Err(PlanError::time_range_required(
            &entity.name,
            "timeRange.start is after timeRange.end",
        ));
    }

    Ok(Some(BoundTimeRange { start, end }))
}

/// Returns JSON type name for error messages
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
