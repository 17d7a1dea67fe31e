//! Plan to SQL compilation
//!
//! Pure: the same validated plan and catalog always produce byte-identical
//! SQL, parameters and fingerprint. User values only ever travel as
//! parameters; the text is built from catalog identifiers, fixed keywords
//! and validated aliases.

use crate::catalog::{Catalog, EntityDescriptor, ValueKind};
use crate::plan::{
    AggregateTarget, BoundAggregation, BoundFilter, Operation, OrderTarget, Predicate,
    Scalar, ValidatedPlan,
};

use super::compiled::{
    fingerprint, CompiledQuery, CursorMode, OrderKey, OutputColumn, StatementParts,
};
use super::params::{like_pattern, SqlParam, SqlQuery};

/// Compiles a plan validated against `catalog`.
pub fn compile(catalog: &Catalog, plan: &ValidatedPlan) -> CompiledQuery {
    let entity = catalog.entity(plan.entity);

    let (projection, columns) = match plan.operation {
        Operation::List => list_projection(entity),
        Operation::Aggregate => aggregate_projection(entity, plan),
    };
    let select = format!("SELECT {} FROM {}", projection.join(", "), entity.table);

    let mut conditions = Vec::with_capacity(plan.filters.len() + 2);
    let mut params = Vec::new();
    for filter in &plan.filters {
        conditions.push(render_filter(entity, filter, &mut params));
    }

    if let (Some(range), Some(time_field)) = (&plan.time_range, entity.time_field()) {
        conditions.push(format!("{} >= ?", time_field.column));
        params.push(SqlParam::from(&Scalar::Timestamp(range.start)));
        conditions.push(format!("{} <= ?", time_field.column));
        params.push(SqlParam::from(&Scalar::Timestamp(range.end)));
    }

    let group_by = plan
        .group_by
        .iter()
        .map(|id| entity.field(*id).column.clone())
        .collect();

    let order_by = order_keys(entity, plan, &columns);
    let cursor_mode = cursor_mode(entity, plan);

    let parts = StatementParts {
        select,
        conditions,
        group_by,
    };
    let base = SqlQuery {
        sql: CompiledQuery::assemble(&parts, &order_by),
        params,
    };

    CompiledQuery {
        entity: entity.name.clone(),
        operation: plan.operation,
        fingerprint: fingerprint(&base, &columns),
        base,
        columns,
        order_by,
        cursor_mode,
        generation: catalog.generation(),
        parts,
    }
}

fn list_projection(entity: &EntityDescriptor) -> (Vec<String>, Vec<OutputColumn>) {
    entity
        .fields()
        .iter()
        .map(|f| {
            (
                f.column.clone(),
                OutputColumn {
                    name: f.name.clone(),
                    kind: f.kind,
                },
            )
        })
        .unzip()
}

fn aggregate_projection(
    entity: &EntityDescriptor,
    plan: &ValidatedPlan,
) -> (Vec<String>, Vec<OutputColumn>) {
    let groups = plan.group_by.iter().map(|id| {
        let field = entity.field(*id);
        (
            field.column.clone(),
            OutputColumn {
                name: field.name.clone(),
                kind: field.kind,
            },
        )
    });

    let aggregates = plan.aggregations.iter().map(|agg| {
        let (argument, input_kind) = aggregate_argument(entity, agg);
        (
            format!("{}({}) AS \"{}\"", agg.function.as_sql(), argument, agg.alias),
            OutputColumn {
                name: agg.alias.clone(),
                kind: agg.function.output_kind(input_kind),
            },
        )
    });

    groups.chain(aggregates).unzip()
}

fn aggregate_argument(
    entity: &EntityDescriptor,
    agg: &BoundAggregation,
) -> (String, Option<ValueKind>) {
    match agg.target {
        AggregateTarget::AllRows => ("*".to_string(), None),
        AggregateTarget::Field(id) => {
            let field = entity.field(id);
            (field.column.clone(), Some(field.kind))
        }
    }
}

fn render_filter(
    entity: &EntityDescriptor,
    filter: &BoundFilter,
    params: &mut Vec<SqlParam>,
) -> String {
    let column = &entity.field(filter.field).column;
    match &filter.predicate {
        Predicate::Compare(op, value) => {
            params.push(SqlParam::from(value));
            format!("{} {} ?", column, op.as_sql())
        }
        Predicate::In(values) => {
            params.extend(values.iter().map(SqlParam::from));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{} IN ({})", column, placeholders)
        }
        Predicate::Like(text) => {
            params.push(SqlParam::Text(like_pattern(text)));
            format!("{} LIKE ? ESCAPE '\\'", column)
        }
        Predicate::Between(low, high) => {
            params.push(SqlParam::from(low));
            params.push(SqlParam::from(high));
            format!("{} BETWEEN ? AND ?", column)
        }
    }
}

fn order_keys(
    entity: &EntityDescriptor,
    plan: &ValidatedPlan,
    columns: &[OutputColumn],
) -> Vec<OrderKey> {
    plan.order_by
        .iter()
        .map(|order| {
            let (expr, name, nullable) = match order.target {
                OrderTarget::Field(id) => {
                    let field = entity.field(id);
                    (field.column.clone(), field.name.as_str(), field.nullable)
                }
                OrderTarget::Aggregate(index) => {
                    let alias = plan.aggregations[index].alias.as_str();
                    (format!("\"{}\"", alias), alias, true)
                }
            };
            // Validation guarantees every order key is projected
            let column = columns.iter().position(|c| c.name == name).unwrap_or(0);
            OrderKey {
                expr,
                column,
                direction: order.direction,
                nullable,
            }
        })
        .collect()
}

/// Keyset only when a list plan orders by a unique, non-null field. Nullable
/// keys ahead of it are handled by the NULL-aware keyset predicate.
fn cursor_mode(entity: &EntityDescriptor, plan: &ValidatedPlan) -> CursorMode {
    if plan.operation != Operation::List {
        return CursorMode::Offset;
    }
    let deterministic = plan.order_by.iter().any(|order| match order.target {
        OrderTarget::Field(id) => entity.field(id).identifies_rows(),
        OrderTarget::Aggregate(_) => false,
    });
    if deterministic {
        CursorMode::Keyset
    } else {
        CursorMode::Offset
    }
}
