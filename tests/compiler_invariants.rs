//! Compiler Invariant Tests
//!
//! Properties every compiled statement must hold:
//! - Placeholder count equals parameter count
//! - No caller value ever appears in SQL text
//! - Compilation is deterministic
//! - Rejected plans produce no SQL at all

mod common;

use querypilot::catalog::Catalog;
use querypilot::compiler::{compile, CompiledQuery, SqlParam};
use querypilot::pagination::CursorState;
use querypilot::plan::{LimitPolicy, PlanError, PlanErrorCode, PlanValidator, QueryPlan};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn try_compile(catalog: &Catalog, plan: &QueryPlan) -> Result<CompiledQuery, PlanError> {
    let validated = PlanValidator::new(catalog, LimitPolicy::default()).validate(plan)?;
    Ok(compile(catalog, &validated))
}

fn compiled(plan: &QueryPlan) -> CompiledQuery {
    try_compile(&common::catalog(), plan).unwrap()
}

fn rejection(plan: &QueryPlan) -> PlanErrorCode {
    try_compile(&common::catalog(), plan).unwrap_err().code()
}

fn sample_plans() -> Vec<QueryPlan> {
    vec![
        QueryPlan::list("Order"),
        QueryPlan::list("Order")
            .filter("status", "in", json!(["PAID", "PENDING", "REFUNDED"]))
            .filter("totalAmount", "between", json!([10, 500]))
            .order("createdAt", "desc")
            .order("id", "asc"),
        QueryPlan::list("Order")
            .filter("customerName", "like", json!("ann"))
            .filter("paid", "eq", json!(true))
            .between("2024-01-01", "2024-12-31"),
        QueryPlan::list("Payment")
            .filter("method", "in", json!(["card"]))
            .between("2024-05-01T00:00:00Z", "2024-05-31T23:59:59Z"),
        QueryPlan::aggregate("Order")
            .aggregation("sum", Some("totalAmount"), "total_revenue")
            .aggregation("count", None, "orders")
            .group("status")
            .filter("createdAt", "gte", json!("2024-05-01"))
            .order("total_revenue", "desc"),
    ]
}

// =============================================================================
// Parameterization
// =============================================================================

/// Every placeholder has exactly one parameter, for base and page statements.
#[test]
fn test_placeholders_match_params() {
    for plan in sample_plans() {
        let query = compiled(&plan);
        assert_eq!(
            query.base.placeholder_count(),
            query.base.params.len(),
            "{}",
            query.base.sql
        );

        for cursor in [CursorState::Start, CursorState::Offset { offset: 40 }] {
            let page = query.page_statement(20, &cursor).unwrap();
            assert_eq!(page.placeholder_count(), page.params.len(), "{}", page.sql);
        }
    }
}

/// Keyset page statements bind one value per key per expansion branch.
#[test]
fn test_keyset_page_statement_parameters() {
    let query = compiled(
        &QueryPlan::list("Order")
            .filter("status", "eq", json!("PAID"))
            .order("createdAt", "desc")
            .order("id", "asc"),
    );
    let cursor = CursorState::Keyset {
        values: vec![
            SqlParam::Text("2024-05-10 10:00:00".into()),
            SqlParam::Integer(10),
        ],
    };
    let page = query.page_statement(10, &cursor).unwrap();

    assert_eq!(page.placeholder_count(), page.params.len());
    assert!(page
        .sql
        .contains("((created_at < ?) OR (created_at = ? AND id > ?))"));
    assert_eq!(page.params[0], SqlParam::Text("PAID".into()));
    assert_eq!(page.params.last(), Some(&SqlParam::Integer(11)));
}

/// Hostile values travel as parameters, never as SQL text.
#[test]
fn test_hostile_values_stay_out_of_sql() {
    let hostile = "x'); DROP TABLE orders; --";
    let query = compiled(
        &QueryPlan::list("Order")
            .filter("status", "eq", json!(hostile))
            .filter("customerName", "like", json!(hostile))
            .filter("status", "in", json!([hostile, "PAID"])),
    );

    assert!(!query.base.sql.contains("DROP"));
    assert!(!query.base.sql.contains("x')"));
    assert_eq!(query.base.params[0], SqlParam::Text(hostile.into()));
    assert_eq!(query.base.params.len(), 4);
}

/// `like` values are wrapped and caller wildcards match literally.
#[test]
fn test_like_wrapping() {
    let query = compiled(&QueryPlan::list("Order").filter("customerName", "like", json!("50%_off")));
    assert_eq!(
        query.base.params,
        vec![SqlParam::Text("%50\\%\\_off%".into())]
    );
}

/// Compiling the same plan twice is byte-identical.
#[test]
fn test_compilation_is_deterministic() {
    for plan in sample_plans() {
        let a = compiled(&plan);
        let b = compiled(&plan);
        assert_eq!(a.base, b.base);
        assert_eq!(a.fingerprint, b.fingerprint);
    }
}

/// Different parameters give different fingerprints.
#[test]
fn test_fingerprint_covers_params() {
    let paid = compiled(&QueryPlan::list("Order").filter("status", "eq", json!("PAID")));
    let pending = compiled(&QueryPlan::list("Order").filter("status", "eq", json!("PENDING")));
    assert_eq!(paid.base.sql, pending.base.sql);
    assert_ne!(paid.fingerprint, pending.fingerprint);
}

// =============================================================================
// Rejections
// =============================================================================

/// Each taxonomy code is reachable from a plan.
#[test]
fn test_rejection_codes() {
    assert_eq!(rejection(&QueryPlan::list("Invoice")), PlanErrorCode::UnknownEntity);
    assert_eq!(
        rejection(&QueryPlan::list("Order").filter("colour", "eq", json!("red"))),
        PlanErrorCode::UnknownField
    );
    assert_eq!(
        rejection(&QueryPlan::aggregate("Order")),
        PlanErrorCode::UnsupportedOperation
    );
    assert_eq!(
        rejection(&QueryPlan::list("Order").order("id", "sideways")),
        PlanErrorCode::InvalidFilter
    );
    assert_eq!(
        rejection(&QueryPlan::list("Payment").filter("method", "like", json!("ca"))),
        PlanErrorCode::InvalidFilter
    );
    assert_eq!(
        rejection(&QueryPlan::list("Payment")),
        PlanErrorCode::TimeRangeRequired
    );
    assert_eq!(
        rejection(&QueryPlan::list("Order").limit(5000)),
        PlanErrorCode::LimitExceeded
    );
}

/// An alias that is not a plain identifier never reaches SQL.
#[test]
fn test_alias_injection_rejected() {
    let plan = QueryPlan::aggregate("Order").aggregation("count", None, "n\" FROM orders; --");
    assert_eq!(rejection(&plan), PlanErrorCode::InvalidFilter);
}

/// Filters on the time field do not satisfy a time-range requirement.
#[test]
fn test_time_field_filter_is_not_a_time_range() {
    let plan = QueryPlan::list("Payment").filter("paidAt", "gte", json!("2024-05-01"));
    assert_eq!(rejection(&plan), PlanErrorCode::TimeRangeRequired);
}
