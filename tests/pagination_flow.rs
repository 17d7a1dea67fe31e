//! Pagination Flow Tests
//!
//! End-to-end runs against a file-backed, read-only SQLite database:
//! - Pages partition the result set without gaps or repeats
//! - Tokens are single use and expire
//! - Catalog reloads make outstanding tokens stale
//! - Backend trouble surfaces as a classified, generic error

mod common;

use std::time::Duration;

use common::{Fixture, ORDER_COUNT};
use querypilot::compiler::CursorMode;
use querypilot::engine::{QueryEngine, StartupError};
use querypilot::plan::QueryPlan;
use querypilot::report::{ErrorCode, QueryResult};
use serde_json::json;

// =============================================================================
// Helper Functions
// =============================================================================

fn ids(result: &QueryResult) -> Vec<i64> {
    result
        .data()
        .expect("success result")
        .records()
        .iter()
        .map(|row| row["id"].as_i64().unwrap())
        .collect()
}

fn next_token(result: &QueryResult) -> String {
    result
        .pagination()
        .and_then(|p| p.query_token.clone())
        .expect("token for next page")
}

async fn open(fixture: &Fixture) -> QueryEngine {
    QueryEngine::open(&fixture.config()).await.unwrap()
}

/// Runs a plan and follows every token, returning the ids of all pages.
async fn page_to_end(engine: &QueryEngine, plan: &QueryPlan) -> Vec<i64> {
    let mut result = engine.run_plan(plan).await;
    let mut seen = ids(&result);
    let mut pages = 1;
    while result.pagination().unwrap().has_more {
        assert!(pages <= ORDER_COUNT, "pagination did not terminate");
        result = engine.fetch_page(&next_token(&result)).await;
        seen.extend(ids(&result));
        pages += 1;
    }
    seen
}

// =============================================================================
// Page Partitioning
// =============================================================================

/// 25 rows at page size 10: 10, 10, 5, with hasMore true, true, false.
#[tokio::test]
async fn test_pages_of_ten_over_twenty_five_rows() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::list("Order").order("id", "asc").limit(10);

    let page1 = engine.run_plan(&plan).await;
    assert_eq!(ids(&page1), (1..=10).collect::<Vec<_>>());
    assert!(page1.pagination().unwrap().has_more);
    assert_eq!(page1.pagination().unwrap().current_page, 1);

    let page2 = engine.fetch_page(&next_token(&page1)).await;
    assert_eq!(ids(&page2), (11..=20).collect::<Vec<_>>());
    assert!(page2.pagination().unwrap().has_more);
    assert_eq!(page2.pagination().unwrap().current_page, 2);

    let page3 = engine.fetch_page(&next_token(&page2)).await;
    assert_eq!(ids(&page3), (21..=25).collect::<Vec<_>>());
    assert!(!page3.pagination().unwrap().has_more);
    assert!(page3.pagination().unwrap().query_token.is_none());
    assert_eq!(page3.metadata().unwrap().rows_returned, 5);
}

/// Keyset pages over a descending, filtered ordering cover exactly the matches.
#[tokio::test]
async fn test_filtered_descending_pages_cover_matches() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::list("Order")
        .filter("status", "eq", json!("PAID"))
        .order("totalAmount", "desc")
        .order("id", "desc")
        .limit(5);

    let mut result = engine.run_plan(&plan).await;
    assert_eq!(result.metadata().unwrap().pagination_mode, CursorMode::Keyset);
    let mut seen = ids(&result);
    while result.pagination().unwrap().has_more {
        result = engine.fetch_page(&next_token(&result)).await;
        seen.extend(ids(&result));
    }

    let expected: Vec<i64> = (1..=ORDER_COUNT).rev().filter(|id| id % 2 == 0).collect();
    assert_eq!(seen, expected);
}

/// Without a unique ordering key the engine falls back to offsets.
#[tokio::test]
async fn test_offset_fallback_reports_mode() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::list("Order").order("customerName", "asc").limit(10);

    let page1 = engine.run_plan(&plan).await;
    assert_eq!(page1.metadata().unwrap().pagination_mode, CursorMode::Offset);

    let page2 = engine.fetch_page(&next_token(&page1)).await;
    assert_eq!(ids(&page2), (11..=20).collect::<Vec<_>>());
    assert_eq!(page2.metadata().unwrap().pagination_mode, CursorMode::Offset);
}

/// NULL values in a nullable ordering key neither end the walk nor repeat.
#[tokio::test]
async fn test_keyset_walk_over_null_keys() {
    let fixture = Fixture::new().await;
    fixture
        .apply(&["UPDATE orders SET customer_name = NULL WHERE id % 3 = 0"])
        .await;
    let engine = open(&fixture).await;

    for direction in ["desc", "asc"] {
        let plan = QueryPlan::list("Order")
            .order("customerName", direction)
            .order("id", "asc")
            .limit(4);
        let first = engine.run_plan(&plan).await;
        assert_eq!(first.metadata().unwrap().pagination_mode, CursorMode::Keyset);

        let expected = fixture
            .order_ids(&format!("customer_name {}, id ASC", direction))
            .await;
        assert_eq!(expected.len() as i64, ORDER_COUNT);
        assert_eq!(page_to_end(&engine, &plan).await, expected);
    }
}

/// Runs of equal leading keys that straddle page boundaries are walked in full.
#[tokio::test]
async fn test_keyset_walk_over_tied_leading_key() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::list("Order")
        .order("status", "asc")
        .order("id", "desc")
        .limit(5);

    let expected = fixture.order_ids("status ASC, id DESC").await;
    assert_eq!(page_to_end(&engine, &plan).await, expected);
}

/// Timestamps stored as `YYYY-MM-DDTHH:MM:SS` text still page to completion.
#[tokio::test]
async fn test_keyset_walk_over_iso_timestamps() {
    let fixture = Fixture::new().await;
    fixture
        .apply(&[
            "UPDATE orders SET created_at = replace(created_at, ' ', 'T') WHERE id % 2 = 1",
            "UPDATE orders SET created_at = '2024-05-10 10:00:00' WHERE id IN (11, 12)",
        ])
        .await;
    let engine = open(&fixture).await;

    for direction in ["asc", "desc"] {
        let plan = QueryPlan::list("Order")
            .order("createdAt", direction)
            .order("id", "asc")
            .limit(3);
        let expected = fixture
            .order_ids(&format!("created_at {}, id ASC", direction))
            .await;
        assert_eq!(page_to_end(&engine, &plan).await, expected);
    }
}

/// A time-bounded plan on an entity that requires one.
#[tokio::test]
async fn test_time_range_plan_executes() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::list("Payment")
        .between("2024-05-01", "2024-05-31 23:59:59")
        .order("id", "asc");

    let result = engine.run_plan(&plan).await;
    assert_eq!(ids(&result), vec![1, 2]);
}

/// Aggregates come back under `data.aggregates`.
#[tokio::test]
async fn test_aggregate_counts() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let plan = QueryPlan::aggregate("Order")
        .aggregation("count", None, "orders")
        .group("status")
        .order("orders", "desc");

    let result = engine.run_plan(&plan).await;
    let body = serde_json::to_value(&result).unwrap();
    assert_eq!(
        body["data"]["aggregates"],
        json!([
            {"status": "PENDING", "orders": 13},
            {"status": "PAID", "orders": 12}
        ])
    );
}

// =============================================================================
// Token Lifecycle
// =============================================================================

/// Claiming a token twice fails the second time.
#[tokio::test]
async fn test_token_is_single_use() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let page1 = engine
        .run_plan(&QueryPlan::list("Order").order("id", "asc").limit(10))
        .await;
    let token = next_token(&page1);

    assert!(engine.fetch_page(&token).await.is_success());
    let replay = engine.fetch_page(&token).await;
    assert_eq!(replay.error_code(), Some(ErrorCode::InvalidToken));
}

/// A token signed by another engine secret is rejected.
#[tokio::test]
async fn test_foreign_token_is_invalid() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;

    let mut other_config = fixture.config();
    other_config.token_secret = "some_other_secret".into();
    let other = QueryEngine::open(&other_config).await.unwrap();
    let foreign = other
        .run_plan(&QueryPlan::list("Order").order("id", "asc").limit(10))
        .await;

    let result = engine.fetch_page(&next_token(&foreign)).await;
    assert_eq!(result.error_code(), Some(ErrorCode::InvalidToken));
}

/// Tokens past their TTL are expired, not invalid.
#[tokio::test]
async fn test_token_expires() {
    let fixture = Fixture::new().await;
    let mut config = fixture.config();
    config.token_ttl_secs = 1;
    let engine = QueryEngine::open(&config).await.unwrap();

    let page1 = engine
        .run_plan(&QueryPlan::list("Order").order("id", "asc").limit(10))
        .await;
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let result = engine.fetch_page(&next_token(&page1)).await;
    assert_eq!(result.error_code(), Some(ErrorCode::ExpiredToken));
    assert_eq!(result.http_status(), 410);
}

/// Reloading the catalog from disk invalidates outstanding tokens.
#[tokio::test]
async fn test_reload_from_disk_makes_tokens_stale() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let page1 = engine
        .run_plan(&QueryPlan::list("Order").order("id", "asc").limit(10))
        .await;

    assert_eq!(engine.reload_from_disk().unwrap(), 2);

    let stale = engine.fetch_page(&next_token(&page1)).await;
    assert_eq!(stale.error_code(), Some(ErrorCode::StaleQuery));

    // Re-issuing the plan works against the new generation
    let fresh = engine
        .run_plan(&QueryPlan::list("Order").order("id", "asc").limit(10))
        .await;
    assert!(engine.fetch_page(&next_token(&fresh)).await.is_success());
    assert_eq!(engine.metrics().catalog_reloads, 1);
}

// =============================================================================
// Backend Failures
// =============================================================================

/// A statement running past the timeout reports EXECUTION_TIMEOUT and
/// hands its connection back idle.
#[tokio::test]
async fn test_statement_timeout() {
    let fixture = Fixture::new().await;
    let mut config = fixture.config();
    config.query_timeout_ms = 50;
    config.max_connections = 1;
    let engine = QueryEngine::open(&config).await.unwrap();

    let plan = QueryPlan::list("Sequence")
        .filter("n", "eq", json!(-1))
        .limit(10);
    let result = engine.run_plan(&plan).await;
    assert_eq!(result.error_code(), Some(ErrorCode::ExecutionTimeout));
    assert_eq!(result.http_status(), 504);

    let quick = engine
        .run_plan(&QueryPlan::list("Order").filter("id", "eq", json!(7)))
        .await;
    assert!(quick.is_success(), "{:?}", quick);
    assert_eq!(ids(&quick), vec![7]);
}

/// The production pool is read-only.
#[tokio::test]
async fn test_pool_is_read_only() {
    let fixture = Fixture::new().await;
    let engine = open(&fixture).await;
    let write = sqlx::query("DELETE FROM orders").execute(engine.pool()).await;
    assert!(write.is_err());
}

/// A missing database file stops startup.
#[tokio::test]
async fn test_missing_database_is_fatal() {
    let fixture = Fixture::new().await;
    let mut config = fixture.config();
    config.database_url = format!(
        "sqlite://{}",
        fixture.dir.path().join("absent.db").display()
    );

    match QueryEngine::open(&config).await {
        Err(err @ StartupError::Database(_)) => assert_eq!(err.code(), "DATABASE_UNAVAILABLE"),
        Err(other) => panic!("unexpected startup error: {}", other),
        Ok(_) => panic!("engine opened without a database"),
    }
}

/// A broken catalog file stops startup.
#[tokio::test]
async fn test_invalid_catalog_is_fatal() {
    let fixture = Fixture::new().await;
    std::fs::write(&fixture.catalog_path, r#"{"entities": []}"#).unwrap();

    let err = QueryEngine::open(&fixture.config()).await.err().unwrap();
    assert_eq!(err.code(), "CATALOG_LOAD_FAILED");
}
