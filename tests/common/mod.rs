//! Shared fixtures for integration tests
//!
//! A file-backed SQLite database seeded with 25 orders and a handful of
//! payments, plus the catalog that maps them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use querypilot::catalog::{
    Catalog, CatalogDef, CatalogLoader, EntityDef, FieldDef, FilterOperator, Requirement,
    ValueKind,
};
use querypilot::config::EngineConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tempfile::TempDir;

pub const ORDER_COUNT: i64 = 25;

pub fn catalog_def() -> CatalogDef {
    CatalogDef {
        entities: vec![
            EntityDef {
                name: "Order".into(),
                table: "orders".into(),
                time_field: Some("createdAt".into()),
                requires: vec![],
                fields: vec![
                    FieldDef::new("id", "id", ValueKind::Number).unique(),
                    FieldDef::new("status", "status", ValueKind::String).nullable(false),
                    FieldDef::new("totalAmount", "total_amount", ValueKind::Number)
                        .nullable(false),
                    FieldDef::new("customerName", "customer_name", ValueKind::String),
                    FieldDef::new("paid", "is_paid", ValueKind::Boolean).nullable(false),
                    FieldDef::new("createdAt", "created_at", ValueKind::Timestamp)
                        .nullable(false),
                ],
            },
            EntityDef {
                name: "Payment".into(),
                table: "payments".into(),
                time_field: Some("paidAt".into()),
                requires: vec![Requirement::RequiresTimeRange],
                fields: vec![
                    FieldDef::new("id", "payment_id", ValueKind::Number).unique(),
                    FieldDef::new("amount", "amount", ValueKind::Number),
                    FieldDef::new("method", "pay_method", ValueKind::String)
                        .with_operators([FilterOperator::Eq, FilterOperator::In]),
                    FieldDef::new("paidAt", "paid_at", ValueKind::Timestamp).nullable(false),
                ],
            },
            EntityDef {
                name: "Sequence".into(),
                table: "slow_sequence".into(),
                time_field: None,
                requires: vec![],
                fields: vec![FieldDef::new("n", "n", ValueKind::Number).unique()],
            },
        ],
    }
}

pub fn catalog() -> Catalog {
    Catalog::from_definition(&catalog_def(), 1).unwrap()
}

/// Temp directory holding `shop.db` and `catalog.json`
pub struct Fixture {
    pub dir: TempDir,
    pub db_path: PathBuf,
    pub catalog_path: PathBuf,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("shop.db");
        let catalog_path = dir.path().join("catalog.json");

        CatalogLoader::new(&catalog_path)
            .save_definition(&catalog_def())
            .unwrap();
        seed_database(&db_path).await;

        Self {
            dir,
            db_path,
            catalog_path,
        }
    }

    /// Runs writes against the database before an engine opens it.
    pub async fn apply(&self, statements: &[&str]) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(&self.db_path))
            .await
            .unwrap();
        for sql in statements {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool.close().await;
    }

    /// Order ids in the order SQLite itself returns them for `order_by`.
    pub async fn order_ids(&self, order_by: &str) -> Vec<i64> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(SqliteConnectOptions::new().filename(&self.db_path))
            .await
            .unwrap();
        let sql = format!("SELECT id FROM orders ORDER BY {}", order_by);
        let ids = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_all(&pool)
            .await
            .unwrap();
        pool.close().await;
        ids
    }

    pub fn config(&self) -> EngineConfig {
        EngineConfig::new(
            format!("sqlite://{}", self.db_path.display()),
            self.catalog_path.clone(),
            "integration_test_secret",
        )
    }
}

async fn seed_database(path: &Path) {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();

    for ddl in [
        "CREATE TABLE orders (id INTEGER PRIMARY KEY, status TEXT NOT NULL, \
         total_amount REAL NOT NULL, customer_name TEXT, is_paid INTEGER NOT NULL, \
         created_at TEXT NOT NULL)",
        "CREATE TABLE payments (payment_id INTEGER PRIMARY KEY, amount REAL NOT NULL, \
         pay_method TEXT NOT NULL, paid_at TEXT NOT NULL)",
        "CREATE VIEW slow_sequence AS WITH RECURSIVE c(n) AS \
         (SELECT 1 UNION ALL SELECT n + 1 FROM c WHERE n < 50000000) SELECT n FROM c",
    ] {
        sqlx::query(ddl).execute(&pool).await.unwrap();
    }

    for id in 1..=ORDER_COUNT {
        sqlx::query("INSERT INTO orders VALUES (?, ?, ?, ?, ?, ?)")
            .bind(id)
            .bind(if id % 2 == 0 { "PAID" } else { "PENDING" })
            .bind(id as f64 * 10.0)
            .bind(format!("customer_{:02}", id))
            .bind(id % 2 == 0)
            .bind(format!("2024-05-{:02} 10:00:00", id))
            .execute(&pool)
            .await
            .unwrap();
    }

    for (id, amount, method, paid_at) in [
        (1, 12.5, "card", "2024-05-01 09:00:00"),
        (2, 80.0, "cash", "2024-05-15 12:30:00"),
        (3, 45.0, "card", "2024-06-02 18:45:00"),
    ] {
        sqlx::query("INSERT INTO payments VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(amount)
            .bind(method)
            .bind(paid_at)
            .execute(&pool)
            .await
            .unwrap();
    }

    pool.close().await;
}
