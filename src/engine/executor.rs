//! Statement execution against the pooled store
//!
//! One pooled connection per statement, released on every exit path when the
//! connection guard drops. The whole acquire-and-fetch runs under a single
//! timeout. A progress handler on the connection interrupts SQLite once the
//! deadline passes or the future is dropped, so an abandoned statement stops
//! stepping and its connection comes back to the pool.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteConnection, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, ValueRef};

use crate::catalog::ValueKind;
use crate::compiler::{OutputColumn, SqlParam, SqlQuery};
use crate::config::EngineConfig;

use super::errors::{ExecutionError, ExecutionResult};

/// Opens the connection pool described by the configuration.
pub async fn connect_pool(config: &EngineConfig) -> Result<SqlitePool, sqlx::Error> {
    let options =
        SqliteConnectOptions::from_str(&config.database_url)?.read_only(config.read_only);

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .after_release(|conn, _meta| {
            Box::pin(async move {
                disarm(conn).await?;
                Ok(true)
            })
        })
        .connect_with(options)
        .await
}

/// VM instructions between progress checks
const PROGRESS_OPS: i32 = 1_000;

/// Flags the running statement for interruption when dropped.
struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Drop for Interrupt {
    fn drop(&mut self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Installs a progress handler that stops the statement at `deadline` or
/// once `interrupt` is dropped.
async fn arm(
    conn: &mut SqliteConnection,
    deadline: Instant,
    interrupt: &Interrupt,
) -> Result<(), sqlx::Error> {
    let cancelled = Arc::clone(&interrupt.flag);
    conn.lock_handle().await?.set_progress_handler(PROGRESS_OPS, move || {
        !cancelled.load(Ordering::Relaxed) && Instant::now() < deadline
    });
    Ok(())
}

async fn disarm(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    conn.lock_handle().await?.remove_progress_handler();
    Ok(())
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q SqlParam,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        SqlParam::Text(s) => query.bind(s.as_str()),
        SqlParam::Integer(i) => query.bind(*i),
        SqlParam::Real(f) => query.bind(*f),
        SqlParam::Bool(b) => query.bind(*b),
        SqlParam::Null => query.bind(None::<String>),
    }
}

/// Runs a statement and decodes every row against `columns`.
pub async fn fetch_rows(
    pool: &SqlitePool,
    statement: &SqlQuery,
    columns: &[OutputColumn],
    timeout: Duration,
) -> ExecutionResult<Vec<Map<String, Value>>> {
    let deadline = Instant::now() + timeout;
    let work = async {
        let mut conn = pool.acquire().await?;
        let interrupt = Interrupt::new();
        arm(&mut conn, deadline, &interrupt).await?;

        let query = statement
            .params
            .iter()
            .fold(sqlx::query(&statement.sql), bind);
        let rows = query.fetch_all(&mut *conn).await;
        disarm(&mut conn).await?;
        rows
    };

    let timed_out = || {
        ExecutionError::timeout(format!("statement exceeded {} ms", timeout.as_millis()))
    };
    let rows = match tokio::time::timeout(timeout, work).await {
        Ok(Ok(rows)) => rows,
        // Interrupted by the progress handler at the deadline
        Ok(Err(_)) if Instant::now() >= deadline => return Err(timed_out()),
        Ok(Err(err)) => return Err(ExecutionError::from_sqlx(err)),
        Err(_) => return Err(timed_out()),
    };

    rows.iter().map(|row| decode_row(row, columns)).collect()
}

fn decode_row(row: &SqliteRow, columns: &[OutputColumn]) -> ExecutionResult<Map<String, Value>> {
    let mut record = Map::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let value = decode_value(row, index, column.kind).map_err(|e| {
            ExecutionError::failure(format!("decoding column '{}': {}", column.name, e))
        })?;
        record.insert(column.name.clone(), value);
    }
    Ok(record)
}

fn decode_value(row: &SqliteRow, index: usize, kind: ValueKind) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    match kind {
        ValueKind::String | ValueKind::Timestamp => {
            row.try_get_unchecked::<String, _>(index).map(Value::from)
        }
        ValueKind::Number => match row.try_get::<i64, _>(index) {
            Ok(n) => Ok(Value::from(n)),
            Err(_) => row.try_get_unchecked::<f64, _>(index).map(Value::from),
        },
        ValueKind::Boolean => row
            .try_get_unchecked::<i64, _>(index)
            .map(|n| Value::Bool(n != 0)),
    }
}
