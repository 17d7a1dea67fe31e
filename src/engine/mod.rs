//! Execution engine
//!
//! Runs compiled queries against a pooled SQLite store and turns every
//! outcome into a `QueryResult`.
//!
//! # Guarantees
//!
//! - Validation failures never acquire a connection
//! - Every statement runs under a bounded timeout
//! - Connections are released on every exit path
//! - Backend error text is logged, never returned

#[allow(clippy::module_inception)]
mod engine;
mod errors;
mod executor;
mod lifecycle;

pub use engine::{PageOutcome, QueryEngine};
pub use errors::{ExecutionError, ExecutionErrorCode, ExecutionResult, PageError, StartupError};
pub use executor::{connect_pool, fetch_rows};
pub use lifecycle::{RequestScope, RequestState};
