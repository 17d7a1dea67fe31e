//! SQL compiler subsystem
//!
//! Turns a `ValidatedPlan` into parameterized SQL for the relational store,
//! and renders the page window (keyset predicate, `LIMIT`, `OFFSET`) for a
//! given cursor.

mod compiled;
#[allow(clippy::module_inception)]
mod compiler;
mod params;

pub use compiled::{fingerprint, CompiledQuery, CursorMode, OrderKey, OutputColumn};
pub use compiler::compile;
pub use params::{like_pattern, SqlParam, SqlQuery};
