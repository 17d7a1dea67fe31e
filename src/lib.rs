//! querypilot - A catalog-bound query plan compiler and execution engine
//!
//! A structured `QueryPlan` is validated against a declared entity catalog,
//! compiled into parameterized SQL, executed against a pooled SQLite store,
//! and paginated with signed, single-use continuation tokens.
//!
//! # Pipeline
//!
//! ```text
//! QueryPlan -> PlanValidator -> ValidatedPlan -> compile -> CompiledQuery
//!           -> QueryEngine::execute -> QueryResult (+ queryToken)
//! ```

pub mod catalog;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod http_server;
pub mod observability;
pub mod pagination;
pub mod plan;
pub mod report;
