//! HTTP surface
//!
//! Wraps a shared `QueryEngine` in an axum router.
//!
//! # Endpoints
//!
//! - `POST /v1/query` - Run the first page of a query plan
//! - `POST /v1/query/page` - Fetch the page a continuation token stands for
//! - `GET /health` - Liveness and catalog generation
//! - `GET /metrics` - Engine counters

pub mod observability_routes;
pub mod query_routes;
pub mod server;

pub use server::HttpServer;
