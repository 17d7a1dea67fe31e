//! Observability HTTP Routes
//!
//! Health check and engine counters.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::engine::QueryEngine;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub catalog_generation: u64,
    pub live_queries: usize,
}

/// Create observability routes
pub fn observability_routes(engine: Arc<QueryEngine>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(engine)
}

async fn health_handler(State(engine): State<Arc<QueryEngine>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        catalog_generation: engine.catalog().generation(),
        live_queries: engine.live_queries(),
    };

    (StatusCode::OK, Json(response))
}

async fn metrics_handler(State(engine): State<Arc<QueryEngine>>) -> impl IntoResponse {
    (StatusCode::OK, Json(engine.metrics()))
}
