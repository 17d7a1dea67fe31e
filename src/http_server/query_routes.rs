//! Query HTTP Routes
//!
//! Plan submission and page fetches. The HTTP status is derived from the
//! result's error code; the body is always a `QueryResult`.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::engine::QueryEngine;
use crate::plan::QueryPlan;
use crate::report::{ErrorCode, QueryFailure, QueryResult};

/// Page fetch body: the token only, no plan re-submission
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub query_token: String,
}

/// Create query routes
pub fn query_routes(engine: Arc<QueryEngine>) -> Router {
    Router::new()
        .route("/query", post(run_plan_handler))
        .route("/query/page", post(fetch_page_handler))
        .with_state(engine)
}

fn respond(result: QueryResult) -> (StatusCode, Json<QueryResult>) {
    let status =
        StatusCode::from_u16(result.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result))
}

async fn run_plan_handler(
    State(engine): State<Arc<QueryEngine>>,
    body: Result<Json<QueryPlan>, JsonRejection>,
) -> (StatusCode, Json<QueryResult>) {
    let plan = match body {
        Ok(Json(plan)) => plan,
        Err(rejection) => {
            return respond(QueryResult::failed(
                QueryFailure::new(
                    ErrorCode::UnsupportedOperation,
                    format!("Request body is not a query plan: {}", rejection.body_text()),
                ),
                None,
            ))
        }
    };
    respond(engine.run_plan(&plan).await)
}

async fn fetch_page_handler(
    State(engine): State<Arc<QueryEngine>>,
    body: Result<Json<PageRequest>, JsonRejection>,
) -> (StatusCode, Json<QueryResult>) {
    match body {
        Ok(Json(request)) => respond(engine.fetch_page(&request.query_token).await),
        Err(_) => respond(QueryResult::failed(
            QueryFailure::new(ErrorCode::InvalidToken, "Request body must carry a queryToken"),
            None,
        )),
    }
}
