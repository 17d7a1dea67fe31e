//! Query engine
//!
//! Orchestrates validate -> compile -> register -> execute for plan
//! submissions, and claim -> execute for page fetches. Every outcome,
//! including rejections, is returned as a `QueryResult`.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::{Map, Value};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::catalog::{Catalog, CatalogError, CatalogLoader, CatalogResult};
use crate::compiler::{compile, CompiledQuery, CursorMode};
use crate::config::EngineConfig;
use crate::observability::{Logger, MetricsSnapshot, QueryMetrics};
use crate::pagination::{CursorState, PaginationCodec};
use crate::plan::{LimitPolicy, Operation, PlanValidator, QueryPlan};
use crate::report::{PaginationInfo, QueryData, QueryFailure, QueryResult, ResultMetadata};

use super::errors::{PageError, StartupError};
use super::executor::{connect_pool, fetch_rows};
use super::lifecycle::{RequestScope, RequestState};

/// One executed page
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub records: Vec<Map<String, Value>>,
    pub has_more: bool,
    /// Present exactly when `has_more`
    pub next_cursor: Option<CursorState>,
    pub mode: CursorMode,
}

pub struct QueryEngine {
    catalog: RwLock<Arc<Catalog>>,
    loader: Option<CatalogLoader>,
    pool: SqlitePool,
    codec: PaginationCodec,
    metrics: QueryMetrics,
    limits: LimitPolicy,
    query_timeout: Duration,
}

impl QueryEngine {
    /// Builds an engine over an already loaded catalog and open pool.
    pub fn new(catalog: Catalog, pool: SqlitePool, config: &EngineConfig) -> Self {
        let codec = PaginationCodec::new(config.token_config(), catalog.generation());
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            loader: None,
            pool,
            codec,
            metrics: QueryMetrics::new(),
            limits: config.limits(),
            query_timeout: config.query_timeout(),
        }
    }

    /// Validates the configuration, loads the catalog file and opens the pool.
    ///
    /// Any failure is fatal; the engine must not serve without a catalog.
    pub async fn open(config: &EngineConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let loader = CatalogLoader::new(config.catalog_path.clone());
        let catalog = loader.load(1)?;
        let pool = connect_pool(config).await?;

        Logger::info(
            "ENGINE_STARTED",
            &[
                ("catalog", &loader.path().display().to_string()),
                ("entities", &catalog.entity_count().to_string()),
            ],
        );

        Ok(Self {
            loader: Some(loader),
            ..Self::new(catalog, pool, config)
        })
    }

    /// Current catalog snapshot
    pub fn catalog(&self) -> Arc<Catalog> {
        let guard = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn live_queries(&self) -> usize {
        self.codec.live_queries()
    }

    /// Runs the first page of a plan.
    pub async fn run_plan(&self, plan: &QueryPlan) -> QueryResult {
        self.metrics.record_plan();
        let request_id = plan
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut scope = RequestScope::new(request_id);
        let catalog = self.catalog();

        let validated = match PlanValidator::new(&catalog, self.limits).validate(plan) {
            Ok(validated) => validated,
            Err(err) => return self.reject(&mut scope, err.into(), None),
        };
        scope.advance(RequestState::Validated);

        let page_size = validated.limit;
        let query = self.codec.register(compile(&catalog, &validated));
        scope.advance(RequestState::Compiled);

        if query.operation == Operation::List && query.cursor_mode == CursorMode::Offset {
            Logger::warn(
                "PAGINATION_OFFSET",
                &[
                    ("entity", query.entity.as_str()),
                    ("request_id", scope.request_id()),
                ],
            );
        }

        self.respond(&mut scope, &query, page_size, CursorState::Start, 1)
            .await
    }

    /// Runs the page a continuation token stands for.
    ///
    /// The token is consumed on success. A backend failure releases it, so
    /// the caller can retry the same page.
    pub async fn fetch_page(&self, token: &str) -> QueryResult {
        self.metrics.record_page_request();
        let mut scope = RequestScope::new(Uuid::new_v4().to_string());

        let resolved = match self.codec.claim(token) {
            Ok(resolved) => resolved,
            Err(err) => return self.reject(&mut scope, err.into(), None),
        };

        let result = self
            .respond(
                &mut scope,
                &resolved.query,
                resolved.page_size,
                resolved.cursor,
                resolved.page,
            )
            .await;

        if result.error_code().is_some_and(|code| code.is_recoverable()) {
            self.codec.release(&resolved.nonce);
        }
        result
    }

    /// Fetches one page window of a compiled query.
    pub async fn execute(
        &self,
        query: &CompiledQuery,
        page_size: u32,
        cursor: CursorState,
        page: u32,
    ) -> Result<PageOutcome, PageError> {
        let mode = cursor.mode(query);
        let statement = query.page_statement(page_size, &cursor)?;
        let mut records =
            fetch_rows(&self.pool, &statement, &query.columns, self.query_timeout).await?;

        let window = page_size as usize;
        let has_more = records.len() > window;
        records.truncate(window);

        let next_cursor = if has_more {
            records
                .last()
                .map(|last| CursorState::after(query, last, page_size, page))
        } else {
            None
        };

        Ok(PageOutcome {
            records,
            has_more,
            next_cursor,
            mode,
        })
    }

    async fn respond(
        &self,
        scope: &mut RequestScope,
        query: &CompiledQuery,
        page_size: u32,
        cursor: CursorState,
        page: u32,
    ) -> QueryResult {
        scope.advance(RequestState::Executing);

        let outcome = match self.execute(query, page_size, cursor, page).await {
            Ok(outcome) => outcome,
            Err(err) => {
                let detail = err.detail().map(str::to_string);
                return self.reject(scope, err.into(), detail.as_deref());
            }
        };

        let query_token = match outcome.next_cursor {
            Some(next) => match self.codec.mint(&query.fingerprint, page_size, next, page + 1) {
                Ok(token) => Some(token),
                Err(err) => return self.reject(scope, err.into(), None),
            },
            None => None,
        };

        let rows_returned = outcome.records.len();
        self.metrics.record_success(rows_returned);
        scope.succeed(&query.entity, rows_returned, outcome.mode.as_str());

        let data = match query.operation {
            Operation::List => QueryData::Rows {
                rows: outcome.records,
            },
            Operation::Aggregate => QueryData::Aggregates {
                aggregates: outcome.records,
            },
        };

        QueryResult::Success {
            data,
            metadata: ResultMetadata {
                execution_time_ms: scope.elapsed_ms(),
                rows_returned,
                pagination_mode: outcome.mode,
                request_id: Some(scope.request_id().to_string()),
            },
            pagination: PaginationInfo {
                query_token,
                has_more: outcome.has_more,
                current_page: page,
            },
        }
    }

    fn reject(
        &self,
        scope: &mut RequestScope,
        failure: QueryFailure,
        detail: Option<&str>,
    ) -> QueryResult {
        self.metrics.record_failure(failure.code);
        scope.fail(&failure, detail);
        QueryResult::failed(failure, Some(scope.request_id().to_string()))
    }

    /// Swaps in a new catalog under the next generation and invalidates every
    /// live compiled query. Returns the new generation.
    pub fn reload_catalog(&self, catalog: Catalog) -> u64 {
        let mut guard = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        let generation = guard.generation() + 1;
        let catalog = catalog.with_generation(generation);
        let entities = catalog.entity_count();
        *guard = Arc::new(catalog);
        // Under the write lock so no request registers against the old generation afterwards
        self.codec.invalidate(generation);
        drop(guard);

        self.metrics.record_catalog_reload();
        Logger::info(
            "CATALOG_RELOADED",
            &[
                ("entities", &entities.to_string()),
                ("generation", &generation.to_string()),
            ],
        );
        generation
    }

    /// Re-reads the catalog file the engine was opened with.
    pub fn reload_from_disk(&self) -> CatalogResult<u64> {
        let loader = self.loader.as_ref().ok_or_else(|| {
            CatalogError::load_failed("<memory>", "engine was not opened from a catalog file")
        })?;
        let catalog = loader.load(0)?;
        Ok(self.reload_catalog(catalog))
    }
}
