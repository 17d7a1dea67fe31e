//! CLI command implementations
//!
//! `serve` and `query` open the engine, which fails fast on a bad
//! configuration, catalog or database. `compile` and `check-catalog` never
//! touch the database.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::catalog::{Catalog, CatalogLoader};
use crate::compiler::compile as compile_query;
use crate::config::EngineConfig;
use crate::engine::QueryEngine;
use crate::http_server::HttpServer;
use crate::observability::{Logger, Severity};
use crate::plan::{LimitPolicy, PlanValidator, QueryPlan};
use crate::report::{QueryFailure, QueryResult};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_plan, write_json};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config } => serve(&config),
        Command::Query { config, plan } => query(&config, plan.as_deref()),
        Command::Compile { config, plan } => compile(&config, plan.as_deref()),
        Command::CheckCatalog { catalog } => check_catalog(&catalog),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

/// One-shot commands keep stdout for their result
fn quiet_logging(config: &EngineConfig) {
    Logger::set_min_severity(config.log_severity().max(Severity::Error));
}

/// Open the engine and serve HTTP until the process stops
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = EngineConfig::load(config_path)?;
    Logger::set_min_severity(config.log_severity());

    let rt = runtime()?;
    rt.block_on(async {
        let engine = QueryEngine::open(&config).await.map_err(|e| {
            Logger::fatal("ENGINE_START_FAILED", &[("code", e.code())]);
            CliError::from(e)
        })?;

        HttpServer::new(Arc::new(engine), config.http.clone())
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Run the first page of one plan and print the result
pub fn query(config_path: &Path, plan_path: Option<&Path>) -> CliResult<()> {
    let config = EngineConfig::load(config_path)?;
    quiet_logging(&config);
    let plan = read_plan(plan_path)?;

    let rt = runtime()?;
    let result = rt.block_on(async {
        let engine = QueryEngine::open(&config).await?;
        Ok::<_, CliError>(engine.run_plan(&plan).await)
    })?;

    write_json(&result)?;
    match result.error_code() {
        Some(code) => Err(CliError::query_failed(code.as_str())),
        None => Ok(()),
    }
}

/// Validate and compile a plan and print the statement
pub fn compile(config_path: &Path, plan_path: Option<&Path>) -> CliResult<()> {
    let config = EngineConfig::load(config_path)?;
    quiet_logging(&config);
    let catalog = CatalogLoader::new(config.catalog_path.clone()).load(1)?;
    let plan = read_plan(plan_path)?;

    match compile_report(&catalog, config.limits(), &plan) {
        Ok(report) => write_json(&report),
        Err(failure) => {
            write_json(&QueryResult::failed(
                failure.clone(),
                plan.request_id.clone(),
            ))?;
            Err(CliError::query_failed(failure.to_string()))
        }
    }
}

fn compile_report(
    catalog: &Catalog,
    limits: LimitPolicy,
    plan: &QueryPlan,
) -> Result<Value, QueryFailure> {
    let validated = PlanValidator::new(catalog, limits).validate(plan)?;
    let compiled = compile_query(catalog, &validated);
    let params: Vec<Value> = compiled.base.params.iter().map(|p| p.to_json()).collect();

    Ok(json!({
        "entity": compiled.entity,
        "operation": compiled.operation.as_str(),
        "sql": compiled.base.sql,
        "params": params,
        "pageSize": validated.limit,
        "cursorMode": compiled.cursor_mode.as_str(),
        "fingerprint": compiled.fingerprint,
    }))
}

/// Load a catalog file and print a summary of its entities
pub fn check_catalog(catalog_path: &Path) -> CliResult<()> {
    let catalog = CatalogLoader::new(catalog_path).load(1)?;
    write_json(&catalog_summary(&catalog))
}

fn catalog_summary(catalog: &Catalog) -> Value {
    let entities: Vec<Value> = catalog
        .entities()
        .map(|entity| {
            json!({
                "name": entity.name,
                "table": entity.table,
                "fields": entity.fields().len(),
                "timeField": entity.time_field().map(|f| f.name.clone()),
            })
        })
        .collect();
    json!({ "status": "ok", "entities": entities })
}
