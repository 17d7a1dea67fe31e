//! CLI module for querypilot
//!
//! Provides command-line interface for:
//! - serve: Open the engine and serve HTTP
//! - query: Run the first page of one plan and exit
//! - compile: Print the compiled statement for a plan without touching the database
//! - check-catalog: Load and verify a catalog file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_catalog, compile, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_plan, write_json};
