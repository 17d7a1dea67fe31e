//! CLI argument definitions using clap
//!
//! Commands:
//! - querypilot serve --config <path>
//! - querypilot query --config <path> [--plan <path>]
//! - querypilot compile --config <path> [--plan <path>]
//! - querypilot check-catalog --catalog <path>
//!
//! Without `--plan` the plan is read from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// querypilot - A catalog-bound query plan compiler and execution engine
#[derive(Parser, Debug)]
#[command(name = "querypilot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Open the engine and serve the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./querypilot.json")]
        config: PathBuf,
    },

    /// Run the first page of a single plan and exit
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./querypilot.json")]
        config: PathBuf,

        /// Plan JSON file (stdin when absent)
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Validate and compile a plan, printing the statement
    Compile {
        /// Path to configuration file
        #[arg(long, default_value = "./querypilot.json")]
        config: PathBuf,

        /// Plan JSON file (stdin when absent)
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Load and verify a catalog file
    CheckCatalog {
        /// Catalog JSON file
        #[arg(long)]
        catalog: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
