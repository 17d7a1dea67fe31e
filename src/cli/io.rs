//! JSON I/O handling for CLI
//!
//! - Input: one plan as a JSON object, from a file or stdin
//! - Output: one JSON object on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use serde::Serialize;

use crate::plan::QueryPlan;

use super::errors::{CliError, CliResult};

/// Reads a plan from `path`, or from stdin when no path is given.
pub fn read_plan(path: Option<&Path>) -> CliResult<QueryPlan> {
    let content = match path {
        Some(path) => fs::read_to_string(path).map_err(|e| {
            CliError::io_error(format!("Failed to read plan {}: {}", path.display(), e))
        })?,
        None => {
            let mut buf = String::new();
            io::stdin().lock().read_to_string(&mut buf)?;
            buf
        }
    };

    if content.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let plan: QueryPlan = serde_json::from_str(&content)?;
    Ok(plan)
}

/// Write any serializable value to stdout as one JSON line
pub fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
