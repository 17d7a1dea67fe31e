//! Structured JSON logger
//!
//! - One line per event, written synchronously
//! - `event` first, then `severity`, then fields sorted by key
//! - Events below the process-wide minimum severity are dropped

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde_json::Value;

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Info as u8);

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Lifecycle detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Degraded but served (e.g. offset pagination)
    Warn = 2,
    /// Request failures
    Error = 3,
    /// Startup failures, process exits
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a level name, case-insensitively
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "TRACE" => Some(Severity::Trace),
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            "FATAL" => Some(Severity::Fatal),
            _ => None,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    /// Sets the minimum severity written from now on.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Logs an event. ERROR and FATAL go to stderr, the rest to stdout.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if severity < Self::min_severity() {
            return;
        }
        if severity >= Severity::Error {
            Self::write_line(&mut io::stderr(), severity, event, fields);
        } else {
            Self::write_line(&mut io::stdout(), severity, event, fields);
        }
    }

    fn write_line<W: Write>(writer: &mut W, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        let line = Self::format_line(severity, event, fields);
        // Logging never fails a request
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Renders one log line, newline included
    pub(crate) fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut line = String::with_capacity(128);
        line.push('{');
        push_pair(&mut line, "event", event);
        line.push(',');
        push_pair(&mut line, "severity", severity.as_str());
        for (key, value) in sorted {
            line.push(',');
            push_pair(&mut line, key, value);
        }
        line.push_str("}\n");
        line
    }

    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }

    pub fn fatal(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Fatal, event, fields);
    }
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    line.push_str(&Value::from(key).to_string());
    line.push(':');
    line.push_str(&Value::from(value).to_string());
}
