//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Monotonic counters
//! - Request timers
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Backend error detail goes to the log, never to callers
//!
//! # Usage
//!
//! ```ignore
//! use querypilot::observability::{Logger, Timer};
//!
//! let timer = Timer::new();
//! // ... execute ...
//! Logger::info("QUERY_EXECUTED", &[("elapsed_ms", &timer.elapsed_ms().to_string())]);
//! ```

mod logger;
mod metrics;
mod timer;

pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, QueryMetrics};
pub use timer::Timer;
