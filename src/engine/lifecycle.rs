//! Request lifecycle
//!
//! ```text
//! Received -> Validated -> Compiled -> Executing -> Succeeded
//!    |            |                        |
//!    +------------+------------------------+-------> Failed
//! ```
//!
//! A page fetch resumes a compiled query and goes straight from
//! `Received` to `Executing`.

use std::fmt;

use crate::observability::{Logger, Severity, Timer};
use crate::report::{ErrorCategory, QueryFailure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Compiled,
    Executing,
    Succeeded,
    Failed,
}

impl RequestState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Received => "RECEIVED",
            RequestState::Validated => "VALIDATED",
            RequestState::Compiled => "COMPILED",
            RequestState::Executing => "EXECUTING",
            RequestState::Succeeded => "SUCCEEDED",
            RequestState::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Succeeded | RequestState::Failed)
    }

    /// Whether `next` may follow this state
    pub fn can_advance(&self, next: RequestState) -> bool {
        use RequestState::*;
        matches!(
            (self, next),
            (Received, Validated)
                | (Received, Executing)
                | (Validated, Compiled)
                | (Compiled, Executing)
                | (Executing, Succeeded)
                | (Received | Validated | Compiled | Executing, Failed)
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tracks one request through its states and logs the outcome.
///
/// Dropping a scope before a terminal state (the caller went away) logs
/// `REQUEST_ABANDONED`.
pub struct RequestScope {
    request_id: String,
    state: RequestState,
    timer: Timer,
}

impl RequestScope {
    pub fn new(request_id: impl Into<String>) -> Self {
        let scope = Self {
            request_id: request_id.into(),
            state: RequestState::Received,
            timer: Timer::new(),
        };
        Logger::trace(
            "REQUEST_RECEIVED",
            &[("request_id", scope.request_id.as_str())],
        );
        scope
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.timer.elapsed_ms()
    }

    /// Moves to `next`; illegal transitions are ignored and logged.
    pub fn advance(&mut self, next: RequestState) -> bool {
        if !self.state.can_advance(next) {
            Logger::warn(
                "REQUEST_STATE_REJECTED",
                &[
                    ("from", self.state.as_str()),
                    ("request_id", self.request_id.as_str()),
                    ("to", next.as_str()),
                ],
            );
            return false;
        }
        Logger::trace(
            "REQUEST_STATE",
            &[
                ("from", self.state.as_str()),
                ("request_id", self.request_id.as_str()),
                ("to", next.as_str()),
            ],
        );
        self.state = next;
        true
    }

    /// Marks success and logs `QUERY_EXECUTED`.
    pub fn succeed(&mut self, entity: &str, rows: usize, mode: &str) {
        if self.advance(RequestState::Succeeded) {
            Logger::info(
                "QUERY_EXECUTED",
                &[
                    ("elapsed_ms", &self.elapsed_ms().to_string()),
                    ("entity", entity),
                    ("pagination_mode", mode),
                    ("request_id", self.request_id.as_str()),
                    ("rows", &rows.to_string()),
                ],
            );
        }
    }

    /// Marks failure. Backend failures log the detail at ERROR; rejections
    /// log at INFO.
    pub fn fail(&mut self, failure: &QueryFailure, detail: Option<&str>) {
        if !self.advance(RequestState::Failed) {
            return;
        }
        let (severity, event) = match failure.code.category() {
            ErrorCategory::Backend => (Severity::Error, "EXECUTION_FAILED"),
            ErrorCategory::Validation => (Severity::Info, "PLAN_REJECTED"),
            ErrorCategory::Pagination => (Severity::Info, "TOKEN_REJECTED"),
        };
        let elapsed = self.elapsed_ms().to_string();
        let mut fields = vec![
            ("code", failure.code.as_str()),
            ("elapsed_ms", elapsed.as_str()),
            ("message", failure.message.as_str()),
            ("request_id", self.request_id.as_str()),
        ];
        if let Some(detail) = detail {
            fields.push(("detail", detail));
        }
        Logger::log(severity, event, &fields);
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            Logger::warn(
                "REQUEST_ABANDONED",
                &[
                    ("request_id", self.request_id.as_str()),
                    ("state", self.state.as_str()),
                ],
            );
        }
    }
}
