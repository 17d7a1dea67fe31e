//! Query plan subsystem
//!
//! Turns the wire-level JSON plan into a `ValidatedPlan` bound to catalog
//! ids, or rejects it with a stable error code.
//!
//! # Design Principles
//!
//! - Validation is pure; no I/O and no clock
//! - Checks run in a fixed order, first failure wins
//! - No silent rewriting, clamping or defaulting beyond the documented limit default

mod ast;
mod errors;
mod typed;
mod validator;

pub use ast::{Aggregation, Filter, OrderSpec, QueryPlan, TimeRange};
pub use errors::{PlanError, PlanErrorCode, PlanResult};
pub use typed::{
    parse_timestamp, AggregateFunction, AggregateTarget, BoundAggregation, BoundFilter,
    BoundOrder, BoundTimeRange, CompareOp, Direction, Operation, OrderTarget, Predicate, Scalar,
    ValidatedPlan, TIMESTAMP_FORMAT,
};
pub use validator::{LimitPolicy, PlanValidator, ALL_ROWS, MAX_IN_VALUES};
