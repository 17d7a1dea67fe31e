//! Error reporter and result shapes
//!
//! Every failure, whatever subsystem raised it, leaves the engine as one of
//! the codes in `ErrorCode` with a caller-safe message.

mod codes;
mod result;

pub use codes::{ErrorCategory, ErrorCode, QueryFailure};
pub use result::{PaginationInfo, QueryData, QueryResult, ResultMetadata};
