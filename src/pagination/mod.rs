//! Pagination subsystem
//!
//! Signed, expiring, single-use continuation tokens and the registry of
//! compiled queries they refer to.
//!
//! # Token lifecycle
//!
//! 1. Minted when a page has more rows after it
//! 2. Resolved by signature, expiry, generation and fingerprint
//! 3. Claimed exactly once
//! 4. Stale once its query leaves the registry or the catalog reloads

mod codec;
mod cursor;
mod errors;
mod registry;
mod token;

pub use codec::{PaginationCodec, ResolvedPage};
pub use cursor::CursorState;
pub use errors::{PaginationError, PaginationResult};
pub use registry::QueryRegistry;
pub use token::{PageClaims, TokenConfig, TokenSigner};
