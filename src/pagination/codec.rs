//! Pagination codec
//!
//! Mints tokens for live queries and resolves tokens back to the query,
//! cursor and page they stand for.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::compiler::CompiledQuery;

use super::cursor::CursorState;
use super::errors::{PaginationError, PaginationResult};
use super::registry::QueryRegistry;
use super::token::{PageClaims, TokenConfig, TokenSigner};

/// A token resolved against the registry
#[derive(Debug, Clone)]
pub struct ResolvedPage {
    pub fingerprint: String,
    pub page_size: u32,
    pub cursor: CursorState,
    pub page: u32,
    pub query: Arc<CompiledQuery>,
    /// Token nonce, for `release`
    pub nonce: String,
}

/// Token signer plus the registry of live queries
pub struct PaginationCodec {
    signer: TokenSigner,
    registry: Mutex<QueryRegistry>,
}

impl PaginationCodec {
    pub fn new(config: TokenConfig, generation: u64) -> Self {
        let ttl_secs = config.ttl.num_seconds();
        Self {
            signer: TokenSigner::new(config),
            registry: Mutex::new(QueryRegistry::new(generation, ttl_secs)),
        }
    }

    fn registry(&self) -> MutexGuard<'_, QueryRegistry> {
        // A panic while holding the lock leaves the maps consistent
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Makes a compiled query resolvable by fingerprint.
    pub fn register(&self, query: CompiledQuery) -> Arc<CompiledQuery> {
        self.registry().register(query, Utc::now().timestamp())
    }

    /// Mints a token for the given page of a registered query.
    pub fn mint(
        &self,
        fingerprint: &str,
        page_size: u32,
        cursor: CursorState,
        page: u32,
    ) -> PaginationResult<String> {
        let generation = self.registry().generation();
        let claims = self
            .signer
            .claims(fingerprint, page_size, cursor, page, generation);
        self.signer.sign(&claims)
    }

    /// Resolves a token without consuming it.
    pub fn resolve(&self, token: &str) -> PaginationResult<ResolvedPage> {
        let claims = self.signer.verify(token)?;
        let mut registry = self.registry();
        Self::lookup(&mut registry, claims)
    }

    /// Resolves a token and consumes it; a second claim fails until the
    /// claim is released.
    pub fn claim(&self, token: &str) -> PaginationResult<ResolvedPage> {
        let claims = self.signer.verify(token)?;
        let mut registry = self.registry();
        let expires_at = claims.exp;
        let resolved = Self::lookup(&mut registry, claims)?;
        if !registry.consume(&resolved.nonce, expires_at, Utc::now().timestamp()) {
            return Err(PaginationError::InvalidToken);
        }
        Ok(resolved)
    }

    /// Returns a claimed token to service after its page could not be served.
    pub fn release(&self, nonce: &str) {
        self.registry().release(nonce);
    }

    fn lookup(registry: &mut QueryRegistry, claims: PageClaims) -> PaginationResult<ResolvedPage> {
        if claims.gen != registry.generation() {
            return Err(PaginationError::StaleQuery);
        }
        let query = registry
            .lookup(&claims.fp, Utc::now().timestamp())
            .ok_or(PaginationError::StaleQuery)?;
        if !query.accepts(&claims.cursor) {
            return Err(PaginationError::StaleQuery);
        }
        Ok(ResolvedPage {
            fingerprint: claims.fp,
            page_size: claims.ps,
            cursor: claims.cursor,
            page: claims.pg,
            query,
            nonce: claims.jti,
        })
    }

    /// Invalidates every live query; outstanding tokens become stale.
    pub fn invalidate(&self, generation: u64) {
        self.registry().reset(generation);
    }

    /// Number of live queries
    pub fn live_queries(&self) -> usize {
        self.registry().len()
    }
}
