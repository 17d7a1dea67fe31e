//! Live compiled queries, keyed by fingerprint
//!
//! Entries expire after the token TTL since last use. Consumed nonces are
//! kept until the token that carried them would have expired. Timestamps are
//! Unix seconds supplied by the caller.

use std::collections::HashMap;
use std::sync::Arc;

use crate::compiler::CompiledQuery;

struct Entry {
    query: Arc<CompiledQuery>,
    last_used: i64,
}

/// Fingerprint to compiled query map plus the consumed-nonce set
pub struct QueryRegistry {
    entries: HashMap<String, Entry>,
    consumed: HashMap<String, i64>,
    generation: u64,
    ttl_secs: i64,
}

impl QueryRegistry {
    pub fn new(generation: u64, ttl_secs: i64) -> Self {
        Self {
            entries: HashMap::new(),
            consumed: HashMap::new(),
            generation,
            ttl_secs,
        }
    }

    /// Catalog generation live entries were compiled under
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Registers a query, returning the shared instance for its fingerprint.
    ///
    /// A query compiled under another catalog generation is not stored; its
    /// tokens will resolve as stale.
    pub fn register(&mut self, query: CompiledQuery, now: i64) -> Arc<CompiledQuery> {
        self.purge(now);
        if query.generation != self.generation {
            return Arc::new(query);
        }
        let entry = self
            .entries
            .entry(query.fingerprint.clone())
            .or_insert_with(|| Entry {
                query: Arc::new(query),
                last_used: now,
            });
        entry.last_used = now;
        Arc::clone(&entry.query)
    }

    /// Looks up a live query and refreshes its last-use time.
    pub fn lookup(&mut self, fingerprint: &str, now: i64) -> Option<Arc<CompiledQuery>> {
        let ttl = self.ttl_secs;
        let entry = self.entries.get_mut(fingerprint)?;
        if now - entry.last_used > ttl {
            self.entries.remove(fingerprint);
            return None;
        }
        entry.last_used = now;
        Some(Arc::clone(&entry.query))
    }

    /// Marks a nonce used, dropping nonces whose tokens have expired.
    /// Returns false if it was already consumed.
    pub fn consume(&mut self, nonce: &str, expires_at: i64, now: i64) -> bool {
        self.consumed.retain(|_, expires| *expires >= now);
        if self.consumed.contains_key(nonce) {
            return false;
        }
        self.consumed.insert(nonce.to_string(), expires_at);
        true
    }

    /// Makes a consumed nonce usable again.
    pub fn release(&mut self, nonce: &str) {
        self.consumed.remove(nonce);
    }

    /// Number of nonces currently held as consumed
    pub fn consumed_len(&self) -> usize {
        self.consumed.len()
    }

    /// Drops every entry and adopts a new generation.
    pub fn reset(&mut self, generation: u64) {
        self.entries.clear();
        self.generation = generation;
    }

    /// Removes idle entries and nonces whose tokens have expired.
    pub fn purge(&mut self, now: i64) {
        let ttl = self.ttl_secs;
        self.entries.retain(|_, e| now - e.last_used <= ttl);
        self.consumed.retain(|_, expires_at| *expires_at >= now);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
