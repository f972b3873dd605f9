//! Bounded TTL + LRU cache of parsed API payloads, keyed by fingerprint.
//!
//! All bookkeeping sits behind a single mutex so concurrent `get`/`put` calls
//! from coalesced requests cannot interleave an eviction. Expired entries are
//! purged lazily when looked up, or in bulk before an eviction. A zero TTL or
//! a zero capacity disables caching entirely.

use crate::fetch::Payload;
use crate::spoonacular::Fingerprint;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace};

struct CacheEntry {
    payload: Payload,
    stored_at: Instant,
    last_accessed: Instant,
    /// Monotonic access counter; orders accesses that share a clock reading.
    access_seq: u64,
}

impl CacheEntry {
    fn recency(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}

/// Counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub evictions: u64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<Fingerprint, CacheEntry>,
    next_seq: u64,
    stats: CacheStats,
}

impl CacheState {
    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }
}

/// Clone-cheap handle to a shared cache.
#[derive(Clone)]
pub struct BoundedCache {
    state: Arc<Mutex<CacheState>>,
    ttl: Duration,
    max_entries: usize,
}

impl BoundedCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState::default())),
            ttl,
            max_entries,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // Every mutation leaves the map consistent, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return a live entry and refresh its recency.
    pub fn get(&self, key: &Fingerprint) -> Option<Payload> {
        if !self.is_enabled() {
            return None;
        }

        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let seq = state.bump_seq();

        match state.entries.get_mut(key) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(entry) if now.duration_since(entry.stored_at) < self.ttl => {
                entry.last_accessed = now;
                entry.access_seq = seq;
                let payload = entry.payload.clone();
                state.stats.hits += 1;
                return Some(payload);
            }
            Some(_) => {}
        }

        state.entries.remove(key);
        state.stats.expirations += 1;
        state.stats.misses += 1;
        trace!(fingerprint = %key, "cache entry expired");
        None
    }

    /// Insert or overwrite, evicting the least recently accessed entry when full.
    pub fn put(&self, key: Fingerprint, payload: Payload) {
        if !self.is_enabled() {
            return;
        }

        let now = Instant::now();
        let mut guard = self.lock();
        let state = &mut *guard;
        let seq = state.bump_seq();

        if !state.entries.contains_key(&key) && state.entries.len() >= self.max_entries {
            let ttl = self.ttl;
            let before = state.entries.len();
            state
                .entries
                .retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
            let purged = (before - state.entries.len()) as u64;
            state.stats.expirations += purged;

            while state.entries.len() >= self.max_entries {
                let victim = state
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.recency())
                    .map(|(fingerprint, _)| fingerprint.clone());
                let Some(victim) = victim else { break };
                state.entries.remove(&victim);
                state.stats.evictions += 1;
                debug!(fingerprint = %victim, "evicted least recently used cache entry");
            }
        }

        state.entries.insert(
            key,
            CacheEntry {
                payload,
                stored_at: now,
                last_accessed: now,
                access_seq: seq,
            },
        );
    }

    /// Drop a single entry. Returns whether one was present.
    pub fn invalidate(&self, key: &Fingerprint) -> bool {
        self.lock().entries.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Number of stored entries, including ones that have expired but not yet been purged.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut state = self.lock();
        let before = state.entries.len();
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.stored_at) < ttl);
        let purged = before - state.entries.len();
        state.stats.expirations += purged as u64;
        purged
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats
    }
}
