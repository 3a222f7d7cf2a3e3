//! Core type definitions for the cache layer

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache key type - an opaque string derived by [`crate::cache::keys`]
pub type CacheKey = String;

/// Cache value type - a JSON document as stored in the key-value service
pub type CacheValue = String;

/// Snapshot of cache activity since the coordinator was created
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: u64,

    /// Lookups that fell through to the origin
    pub misses: u64,

    /// Origin fetches actually executed
    pub fetches: u64,

    /// Fetches that found nothing (never cached)
    pub empty_fetches: u64,

    /// Misses answered by another caller's in-flight fetch
    pub coalesced: u64,

    /// Values written to the store (populate and write-through)
    pub writes: u64,

    /// Version counter bumps
    pub invalidations: u64,

    /// Store errors absorbed or propagated
    pub store_errors: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, fetches: {}, empty_fetches: {}, coalesced: {}, writes: {}, invalidations: {}, store_errors: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.fetches,
            self.empty_fetches,
            self.coalesced,
            self.writes,
            self.invalidations,
            self.store_errors
        )
    }
}

/// Lock-free counters behind [`CacheStats`]
#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    empty_fetches: AtomicU64,
    coalesced: AtomicU64,
    writes: AtomicU64,
    invalidations: AtomicU64,
    store_errors: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Counter {
    Hit,
    Miss,
    Fetch,
    EmptyFetch,
    Coalesced,
    Write,
    Invalidation,
    StoreError,
}

impl StatsRecorder {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Default::default()
        }
    }

    pub(crate) fn record(&self, counter: Counter) {
        if !self.enabled {
            return;
        }

        let cell = match counter {
            Counter::Hit => &self.hits,
            Counter::Miss => &self.misses,
            Counter::Fetch => &self.fetches,
            Counter::EmptyFetch => &self.empty_fetches,
            Counter::Coalesced => &self.coalesced,
            Counter::Write => &self.writes,
            Counter::Invalidation => &self.invalidations,
            Counter::StoreError => &self.store_errors,
        };
        cell.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            empty_fetches: self.empty_fetches.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}
