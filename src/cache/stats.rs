//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::Serialize;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Number of fetches served from an already-settled entry
    pub hits: u64,
    /// Number of fetches that created a new entry and computation
    pub misses: u64,
    /// Number of fetches that joined an in-flight computation
    pub coalesced: u64,
    /// Number of entries removed by TTL expiry
    pub evictions: u64,
    /// Number of computations run without inserting (caching disabled
    /// or table at capacity)
    pub uncached: u64,
    /// Current number of entries in the table
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Fetches that joined an in-flight computation count as hits since
    /// they avoided a recomputation. Returns 0.0 if no fetches have been
    /// recorded.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.coalesced + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits + self.coalesced) as f64 / total as f64
        }
    }

    // == Record Hit ==
    /// Increments the hit counter.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    // == Record Miss ==
    /// Increments the miss counter.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Coalesced ==
    /// Increments the coalesced-fetch counter.
    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    // == Record Eviction ==
    /// Increments the eviction counter.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    // == Record Uncached ==
    /// Increments the uncached-computation counter.
    pub fn record_uncached(&mut self) {
        self.uncached += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
