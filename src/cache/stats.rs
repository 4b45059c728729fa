//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses and removals.

use serde::Serialize;

use crate::cache::DisposeReason;

// == Cache Stats ==
/// Tracks cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads that returned a value (stale-once reads included)
    pub hits: u64,
    /// Reads that found nothing usable
    pub misses: u64,
    /// Entries dropped to respect the capacity bound
    pub evictions: u64,
    /// Entries removed for outliving their TTL
    pub expirations: u64,
    /// Entries that left the cache for any reason
    pub disposals: u64,
    /// Current number of entries in the cache
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
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    // == Record Removal ==
    /// Counts an entry leaving the cache.
    pub fn record_removal(&mut self, reason: DisposeReason) {
        self.disposals += 1;
        match reason {
            DisposeReason::Capacity => self.evictions += 1,
            DisposeReason::Ttl => self.expirations += 1,
            DisposeReason::Set | DisposeReason::Delete | DisposeReason::Clear => {}
        }
    }

    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
