//! Eviction Policy Module
//!
//! Capacity trimming on insert and lazy TTL checks on read.

use std::hash::Hash;

use crate::cache::{CacheEntry, EntryStore, TimestampTracker};

// == Read Verdict ==
/// What a read should do with the entry it found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadVerdict {
    /// The value may be handed to the caller
    pub valid: bool,
    /// The entry must be removed with reason `Ttl` once the read is done
    pub evict: bool,
}

impl ReadVerdict {
    pub const FRESH: ReadVerdict = ReadVerdict {
        valid: true,
        evict: false,
    };
    pub const STALE_SERVED: ReadVerdict = ReadVerdict {
        valid: true,
        evict: true,
    };
    pub const STALE_MISS: ReadVerdict = ReadVerdict {
        valid: false,
        evict: true,
    };
}

// == Eviction Policy ==
/// Enforces the capacity bound and the staleness rule.
///
/// Capacity is only checked on insert, since reads never grow the store.
/// TTL is only checked when a specific key is read; nothing sweeps in the
/// background.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvictionPolicy {
    /// Maximum resident entries, 0 = unbounded
    max: usize,
    /// Serve a stale entry once before evicting it
    allow_stale: bool,
}

impl EvictionPolicy {
    pub fn new(max: usize, allow_stale: bool) -> Self {
        Self { max, allow_stale }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn set_max(&mut self, max: usize) {
        self.max = max;
    }

    pub fn allow_stale(&self) -> bool {
        self.allow_stale
    }

    pub fn is_bounded(&self) -> bool {
        self.max > 0
    }

    /// True if a store of `len` entries breaks the bound.
    pub fn over_capacity(&self, len: usize) -> bool {
        self.is_bounded() && len > self.max
    }

    // == Enforce Capacity ==
    /// Pops least-recently-used entries until the store fits.
    ///
    /// Entries come out oldest first and are already gone from the store when
    /// yielded; the caller disposes them with reason `Capacity`. Dropping the
    /// iterator early leaves the store over capacity.
    pub fn enforce_capacity<'a, K, V>(
        &self,
        store: &'a mut EntryStore<K, V>,
    ) -> CapacityEvictions<'a, K, V>
    where
        K: Hash + Eq + Clone,
    {
        CapacityEvictions {
            store,
            policy: *self,
        }
    }

    // == Check Stale On Read ==
    /// Classifies a looked-up entry.
    pub fn check_stale_on_read<K, V>(
        &self,
        tracker: &TimestampTracker,
        entry: &CacheEntry<K, V>,
        now: u64,
    ) -> ReadVerdict {
        match (tracker.is_stale(entry, now), self.allow_stale) {
            (false, _) => ReadVerdict::FRESH,
            (true, true) => ReadVerdict::STALE_SERVED,
            (true, false) => ReadVerdict::STALE_MISS,
        }
    }
}

// == Capacity Evictions ==
/// Lazily drains over-capacity entries from a store.
#[derive(Debug)]
pub struct CapacityEvictions<'a, K, V> {
    store: &'a mut EntryStore<K, V>,
    policy: EvictionPolicy,
}

impl<K, V> Iterator for CapacityEvictions<'_, K, V>
where
    K: Hash + Eq + Clone,
{
    type Item = CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.policy.over_capacity(self.store.len()) {
            self.store.remove_oldest()
        } else {
            None
        }
    }
}
