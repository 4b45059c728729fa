//! Timestamp Tracker Module
//!
//! Decides whether an entry has outlived its TTL.

use std::time::Duration;

use crate::cache::CacheEntry;

// == Timestamp Tracker ==
/// Staleness rules for resident entries.
///
/// A TTL of zero disables expiration. Comparison is strict, so an entry whose
/// age equals its TTL is still fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampTracker {
    /// Cache-wide TTL in milliseconds, 0 = never expire
    ttl_ms: u64,
    /// Whether reads move the age baseline
    update_age_on_get: bool,
}

impl TimestampTracker {
    pub fn new(ttl_ms: u64, update_age_on_get: bool) -> Self {
        Self {
            ttl_ms,
            update_age_on_get,
        }
    }

    /// Cache-wide TTL, `None` when disabled.
    pub fn ttl(&self) -> Option<Duration> {
        (self.ttl_ms > 0).then(|| Duration::from_millis(self.ttl_ms))
    }

    pub fn update_age_on_get(&self) -> bool {
        self.update_age_on_get
    }

    /// TTL that applies to this entry; per-entry overrides win.
    fn effective_ttl_ms<K, V>(&self, entry: &CacheEntry<K, V>) -> u64 {
        entry.ttl_ms.unwrap_or(self.ttl_ms)
    }

    // == Is Stale ==
    /// True iff a TTL applies and `now - baseline > ttl`.
    pub fn is_stale<K, V>(&self, entry: &CacheEntry<K, V>, now: u64) -> bool {
        match self.effective_ttl_ms(entry) {
            0 => false,
            ttl => entry.age_ms(now, self.update_age_on_get) > ttl,
        }
    }

    // == Refresh ==
    /// Records a read at `now`.
    pub fn refresh<K, V>(&self, entry: &mut CacheEntry<K, V>, now: u64) {
        entry.last_access_at = Some(now);
    }

    // == Remaining ==
    /// Time left until the entry turns stale, `None` if it never expires.
    pub fn remaining<K, V>(&self, entry: &CacheEntry<K, V>, now: u64) -> Option<Duration> {
        match self.effective_ttl_ms(entry) {
            0 => None,
            ttl => {
                let age = entry.age_ms(now, self.update_age_on_get);
                Some(Duration::from_millis(ttl.saturating_sub(age)))
            }
        }
    }
}
