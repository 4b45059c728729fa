//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with age bookkeeping.

// == Cache Entry ==
/// A single resident key/value pair plus the timestamps used for staleness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<K, V> {
    /// Lookup identity
    pub key: K,
    /// The stored value, owned by the entry while resident
    pub value: V,
    /// When the entry was created or last overwritten (clock milliseconds)
    pub inserted_at: u64,
    /// Last successful read, only recorded when reads refresh age
    pub last_access_at: Option<u64>,
    /// Per-entry TTL override in milliseconds; `Some(0)` never expires,
    /// `None` defers to the cache-wide TTL
    pub ttl_ms: Option<u64>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates an entry stamped at `now` that follows the cache-wide TTL.
    pub fn new(key: K, value: V, now: u64) -> Self {
        Self {
            key,
            value,
            inserted_at: now,
            last_access_at: None,
            ttl_ms: None,
        }
    }

    /// Creates an entry with its own TTL.
    pub fn with_ttl(key: K, value: V, now: u64, ttl_ms: u64) -> Self {
        Self {
            ttl_ms: Some(ttl_ms),
            ..Self::new(key, value, now)
        }
    }

    // == Age ==
    /// Timestamp the entry's age is measured from.
    ///
    /// The last access only counts when reads refresh age; otherwise age always
    /// runs from insertion.
    pub fn baseline(&self, update_age_on_get: bool) -> u64 {
        match self.last_access_at {
            Some(accessed) if update_age_on_get => accessed,
            _ => self.inserted_at,
        }
    }

    /// Milliseconds elapsed since the baseline. Saturates at zero.
    pub fn age_ms(&self, now: u64, update_age_on_get: bool) -> u64 {
        now.saturating_sub(self.baseline(update_age_on_get))
    }

    /// Splits the entry into its key and value.
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}
