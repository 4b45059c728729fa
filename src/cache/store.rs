//! Cache Store Module
//!
//! Main cache engine combining recency-ordered storage with capacity
//! eviction, lazy TTL expiration and a dispose hook.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::dispose::DisposeOutcome;
use crate::cache::{
    CacheEntry, CacheStats, Clock, DisposeFn, DisposeReason, Disposer, EntryIter, EntryStore,
    EvictionPolicy, MonotonicClock, TimestampTracker,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, DisposeError, Result};

// == LRU Cache ==
/// Bounded LRU cache with optional TTL expiration.
///
/// Every entry that leaves the cache, whatever the cause, passes through the
/// dispose hook exactly once. The hook runs after the entry is already gone,
/// and its failure is returned from the operation that triggered it without
/// undoing that operation.
///
/// Not internally synchronized: share it behind a `Mutex` if needed.
pub struct LruCache<K, V> {
    /// Recency-ordered entries
    pub(super) store: EntryStore<K, V>,
    /// Staleness rules
    tracker: TimestampTracker,
    /// Capacity bound and stale-read policy
    policy: EvictionPolicy,
    /// Removal hook
    disposer: Disposer<K, V>,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructors ==
    /// Creates a cache holding at most `max` entries (0 = unbounded), without
    /// TTL or dispose hook.
    pub fn new(max: usize) -> Self {
        Self::from_parts(
            EvictionPolicy::new(max, false),
            TimestampTracker::default(),
            Disposer::default(),
            Arc::new(MonotonicClock::new()),
        )
    }

    /// Starts a builder for the full set of options.
    pub fn builder() -> LruCacheBuilder<K, V> {
        LruCacheBuilder::new()
    }

    /// Creates a cache from loaded options.
    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    fn from_parts(
        policy: EvictionPolicy,
        tracker: TimestampTracker,
        disposer: Disposer<K, V>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if !policy.is_bounded() && tracker.ttl().is_none() {
            warn!("cache has neither max nor ttl; memory use is unbounded");
        }
        Self {
            store: EntryStore::new(),
            tracker,
            policy,
            disposer,
            clock,
            stats: CacheStats::new(),
        }
    }

    // == Set ==
    /// Stores a key-value pair at the most-recently-used position.
    ///
    /// An existing value for the key is disposed with [`DisposeReason::Set`]
    /// and the entry's age restarts. If the cache grows past its bound, the
    /// least recently used entries are disposed with [`DisposeReason::Capacity`].
    pub fn set(&mut self, key: K, value: V) -> Result<()> {
        let now = self.now();
        self.install(CacheEntry::new(key, value, now))
    }

    /// Like [`set`](Self::set), with a TTL for this entry only.
    ///
    /// `Duration::ZERO` makes the entry immune to expiration. A non-zero TTL
    /// under one millisecond is rejected before anything changes.
    pub fn set_with_ttl(&mut self, key: K, value: V, ttl: Duration) -> Result<()> {
        let ttl_ms = ttl_to_ms(ttl)?;
        let now = self.now();
        self.install(CacheEntry::with_ttl(key, value, now, ttl_ms))
    }

    fn install(&mut self, entry: CacheEntry<K, V>) -> Result<()> {
        let mut outcome = DisposeOutcome::default();

        if let Some(previous) = self.store.insert(entry) {
            outcome.record(Self::release(
                &mut self.disposer,
                &mut self.stats,
                previous,
                DisposeReason::Set,
            ));
        }
        self.trim(&mut outcome);

        outcome.finish()
    }

    /// Evicts LRU entries until the capacity bound holds.
    fn trim(&mut self, outcome: &mut DisposeOutcome) {
        let policy = self.policy;
        let mut evicted = 0usize;
        for old in policy.enforce_capacity(&mut self.store) {
            evicted += 1;
            outcome.record(Self::release(
                &mut self.disposer,
                &mut self.stats,
                old,
                DisposeReason::Capacity,
            ));
        }
        if evicted > 0 {
            debug!(evicted, max = policy.max(), "evicted least recently used entries");
        }
    }

    // == Get ==
    /// Returns a clone of the value for `key`.
    ///
    /// A stale entry is removed with [`DisposeReason::Ttl`]; with
    /// `allow_stale` its value is still returned this one last time. With
    /// `update_age_on_get`, a fresh hit moves to the most-recently-used
    /// position and restarts its age.
    pub fn get<Q>(&mut self, key: &Q) -> Result<Option<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let now = self.now();
        let Some(entry) = self.store.get(key) else {
            self.stats.record_miss();
            return Ok(None);
        };

        let verdict = self.policy.check_stale_on_read(&self.tracker, entry, now);
        let value = verdict.valid.then(|| entry.value.clone());

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }

        if verdict.evict {
            debug!(served = verdict.valid, "expiring stale entry on read");
            self.remove_and_dispose(key, DisposeReason::Ttl)
                .transpose()?;
        } else if self.tracker.update_age_on_get() {
            self.store.touch(key);
            if let Some(entry) = self.store.get_mut(key) {
                self.tracker.refresh(entry, now);
            }
        }

        Ok(value)
    }

    // == Peek ==
    /// Returns the value for `key` without touching recency, age or stats.
    ///
    /// A stale entry reads as absent unless `allow_stale` is set; either way
    /// it stays resident.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.store.get(key)?;
        let hidden = !self.policy.allow_stale() && self.tracker.is_stale(entry, self.now());
        (!hidden).then_some(&entry.value)
    }

    // == Has ==
    /// Checks whether `key` would be served by [`get`](Self::get), without
    /// changing recency even when `update_age_on_get` is set.
    ///
    /// A stale entry always reports `false`. It is expired on the spot
    /// unless `allow_stale` is set, in which case it stays resident for its
    /// one last `get`.
    pub fn has<Q>(&mut self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = self.now();
        let verdict = match self.store.get(key) {
            Some(entry) => self.policy.check_stale_on_read(&self.tracker, entry, now),
            None => return Ok(false),
        };

        if !verdict.evict {
            return Ok(true);
        }
        if !verdict.valid {
            debug!("expiring stale entry on membership check");
            self.remove_and_dispose(key, DisposeReason::Ttl)
                .transpose()?;
        }
        Ok(false)
    }

    // == Delete ==
    /// Removes and disposes the entry for `key`.
    ///
    /// Returns whether the key was present.
    pub fn delete<Q>(&mut self, key: &Q) -> Result<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.remove_and_dispose(key, DisposeReason::Delete) {
            Some(result) => result.map(|()| true),
            None => Ok(false),
        }
    }

    // == Clear ==
    /// Disposes every entry, least recently used first, and empties the cache.
    ///
    /// The cache is empty afterwards even if some disposals failed.
    pub fn clear(&mut self) -> Result<()> {
        let mut outcome = DisposeOutcome::default();
        let mut cleared = 0usize;

        while let Some(entry) = self.store.remove_oldest() {
            cleared += 1;
            outcome.record(Self::release(
                &mut self.disposer,
                &mut self.stats,
                entry,
                DisposeReason::Clear,
            ));
        }

        debug!(cleared, "cache cleared");
        outcome.finish()
    }

    // == Prune ==
    /// Expires every stale entry now instead of waiting for it to be read.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> Result<usize> {
        let now = self.now();
        let tracker = self.tracker;
        let stale: Vec<K> = self
            .store
            .iter()
            .filter(|&entry| tracker.is_stale(entry, now))
            .map(|entry| entry.key.clone())
            .collect();

        let mut outcome = DisposeOutcome::default();
        for key in &stale {
            if let Some(result) = self.remove_and_dispose(key, DisposeReason::Ttl) {
                outcome.record(result);
            }
        }

        if !stale.is_empty() {
            debug!(pruned = stale.len(), "pruned stale entries");
        }
        outcome.finish().map(|()| stale.len())
    }

    // == Resize ==
    /// Changes the capacity bound (0 = unbounded), evicting LRU entries if
    /// the cache no longer fits.
    pub fn set_max(&mut self, max: usize) -> Result<()> {
        self.policy.set_max(max);
        let mut outcome = DisposeOutcome::default();
        self.trim(&mut outcome);
        outcome.finish()
    }

    // == Removal Path ==
    /// Removes `key` from the store, then disposes it.
    ///
    /// Returns None if the key was not resident.
    fn remove_and_dispose<Q>(&mut self, key: &Q, reason: DisposeReason) -> Option<Result<()>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.store.remove(key)?;
        Some(Self::release(
            &mut self.disposer,
            &mut self.stats,
            entry,
            reason,
        ))
    }

    /// Hands an entry that already left the store to the dispose hook.
    fn release(
        disposer: &mut Disposer<K, V>,
        stats: &mut CacheStats,
        entry: CacheEntry<K, V>,
        reason: DisposeReason,
    ) -> Result<()> {
        stats.record_removal(reason);
        let (key, value) = entry.into_parts();
        disposer.dispose(key, value, reason)
    }

    // == Introspection ==
    /// Time left before `key` turns stale; `None` if absent or never expiring.
    pub fn remaining_ttl<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = self.store.get(key)?;
        self.tracker.remaining(entry, self.now())
    }

    /// Iterates `(key, value)` pairs from most to least recently used.
    ///
    /// Never changes recency. Stale entries are skipped unless `allow_stale`
    /// is set. Call `.rev()` for eviction order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.store.iter(),
            tracker: self.tracker,
            now: self.now(),
            include_stale: self.policy.allow_stale(),
        }
    }

    /// Keys in most-recently-used order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Values in most-recently-used order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + '_ {
        self.iter().map(|(_, value)| value)
    }

    /// Number of resident entries, stale ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Capacity bound, 0 = unbounded.
    pub fn max(&self) -> usize {
        self.policy.max()
    }

    /// Cache-wide TTL, `None` when disabled.
    pub fn ttl(&self) -> Option<Duration> {
        self.tracker.ttl()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.store.len());
        stats
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("policy", &self.policy)
            .field("tracker", &self.tracker)
            .field("disposer", &self.disposer)
            .field("clock", &self.clock)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'a, K, V> IntoIterator for &'a LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// == Iterator ==
/// Iterator over live `(key, value)` pairs, most recently used first.
pub struct Iter<'a, K, V> {
    inner: EntryIter<'a, K, V>,
    tracker: TimestampTracker,
    now: u64,
    include_stale: bool,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (tracker, now, include_stale) = (self.tracker, self.now, self.include_stale);
        self.inner
            .find(|&entry| include_stale || !tracker.is_stale(entry, now))
            .map(|entry| (&entry.key, &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (tracker, now, include_stale) = (self.tracker, self.now, self.include_stale);
        self.inner
            .rfind(|&entry| include_stale || !tracker.is_stale(entry, now))
            .map(|entry| (&entry.key, &entry.value))
    }
}

// == Builder ==
/// Builder for configuring an [`LruCache`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use mini_lru::LruCache;
///
/// let mut cache = LruCache::builder()
///     .max(2)
///     .ttl(Duration::from_secs(60))
///     .update_age_on_get(true)
///     .build()
///     .unwrap();
///
/// cache.set("a", 1).unwrap();
/// assert_eq!(cache.get("a").unwrap(), Some(1));
/// ```
pub struct LruCacheBuilder<K, V> {
    max: usize,
    ttl: Duration,
    allow_stale: bool,
    update_age_on_get: bool,
    dispose: Option<DisposeFn<K, V>>,
    clock: Option<Arc<dyn Clock>>,
}

impl<K, V> LruCacheBuilder<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a builder for an unbounded cache without TTL.
    pub fn new() -> Self {
        Self {
            max: 0,
            ttl: Duration::ZERO,
            allow_stale: false,
            update_age_on_get: false,
            dispose: None,
            clock: None,
        }
    }

    /// Maximum resident entries, 0 = unbounded.
    pub fn max(mut self, max: usize) -> Self {
        self.max = max;
        self
    }

    /// Cache-wide TTL, `Duration::ZERO` = no expiration.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn allow_stale(mut self, allow_stale: bool) -> Self {
        self.allow_stale = allow_stale;
        self
    }

    pub fn update_age_on_get(mut self, update_age_on_get: bool) -> Self {
        self.update_age_on_get = update_age_on_get;
        self
    }

    /// Takes every option from a loaded config.
    pub fn config(mut self, config: &CacheConfig) -> Self {
        self.max = config.max;
        self.ttl = Duration::from_millis(config.ttl_ms);
        self.allow_stale = config.allow_stale;
        self.update_age_on_get = config.update_age_on_get;
        self
    }

    /// Hook called with every entry that leaves the cache.
    ///
    /// The hook cannot reach the cache it belongs to; removals it reports are
    /// already complete.
    pub fn dispose<F>(mut self, hook: F) -> Self
    where
        F: FnMut(K, V, DisposeReason) -> std::result::Result<(), DisposeError> + Send + 'static,
    {
        self.dispose = Some(Box::new(hook));
        self
    }

    /// Time source, defaults to [`MonotonicClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validates the options and builds the cache.
    pub fn build(self) -> Result<LruCache<K, V>> {
        let ttl_ms = ttl_to_ms(self.ttl)?;
        let clock: Arc<dyn Clock> = match self.clock {
            Some(clock) => clock,
            None => Arc::new(MonotonicClock::new()),
        };

        Ok(LruCache::from_parts(
            EvictionPolicy::new(self.max, self.allow_stale),
            TimestampTracker::new(ttl_ms, self.update_age_on_get),
            Disposer::new(self.dispose),
            clock,
        ))
    }
}

impl<K, V> Default for LruCacheBuilder<K, V>
where
    K: Hash + Eq + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for LruCacheBuilder<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCacheBuilder")
            .field("max", &self.max)
            .field("ttl", &self.ttl)
            .field("allow_stale", &self.allow_stale)
            .field("update_age_on_get", &self.update_age_on_get)
            .field("dispose", &self.dispose.is_some())
            .finish_non_exhaustive()
    }
}

/// Converts a TTL to whole milliseconds, rejecting values the clock cannot
/// represent.
fn ttl_to_ms(ttl: Duration) -> Result<u64> {
    let ms = u64::try_from(ttl.as_millis())
        .map_err(|_| CacheError::Config(format!("ttl {ttl:?} is too large")))?;
    if ms == 0 && !ttl.is_zero() {
        return Err(CacheError::Config(format!(
            "ttl {ttl:?} is below the 1ms clock resolution"
        )));
    }
    Ok(ms)
}
