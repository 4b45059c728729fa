//! Cache Module
//!
//! Provides a bounded in-memory cache with LRU eviction, lazy TTL expiration
//! and a dispose hook.

mod clock;
mod dispose;
mod entry;
mod lru;
mod policy;
mod stats;
mod store;
mod tracker;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use dispose::{DisposeFn, DisposeReason, Disposer};
pub use entry::CacheEntry;
pub use lru::{EntryStore, Iter as EntryIter};
pub use policy::{CapacityEvictions, EvictionPolicy, ReadVerdict};
pub use stats::CacheStats;
pub use store::{Iter, LruCache, LruCacheBuilder};
pub use tracker::TimestampTracker;
