//! Mini LRU - A bounded in-memory cache
//!
//! Least-recently-used eviction, optional time-to-live expiration and a
//! dispose hook that sees every entry exactly once when it leaves.
//!
//! TTL is checked lazily when a key is read; nothing runs in the background.
//! The cache is a plain single-owner structure: wrap it in a `Mutex` to share
//! it between threads.
//!
//! ```
//! use mini_lru::{DisposeReason, LruCache};
//!
//! let mut cache = LruCache::<&str, i32>::builder()
//!     .max(2)
//!     .dispose(|key, _value, reason| {
//!         assert_eq!((key, reason), ("a", DisposeReason::Capacity));
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap();
//!
//! cache.set("a", 1).unwrap();
//! cache.set("b", 2).unwrap();
//! cache.set("c", 3).unwrap();
//!
//! assert!(!cache.has("a").unwrap());
//! assert_eq!(cache.get("c").unwrap(), Some(3));
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{Clock, DisposeReason, LruCache, LruCacheBuilder, ManualClock, MonotonicClock};
pub use config::CacheConfig;
pub use error::{CacheError, DisposeError, Result};
