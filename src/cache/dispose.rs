//! Disposal Module
//!
//! The removal hook and the closed set of reasons an entry can leave the cache.

use std::fmt;

use serde::Serialize;
use tracing::{trace, warn};

use crate::error::{CacheError, DisposeError, Result};

// == Dispose Reason ==
/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisposeReason {
    /// Replaced by a `set` on the same key
    Set,
    /// Removed by an explicit `delete`
    Delete,
    /// Dropped as least recently used to respect the capacity bound
    Capacity,
    /// Outlived its TTL, on read or through `prune`
    Ttl,
    /// Removed by `clear`
    Clear,
}

impl DisposeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisposeReason::Set => "set",
            DisposeReason::Delete => "delete",
            DisposeReason::Capacity => "capacity",
            DisposeReason::Ttl => "ttl",
            DisposeReason::Clear => "clear",
        }
    }
}

impl fmt::Display for DisposeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User callback receiving every entry that leaves the cache.
pub type DisposeFn<K, V> =
    Box<dyn FnMut(K, V, DisposeReason) -> std::result::Result<(), DisposeError> + Send>;

// == Disposer ==
/// Owns the optional dispose callback.
///
/// Only ever handed entries that are already out of the store, so a failing
/// callback cannot leave anything half-removed.
pub struct Disposer<K, V> {
    hook: Option<DisposeFn<K, V>>,
}

impl<K, V> Disposer<K, V> {
    pub fn new(hook: Option<DisposeFn<K, V>>) -> Self {
        Self { hook }
    }

    pub fn is_set(&self) -> bool {
        self.hook.is_some()
    }

    // == Dispose ==
    /// Releases one removed entry. Without a hook the value is simply dropped.
    pub fn dispose(&mut self, key: K, value: V, reason: DisposeReason) -> Result<()> {
        trace!(%reason, "disposing entry");
        match self.hook.as_mut() {
            Some(hook) => hook(key, value, reason)
                .map_err(|source| CacheError::Dispose { reason, source }),
            None => Ok(()),
        }
    }
}

impl<K, V> Default for Disposer<K, V> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<K, V> fmt::Debug for Disposer<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("hook", &self.is_set())
            .finish()
    }
}

// == Dispose Outcome ==
/// Collects the disposal results of one operation.
///
/// The first failure is what the caller sees; later ones are only logged.
#[derive(Debug, Default)]
pub(crate) struct DisposeOutcome {
    first_error: Option<CacheError>,
}

impl DisposeOutcome {
    pub(crate) fn record(&mut self, result: Result<()>) {
        if let Err(err) = result {
            if self.first_error.is_none() {
                self.first_error = Some(err);
            } else {
                warn!(error = %err, "dropping additional dispose failure");
            }
        }
    }

    pub(crate) fn finish(self) -> Result<()> {
        match self.first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_reason_names() {
        assert_eq!(DisposeReason::Capacity.to_string(), "capacity");
        assert_eq!(DisposeReason::Ttl.as_str(), "ttl");
        assert_eq!(
            serde_json::to_string(&DisposeReason::Ttl).unwrap(),
            "\"ttl\""
        );
        assert_eq!(
            serde_json::to_string(&DisposeReason::Clear).unwrap(),
            "\"clear\""
        );
    }

    #[test]
    fn test_dispose_without_hook() {
        let mut disposer: Disposer<&str, i32> = Disposer::default();
        assert!(!disposer.is_set());
        assert!(disposer.dispose("a", 1, DisposeReason::Delete).is_ok());
    }

    #[test]
    fn test_dispose_calls_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut disposer: Disposer<&str, i32> = Disposer::new(Some(Box::new(move |k, v, r| {
            sink.lock().unwrap().push((k, v, r));
            Ok(())
        })));

        disposer.dispose("a", 1, DisposeReason::Set).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![("a", 1, DisposeReason::Set)]);
    }

    #[test]
    fn test_dispose_failure_is_wrapped() {
        let mut disposer: Disposer<&str, i32> =
            Disposer::new(Some(Box::new(|_, _, _| Err("boom".into()))));

        let err = disposer.dispose("a", 1, DisposeReason::Ttl).unwrap_err();
        assert_eq!(err.dispose_reason(), Some(DisposeReason::Ttl));
    }

    #[test]
    fn test_outcome_keeps_first_error() {
        let mut outcome = DisposeOutcome::default();
        outcome.record(Ok(()));
        outcome.record(Err(CacheError::Dispose {
            reason: DisposeReason::Clear,
            source: "first".into(),
        }));
        outcome.record(Err(CacheError::Dispose {
            reason: DisposeReason::Capacity,
            source: "second".into(),
        }));

        let err = outcome.finish().unwrap_err();
        assert_eq!(err.dispose_reason(), Some(DisposeReason::Clear));
    }

    #[test]
    fn test_outcome_ok_when_clean() {
        let mut outcome = DisposeOutcome::default();
        outcome.record(Ok(()));
        assert!(outcome.finish().is_ok());
    }
}
