//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the cache against a naive reference model.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::{Clock, DisposeReason, LruCache, ManualClock};

type Disposed = Arc<Mutex<Vec<(u8, u32, DisposeReason)>>>;

// == Strategies ==
#[derive(Debug, Clone)]
enum CacheOp {
    Set(u8),
    Get(u8),
    Has(u8),
    Delete(u8),
    Advance(u64),
    Clear,
}

/// Small key space so that overwrites and hits actually happen.
fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        4 => (0u8..8).prop_map(CacheOp::Set),
        3 => (0u8..8).prop_map(CacheOp::Get),
        2 => (0u8..8).prop_map(CacheOp::Has),
        1 => (0u8..8).prop_map(CacheOp::Delete),
        2 => (0u64..80).prop_map(CacheOp::Advance),
        1 => Just(CacheOp::Clear),
    ]
}

fn recording_cache(
    max: usize,
    ttl_ms: u64,
    allow_stale: bool,
    update_age_on_get: bool,
    clock: &ManualClock,
) -> (LruCache<u8, u32>, Disposed) {
    let disposed = Disposed::default();
    let sink = Arc::clone(&disposed);
    let cache = LruCache::builder()
        .max(max)
        .ttl(Duration::from_millis(ttl_ms))
        .allow_stale(allow_stale)
        .update_age_on_get(update_age_on_get)
        .clock(Arc::new(clock.clone()))
        .dispose(move |k, v, r| {
            sink.lock().unwrap().push((k, v, r));
            Ok(())
        })
        .build()
        .unwrap();
    (cache, disposed)
}

// == Reference Model ==
/// Vec-based LRU without TTL, most recently used first.
struct Model {
    max: usize,
    update_age_on_get: bool,
    order: Vec<(u8, u32)>,
}

impl Model {
    fn position(&self, key: u8) -> Option<usize> {
        self.order.iter().position(|(k, _)| *k == key)
    }

    fn set(&mut self, key: u8, value: u32) -> Vec<(u8, u32, DisposeReason)> {
        let mut out = Vec::new();
        if let Some(pos) = self.position(key) {
            let (k, v) = self.order.remove(pos);
            out.push((k, v, DisposeReason::Set));
        }
        self.order.insert(0, (key, value));
        while self.max > 0 && self.order.len() > self.max {
            if let Some((k, v)) = self.order.pop() {
                out.push((k, v, DisposeReason::Capacity));
            }
        }
        out
    }

    fn get(&mut self, key: u8) -> Option<u32> {
        let pos = self.position(key)?;
        let entry = self.order[pos];
        if self.update_age_on_get {
            self.order.remove(pos);
            self.order.insert(0, entry);
        }
        Some(entry.1)
    }

    fn delete(&mut self, key: u8) -> Option<(u8, u32, DisposeReason)> {
        let pos = self.position(key)?;
        let (k, v) = self.order.remove(pos);
        Some((k, v, DisposeReason::Delete))
    }

    fn clear(&mut self) -> Vec<(u8, u32, DisposeReason)> {
        self.order
            .drain(..)
            .rev()
            .map(|(k, v)| (k, v, DisposeReason::Clear))
            .collect()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Without TTL the cache must behave exactly like the model: same values,
    // same recency order, same disposals in the same order.
    #[test]
    fn prop_matches_reference_model(
        max in 0usize..6,
        update_age_on_get in any::<bool>(),
        ops in prop::collection::vec(cache_op_strategy(), 1..120)
    ) {
        let clock = ManualClock::new();
        let (mut cache, disposed) = recording_cache(max, 0, false, update_age_on_get, &clock);
        let mut model = Model { max, update_age_on_get, order: Vec::new() };
        let mut expected = Vec::new();

        for (i, op) in ops.into_iter().enumerate() {
            let value = i as u32;
            match op {
                CacheOp::Set(k) => {
                    cache.set(k, value).unwrap();
                    expected.extend(model.set(k, value));
                }
                CacheOp::Get(k) => {
                    prop_assert_eq!(cache.get(&k).unwrap(), model.get(k));
                }
                CacheOp::Has(k) => {
                    prop_assert_eq!(cache.has(&k).unwrap(), model.position(k).is_some());
                }
                CacheOp::Delete(k) => {
                    let removed = model.delete(k);
                    prop_assert_eq!(cache.delete(&k).unwrap(), removed.is_some());
                    expected.extend(removed);
                }
                CacheOp::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                CacheOp::Clear => {
                    cache.clear().unwrap();
                    expected.extend(model.clear());
                }
            }

            let actual: Vec<(u8, u32)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
            prop_assert_eq!(&actual, &model.order);
            prop_assert_eq!(&*disposed.lock().unwrap(), &expected);
        }
    }

    // For any mix of operations, size never exceeds the bound and each value
    // is disposed exactly once, and only after it stopped being resident.
    #[test]
    fn prop_capacity_and_dispose_exactly_once(
        max in 1usize..6,
        ttl_ms in prop_oneof![Just(0u64), 1u64..100],
        allow_stale in any::<bool>(),
        update_age_on_get in any::<bool>(),
        ops in prop::collection::vec(cache_op_strategy(), 1..150)
    ) {
        let clock = ManualClock::new();
        let (mut cache, disposed) =
            recording_cache(max, ttl_ms, allow_stale, update_age_on_get, &clock);
        let mut inserted = 0usize;

        for (i, op) in ops.into_iter().enumerate() {
            match op {
                CacheOp::Set(k) => {
                    cache.set(k, i as u32).unwrap();
                    inserted += 1;
                }
                CacheOp::Get(k) => {
                    cache.get(&k).unwrap();
                }
                CacheOp::Has(k) => {
                    cache.has(&k).unwrap();
                }
                CacheOp::Delete(k) => {
                    cache.delete(&k).unwrap();
                }
                CacheOp::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                CacheOp::Clear => cache.clear().unwrap(),
            }

            prop_assert!(cache.len() <= max, "size {} exceeds max {}", cache.len(), max);

            let log = disposed.lock().unwrap();
            let unique: HashSet<u32> = log.iter().map(|(_, v, _)| *v).collect();
            prop_assert_eq!(unique.len(), log.len(), "a value was disposed twice");
            prop_assert_eq!(log.len() + cache.len(), inserted);

            let resident: HashSet<u32> = cache.store.iter().map(|e| e.value).collect();
            prop_assert!(unique.is_disjoint(&resident), "a resident value was disposed");
        }
    }

    // A get never hands out an entry older than its TTL unless stale reads
    // are allowed, and then only once. A has never reports one at all.
    #[test]
    fn prop_never_returns_stale(
        ttl_ms in 1u64..100,
        allow_stale in any::<bool>(),
        update_age_on_get in any::<bool>(),
        ops in prop::collection::vec(cache_op_strategy(), 1..150)
    ) {
        let clock = ManualClock::new();
        let (mut cache, _) = recording_cache(0, ttl_ms, allow_stale, update_age_on_get, &clock);
        // key -> (value, baseline) as the cache should see it
        let mut baselines: HashMap<u8, (u32, u64)> = HashMap::new();

        for (i, op) in ops.into_iter().enumerate() {
            let now = clock.now_ms();
            match op {
                CacheOp::Set(k) => {
                    cache.set(k, i as u32).unwrap();
                    baselines.insert(k, (i as u32, now));
                }
                CacheOp::Get(k) => {
                    let got = cache.get(&k).unwrap();
                    match baselines.get(&k).copied() {
                        Some((value, baseline)) if now - baseline <= ttl_ms => {
                            prop_assert_eq!(got, Some(value));
                            if update_age_on_get {
                                baselines.insert(k, (value, now));
                            }
                        }
                        Some((value, _)) => {
                            let expected = allow_stale.then_some(value);
                            prop_assert_eq!(got, expected);
                            baselines.remove(&k);
                            prop_assert_eq!(cache.get(&k).unwrap(), None);
                        }
                        None => prop_assert_eq!(got, None),
                    }
                }
                CacheOp::Has(k) => {
                    let has = cache.has(&k).unwrap();
                    match baselines.get(&k).copied() {
                        Some((_, baseline)) if now - baseline <= ttl_ms => prop_assert!(has),
                        Some(_) => {
                            prop_assert!(!has, "stale entry reported as present");
                            if !allow_stale {
                                baselines.remove(&k);
                            }
                        }
                        None => prop_assert!(!has),
                    }
                }
                CacheOp::Delete(k) => {
                    cache.delete(&k).unwrap();
                    baselines.remove(&k);
                }
                CacheOp::Advance(ms) => clock.advance(Duration::from_millis(ms)),
                CacheOp::Clear => {
                    cache.clear().unwrap();
                    baselines.clear();
                }
            }
        }
    }
}
