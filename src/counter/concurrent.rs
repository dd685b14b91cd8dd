use std::hash::Hash;

use ahash::{AHashMap, RandomState};
use parking_lot::RwLock;

use super::{same_entries, ClassicCounter, Counter};
use crate::math::log_add;

// ---------------------------------------------------------------------------
// Shard
// ---------------------------------------------------------------------------

/// Entries of one shard together with their sum.
///
/// The total lives under the same lock as the map, so every single-key
/// mutation updates both in one critical section.
struct ShardState<K> {
    map: AHashMap<K, f64>,
    total: f64,
}

/// Cache-line padding to prevent false sharing between shards.
#[repr(align(64))]
struct Shard<K> {
    state: RwLock<ShardState<K>>,
}

// ---------------------------------------------------------------------------
// ConcurrentCounter
// ---------------------------------------------------------------------------

/// A thread-safe counter backed by `N` independently-locked shards.
///
/// Every single-key operation (`set_count`, `increment_count`,
/// `log_increment_count`, `remove`, …) takes `&self` and is atomic for
/// that key: concurrent increments are never lost.  Reads use a shared
/// lock, writes an exclusive lock, both per shard.
///
/// Sequences of calls are **not** atomic.  A read followed by a write
/// (`let v = c.get_count(&k); c.set_count(k, f(v))`) can interleave with
/// other threads; callers that need such a sequence to be atomic must
/// serialise it themselves.  [`total_count`](Self::total_count) and
/// iteration visit shards one at a time, so under concurrent writes they
/// observe each shard at a slightly different instant.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use tally::counter::ConcurrentCounter;
///
/// let c: Arc<ConcurrentCounter<u32>> = Arc::new(ConcurrentCounter::new(8));
/// let handles: Vec<_> = (0..4)
///     .map(|_| {
///         let c = Arc::clone(&c);
///         std::thread::spawn(move || {
///             for _ in 0..1_000 {
///                 c.increment_count(7, 1.0);
///             }
///         })
///     })
///     .collect();
/// for h in handles {
///     h.join().unwrap();
/// }
/// assert_eq!(c.get_count(&7), 4_000.0);
/// ```
pub struct ConcurrentCounter<K> {
    shards: Box<[Shard<K>]>,
    /// Always `shards.len() - 1`; shards.len() is a power of two.
    shard_mask: usize,
    /// Hasher used only to compute shard indices.
    build_hasher: RandomState,
    default_value: f64,
}

impl<K: Hash + Eq + Clone> ConcurrentCounter<K> {
    /// Creates a counter with `num_shards` shards (must be a power of two).
    pub fn new(num_shards: usize) -> Self {
        assert!(num_shards.is_power_of_two(), "num_shards must be a power of two");
        let shards = (0..num_shards)
            .map(|_| Shard {
                state: RwLock::new(ShardState {
                    map: AHashMap::new(),
                    total: 0.0,
                }),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        ConcurrentCounter {
            shards,
            shard_mask: num_shards - 1,
            build_hasher: RandomState::new(),
            default_value: 0.0,
        }
    }

    #[inline]
    fn shard(&self, key: &K) -> &Shard<K> {
        let h = self.build_hasher.hash_one(key);
        // Use the high bits (better avalanche from ahash).
        &self.shards[((h >> 32) as usize) & self.shard_mask]
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    // -----------------------------------------------------------------------
    // Single-key operations
    // -----------------------------------------------------------------------

    pub fn get_count(&self, key: &K) -> f64 {
        self.shard(key)
            .state
            .read()
            .map
            .get(key)
            .copied()
            .unwrap_or(self.default_value)
    }

    pub fn set_count(&self, key: K, value: f64) {
        let mut state = self.shard(&key).state.write();
        let old = state.map.insert(key, value).unwrap_or(0.0);
        state.total += value - old;
    }

    /// Adds `delta` atomically and returns the new value.
    pub fn increment_count(&self, key: K, delta: f64) -> f64 {
        let mut guard = self.shard(&key).state.write();
        let state = &mut *guard;
        let slot = state.map.entry(key).or_insert(0.0);
        *slot += delta;
        state.total += delta;
        *slot
    }

    pub fn decrement_count(&self, key: K, delta: f64) -> f64 {
        self.increment_count(key, -delta)
    }

    pub fn log_increment_count(&self, key: K, log_delta: f64) -> f64 {
        let mut guard = self.shard(&key).state.write();
        let state = &mut *guard;
        let (new, old) = match state.map.get_mut(&key) {
            Some(slot) => {
                let old = *slot;
                *slot = log_add(log_delta, old);
                (*slot, old)
            }
            None => {
                state.map.insert(key, log_delta);
                (log_delta, 0.0)
            }
        };
        state.total += new - old;
        new
    }

    pub fn remove(&self, key: &K) -> f64 {
        let mut state = self.shard(key).state.write();
        match state.map.remove(key) {
            Some(v) => {
                state.total -= v;
                v
            }
            None => self.default_value,
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.shard(key).state.read().map.contains_key(key)
    }

    // -----------------------------------------------------------------------
    // Whole-counter operations
    // -----------------------------------------------------------------------

    /// Sum of the shard totals.
    pub fn total_count(&self) -> f64 {
        self.shards.iter().map(|s| s.state.read().total).sum()
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.state.read().map.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.state.read().map.is_empty())
    }

    /// Removes all entries from every shard.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut state = shard.state.write();
            state.map.clear();
            state.total = 0.0;
        }
    }

    /// Visits every entry, holding one shard's read lock at a time.
    ///
    /// `f` must not call back into this counter for a write.
    pub fn for_each_entry<F: FnMut(&K, f64)>(&self, mut f: F) {
        for shard in self.shards.iter() {
            let state = shard.state.read();
            for (k, v) in state.map.iter() {
                f(k, *v);
            }
        }
    }

    /// Copies the current contents into a single-threaded counter.
    pub fn snapshot(&self) -> ClassicCounter<K> {
        let mut c = ClassicCounter::with_capacity(self.len());
        self.for_each_entry(|k, v| c.set_count(k.clone(), v));
        c.set_default_value(self.default_value);
        c
    }
}

impl<K: Hash + Eq + Clone> Counter<K> for ConcurrentCounter<K> {
    fn get_count(&self, key: &K) -> f64 {
        ConcurrentCounter::get_count(self, key)
    }

    fn set_count(&mut self, key: K, value: f64) {
        ConcurrentCounter::set_count(self, key, value)
    }

    fn increment_count(&mut self, key: K, delta: f64) -> f64 {
        ConcurrentCounter::increment_count(self, key, delta)
    }

    fn log_increment_count(&mut self, key: K, log_delta: f64) -> f64 {
        ConcurrentCounter::log_increment_count(self, key, log_delta)
    }

    fn remove(&mut self, key: &K) -> f64 {
        ConcurrentCounter::remove(self, key)
    }

    fn contains_key(&self, key: &K) -> bool {
        ConcurrentCounter::contains_key(self, key)
    }

    fn for_each_entry<F: FnMut(&K, f64)>(&self, f: F) {
        ConcurrentCounter::for_each_entry(self, f)
    }

    fn transform_values<F: FnMut(&K, f64) -> f64>(&mut self, mut f: F) {
        // `&mut self` rules out concurrent access, so each shard can be
        // rewritten under its own lock.
        for shard in self.shards.iter_mut() {
            let state = shard.state.get_mut();
            let mut delta = 0.0;
            for (k, v) in state.map.iter_mut() {
                let new = f(k, *v);
                delta += new - *v;
                *v = new;
            }
            state.total += delta;
        }
    }

    fn size(&self) -> usize {
        self.len()
    }

    fn clear(&mut self) {
        ConcurrentCounter::clear(self)
    }

    fn total_count(&self) -> f64 {
        ConcurrentCounter::total_count(self)
    }

    fn default_value(&self) -> f64 {
        self.default_value
    }

    fn set_default_value(&mut self, value: f64) {
        self.default_value = value;
    }
}

impl<K: Hash + Eq + Clone> PartialEq for ConcurrentCounter<K> {
    fn eq(&self, other: &Self) -> bool {
        same_entries(self, other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn concurrent_increments_are_not_lost() {
        let c: Arc<ConcurrentCounter<u64>> = Arc::new(ConcurrentCounter::new(16));
        let mut handles = Vec::new();
        for t in 0..8u64 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                for j in 0..500u64 {
                    c.increment_count(j % 10, 1.0);
                    c.increment_count(1_000 + t, 0.5);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        for k in 0..10u64 {
            assert_eq!(c.get_count(&k), 400.0, "lost update on key {k}");
        }
        assert_eq!(c.total_count(), 8.0 * 500.0 * 1.5);
        assert_eq!(c.len(), 18);
    }

    #[test]
    fn concurrent_set_and_remove_keep_total_exact() {
        let c: Arc<ConcurrentCounter<u32>> = Arc::new(ConcurrentCounter::new(4));
        let mut handles = Vec::new();
        for t in 0..4u32 {
            let c = Arc::clone(&c);
            handles.push(std::thread::spawn(move || {
                for j in 0..200u32 {
                    let key = t * 1_000 + j;
                    c.set_count(key, 2.0);
                    if j % 2 == 0 {
                        c.remove(&key);
                    }
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let mut sum = 0.0;
        c.for_each_entry(|_, v| sum += v);
        assert_eq!(c.total_count(), sum);
        assert_eq!(c.total_count(), 4.0 * 100.0 * 2.0);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two_shards() {
        let _ = ConcurrentCounter::<u8>::new(3);
    }

    #[test]
    fn snapshot_copies_contents() {
        let c = ConcurrentCounter::new(2);
        c.set_count("a", 1.0);
        c.log_increment_count("b", 0.0);
        let snap = c.snapshot();
        assert_eq!(snap.get_count(&"a"), 1.0);
        assert_eq!(snap.get_count(&"b"), 0.0);
        assert!(snap.contains_key(&"b"));
        assert_eq!(snap.total_count(), c.total_count());
    }
}
