use std::collections::hash_map;
use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;

use super::{same_entries, Counter, EntriesMut};
use crate::math::log_add;

/// Hash-backed counter.  The default backend.
///
/// # Example
/// ```
/// use tally::counter::{ClassicCounter, Counter};
///
/// let mut c = ClassicCounter::new();
/// c.increment("the");
/// c.increment_count("cat", 2.0);
/// assert_eq!(c.get_count(&"cat"), 2.0);
/// assert_eq!(c.total_count(), 3.0);
/// ```
#[derive(Clone)]
pub struct ClassicCounter<K> {
    map: AHashMap<K, f64>,
    total: f64,
    default_value: f64,
}

impl<K: Hash + Eq + Clone> ClassicCounter<K> {
    pub fn new() -> Self {
        ClassicCounter {
            map: AHashMap::new(),
            total: 0.0,
            default_value: 0.0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ClassicCounter {
            map: AHashMap::with_capacity(capacity),
            total: 0.0,
            default_value: 0.0,
        }
    }

    /// Copies the entries and default value of `other`.  `other` is not
    /// modified.
    pub fn from_counter<C: Counter<K>>(other: &C) -> Self {
        let mut c = Self::with_capacity(other.size());
        other.for_each_entry(|k, v| c.set_count(k.clone(), v));
        c.default_value = other.default_value();
        c
    }

    /// Iterates over `(key, value)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.map.iter().map(|(k, v)| (k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.map.values().copied()
    }

    /// Returns write-through handles over every entry.
    pub fn entries_mut(&mut self) -> EntriesMut<'_, hash_map::IterMut<'_, K, f64>> {
        EntriesMut::new(self.map.iter_mut(), &mut self.total)
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain<F: FnMut(&K, f64) -> bool>(&mut self, mut keep: F) {
        let mut removed = 0.0;
        self.map.retain(|k, v| {
            let kept = keep(k, *v);
            if !kept {
                removed += *v;
            }
            kept
        });
        self.total -= removed;
    }

    /// Removes every key in `keys`.
    pub fn remove_all<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        for key in keys {
            if let Some(v) = self.map.remove(key) {
                self.total -= v;
            }
        }
    }
}

impl<K: Hash + Eq + Clone> Default for ClassicCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone> Counter<K> for ClassicCounter<K> {
    #[inline]
    fn get_count(&self, key: &K) -> f64 {
        self.map.get(key).copied().unwrap_or(self.default_value)
    }

    #[inline]
    fn set_count(&mut self, key: K, value: f64) {
        let old = self.map.insert(key, value).unwrap_or(0.0);
        self.total += value - old;
    }

    #[inline]
    fn increment_count(&mut self, key: K, delta: f64) -> f64 {
        let slot = self.map.entry(key).or_insert(0.0);
        *slot += delta;
        self.total += delta;
        *slot
    }

    fn log_increment_count(&mut self, key: K, log_delta: f64) -> f64 {
        match self.map.entry(key) {
            hash_map::Entry::Occupied(mut e) => {
                let old = *e.get();
                let new = log_add(log_delta, old);
                *e.get_mut() = new;
                self.total += new - old;
                new
            }
            hash_map::Entry::Vacant(e) => {
                e.insert(log_delta);
                self.total += log_delta;
                log_delta
            }
        }
    }

    fn remove(&mut self, key: &K) -> f64 {
        match self.map.remove(key) {
            Some(v) => {
                self.total -= v;
                v
            }
            None => self.default_value,
        }
    }

    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn for_each_entry<F: FnMut(&K, f64)>(&self, mut f: F) {
        for (k, v) in self.map.iter() {
            f(k, *v);
        }
    }

    fn transform_values<F: FnMut(&K, f64) -> f64>(&mut self, mut f: F) {
        let mut entries = self.entries_mut();
        while let Some(mut e) = entries.next_entry() {
            let new = f(e.key(), e.value());
            e.set_value(new);
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.map.len()
    }

    fn clear(&mut self) {
        self.map.clear();
        self.total = 0.0;
    }

    #[inline]
    fn total_count(&self) -> f64 {
        self.total
    }

    fn default_value(&self) -> f64 {
        self.default_value
    }

    fn set_default_value(&mut self, value: f64) {
        self.default_value = value;
    }
}

/// Counts each occurrence of an item as `1.0`.
impl<K: Hash + Eq + Clone> FromIterator<K> for ClassicCounter<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut c = ClassicCounter::new();
        for key in iter {
            c.increment(key);
        }
        c
    }
}

impl<K: Hash + Eq + Clone> Extend<(K, f64)> for ClassicCounter<K> {
    /// Increments by each pair's value.
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.increment_count(k, v);
        }
    }
}

impl<K: Hash + Eq + Clone> PartialEq for ClassicCounter<K> {
    fn eq(&self, other: &Self) -> bool {
        same_entries(self, other)
    }
}

impl<K: fmt::Debug> fmt::Debug for ClassicCounter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_default() {
        let mut c: ClassicCounter<&str> = ClassicCounter::new();
        assert_eq!(c.get_count(&"x"), 0.0);
        c.set_default_value(-1.5);
        assert_eq!(c.get_count(&"x"), -1.5);
        assert_eq!(c.total_count(), 0.0, "default must never enter the total");
        assert!(!c.contains_key(&"x"), "reading must not insert");
    }

    #[test]
    fn increment_ignores_default_value() {
        let mut c = ClassicCounter::new();
        c.set_default_value(10.0);
        assert_eq!(c.increment_count("a", 2.0), 2.0);
        assert_eq!(c.total_count(), 2.0);
    }

    #[test]
    fn set_count_adjusts_total_by_delta() {
        let mut c = ClassicCounter::new();
        c.set_count("a", 3.0);
        c.set_count("b", 4.0);
        c.set_count("a", -1.0);
        assert_eq!(c.total_count(), 3.0);
        assert_eq!(c.get_count(&"a"), -1.0);
    }

    #[test]
    fn remove_returns_value_or_default() {
        let mut c = ClassicCounter::new();
        c.set_default_value(7.0);
        c.set_count("a", 2.0);
        assert_eq!(c.remove(&"a"), 2.0);
        assert_eq!(c.remove(&"a"), 7.0);
        assert_eq!(c.total_count(), 0.0);
        assert!(!c.contains_key(&"a"));
    }

    #[test]
    fn log_increment_of_absent_key_is_exact() {
        let mut c = ClassicCounter::new();
        assert_eq!(c.log_increment_count("a", -3.25), -3.25);
        let v = c.log_increment_count("a", -3.25);
        assert!((v - (-3.25 + std::f64::consts::LN_2)).abs() < 1e-12);
        assert!((c.total_count() - v).abs() < 1e-12);
    }

    #[test]
    fn entry_handles_write_through_to_total() {
        let mut c = ClassicCounter::new();
        c.set_count("a", 1.0);
        c.set_count("b", 2.0);
        {
            let mut it = c.entries_mut();
            while let Some(mut e) = it.next_entry() {
                if *e.key() == "b" {
                    assert_eq!(e.set_value(10.0), 2.0);
                }
            }
        }
        assert_eq!(c.total_count(), 11.0);
        assert_eq!(c.get_count(&"b"), 10.0);
    }

    #[test]
    fn retain_and_remove_all_keep_total() {
        let mut c: ClassicCounter<u32> = (0..10u32).map(|i| i % 4).collect();
        // 0,1 appear three times; 2,3 twice.
        assert_eq!(c.total_count(), 10.0);
        c.retain(|_, v| v > 2.0);
        assert_eq!(c.size(), 2);
        assert_eq!(c.total_count(), 6.0);
        c.remove_all(&[0u32]);
        assert_eq!(c.total_count(), 3.0);
    }

    #[test]
    fn explicit_default_is_not_absence() {
        let mut a = ClassicCounter::new();
        let b: ClassicCounter<&str> = ClassicCounter::new();
        a.set_count("k", 0.0);
        assert_ne!(a, b, "a key held at the default value is still an entry");
        a.remove(&"k");
        assert_eq!(a, b);
    }

    #[test]
    fn copy_leaves_source_untouched() {
        let mut src = ClassicCounter::new();
        src.set_count("a", 1.0);
        src.set_default_value(0.5);
        let mut copy = ClassicCounter::from_counter(&src);
        copy.increment("a");
        assert_eq!(src.get_count(&"a"), 1.0);
        assert_eq!(copy.get_count(&"a"), 2.0);
        assert_eq!(copy.default_value(), 0.5);
    }
}
