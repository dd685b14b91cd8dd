use std::fmt;
use std::hash::Hash;

use ahash::AHashMap;

use super::{same_entries, ClassicCounter, Counter};
use crate::math::log_add;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Override {
    Set(f64),
    Removed,
}

/// A counter that reads through to a borrowed base and records its own
/// edits as sparse overrides.
///
/// The base is never copied or modified, so trying out a handful of edits
/// on a large counter costs only the edits.  Every read consults the
/// overrides first and falls back to the base.
///
/// # Example
/// ```
/// use tally::counter::{ClassicCounter, Counter, DeltaCounter};
///
/// let base: ClassicCounter<&str> = ["a", "a", "b"].into_iter().collect();
/// let mut what_if = DeltaCounter::new(&base);
/// what_if.increment("b");
/// what_if.remove(&"a");
/// assert_eq!(what_if.total_count(), 2.0);
/// assert_eq!(base.total_count(), 3.0);
/// ```
pub struct DeltaCounter<'a, K, C> {
    base: &'a C,
    overrides: AHashMap<K, Override>,
    total: f64,
    size: usize,
    default_value: f64,
}

/// Edits detached from a [`DeltaCounter`], ready to be replayed onto a
/// counter that is no longer borrowed.
#[derive(Debug, Clone)]
pub struct Changes<K> {
    edits: Vec<(K, Option<f64>)>,
}

impl<K: Hash + Eq + Clone> Changes<K> {
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Replays the edits: sets become `set_count`, removals `remove`.
    pub fn apply_to<T: Counter<K>>(self, target: &mut T) {
        for (key, edit) in self.edits {
            match edit {
                Some(v) => target.set_count(key, v),
                None => {
                    target.remove(&key);
                }
            }
        }
    }
}

impl<'a, K, C> DeltaCounter<'a, K, C>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    /// Starts with no overrides; inherits the base's default value.
    pub fn new(base: &'a C) -> Self {
        DeltaCounter {
            base,
            overrides: AHashMap::new(),
            total: base.total_count(),
            size: base.size(),
            default_value: base.default_value(),
        }
    }

    pub fn base(&self) -> &'a C {
        self.base
    }

    /// Number of keys whose value differs from the base (including
    /// removals).
    pub fn overrides_len(&self) -> usize {
        self.overrides.len()
    }

    /// Drops every override, returning to the base's view.
    pub fn reset(&mut self) {
        self.overrides.clear();
        self.total = self.base.total_count();
        self.size = self.base.size();
    }

    /// Stored value for `key`, or `None` if absent in this view.
    fn stored(&self, key: &K) -> Option<f64> {
        match self.overrides.get(key) {
            Some(Override::Set(v)) => Some(*v),
            Some(Override::Removed) => None,
            None if self.base.contains_key(key) => Some(self.base.get_count(key)),
            None => None,
        }
    }

    fn store(&mut self, key: K, old: Option<f64>, value: f64) {
        self.total += value - old.unwrap_or(0.0);
        if old.is_none() {
            self.size += 1;
        }
        self.overrides.insert(key, Override::Set(value));
    }

    /// Materializes this view as an independent counter.
    pub fn to_classic(&self) -> ClassicCounter<K> {
        ClassicCounter::from_counter(self)
    }

    /// Releases the base borrow, keeping only the edits.
    pub fn into_changes(self) -> Changes<K> {
        let edits = self
            .overrides
            .into_iter()
            .map(|(k, o)| match o {
                Override::Set(v) => (k, Some(v)),
                Override::Removed => (k, None),
            })
            .collect();
        Changes { edits }
    }
}

impl<'a, K, C> Counter<K> for DeltaCounter<'a, K, C>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    fn get_count(&self, key: &K) -> f64 {
        self.stored(key).unwrap_or(self.default_value)
    }

    fn set_count(&mut self, key: K, value: f64) {
        let old = self.stored(&key);
        self.store(key, old, value);
    }

    fn increment_count(&mut self, key: K, delta: f64) -> f64 {
        let old = self.stored(&key);
        let new = old.unwrap_or(0.0) + delta;
        self.store(key, old, new);
        new
    }

    fn log_increment_count(&mut self, key: K, log_delta: f64) -> f64 {
        let old = self.stored(&key);
        let new = match old {
            Some(v) => log_add(log_delta, v),
            None => log_delta,
        };
        self.store(key, old, new);
        new
    }

    fn remove(&mut self, key: &K) -> f64 {
        let Some(old) = self.stored(key) else {
            return self.default_value;
        };
        self.total -= old;
        self.size -= 1;
        if self.base.contains_key(key) {
            self.overrides.insert(key.clone(), Override::Removed);
        } else {
            self.overrides.remove(key);
        }
        old
    }

    fn contains_key(&self, key: &K) -> bool {
        self.stored(key).is_some()
    }

    fn for_each_entry<F: FnMut(&K, f64)>(&self, mut f: F) {
        let overrides = &self.overrides;
        self.base.for_each_entry(|k, v| match overrides.get(k) {
            None => f(k, v),
            Some(Override::Set(x)) => f(k, *x),
            Some(Override::Removed) => {}
        });
        for (k, o) in overrides.iter() {
            if let Override::Set(x) = o {
                if !self.base.contains_key(k) {
                    f(k, *x);
                }
            }
        }
    }

    fn transform_values<F: FnMut(&K, f64) -> f64>(&mut self, mut f: F) {
        for (key, value) in self.entries() {
            let new = f(&key, value);
            self.store(key, Some(value), new);
        }
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.overrides.clear();
        let overrides = &mut self.overrides;
        self.base.for_each_entry(|k, _| {
            overrides.insert(k.clone(), Override::Removed);
        });
        self.total = 0.0;
        self.size = 0;
    }

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

impl<'a, K, C> PartialEq for DeltaCounter<'a, K, C>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    fn eq(&self, other: &Self) -> bool {
        same_entries(self, other)
    }
}

impl<'a, K, C> fmt::Debug for DeltaCounter<'a, K, C>
where
    K: fmt::Debug + Hash + Eq + Clone,
    C: Counter<K>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ClassicCounter<&'static str> {
        let mut c = ClassicCounter::new();
        c.set_count("a", 3.0);
        c.set_count("b", 2.0);
        c
    }

    #[test]
    fn reads_through_to_base() {
        let b = base();
        let d = DeltaCounter::new(&b);
        assert_eq!(d.get_count(&"a"), 3.0);
        assert_eq!(d.total_count(), 5.0);
        assert_eq!(d.size(), 2);
        assert_eq!(d.overrides_len(), 0);
    }

    #[test]
    fn edits_do_not_touch_base() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.increment_count("a", 1.0);
        d.set_count("c", 10.0);
        d.remove(&"b");
        assert_eq!(d.get_count(&"a"), 4.0);
        assert_eq!(d.get_count(&"c"), 10.0);
        assert!(!d.contains_key(&"b"));
        assert_eq!(d.total_count(), 14.0);
        assert_eq!(d.size(), 2);
        assert_eq!(b.total_count(), 5.0, "base must stay untouched");
        assert_eq!(b.get_count(&"b"), 2.0);
    }

    #[test]
    fn removing_an_added_key_drops_its_override() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.set_count("z", 1.0);
        assert_eq!(d.remove(&"z"), 1.0);
        assert_eq!(d.overrides_len(), 0);
        assert_eq!(d.remove(&"z"), 0.0, "absent key returns the default");
        assert_eq!(d.total_count(), 5.0);
    }

    #[test]
    fn iteration_merges_base_and_overrides() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.remove(&"a");
        d.set_count("b", 7.0);
        d.set_count("c", 1.0);
        let mut seen = d.entries();
        seen.sort_by(|x, y| x.0.cmp(y.0));
        assert_eq!(seen, vec![("b", 7.0), ("c", 1.0)]);
        let mut sum = 0.0;
        d.for_each_entry(|_, v| sum += v);
        assert_eq!(sum, d.total_count());
    }

    #[test]
    fn clear_then_reinsert() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.clear();
        assert!(d.is_empty());
        assert_eq!(d.total_count(), 0.0);
        assert_eq!(d.get_count(&"a"), 0.0);
        assert_eq!(d.increment_count("a", 2.0), 2.0, "cleared key counts from zero");
        assert_eq!(d.total_count(), 2.0);
    }

    #[test]
    fn transform_values_keeps_total() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.transform_values(|_, v| v * 10.0);
        assert_eq!(d.total_count(), 50.0);
        assert_eq!(d.get_count(&"b"), 20.0);
    }

    #[test]
    fn changes_replay_onto_a_copy() {
        let mut b = base();
        let changes = {
            let mut d = DeltaCounter::new(&b);
            d.increment("a");
            d.remove(&"b");
            d.set_count("c", 0.5);
            assert_eq!(d.to_classic().total_count(), 4.5);
            d.into_changes()
        };
        assert_eq!(changes.len(), 3);
        changes.apply_to(&mut b);
        assert_eq!(b.get_count(&"a"), 4.0);
        assert!(!b.contains_key(&"b"));
        assert_eq!(b.total_count(), 4.5);
    }

    #[test]
    fn reset_discards_edits() {
        let b = base();
        let mut d = DeltaCounter::new(&b);
        d.set_count("a", 0.0);
        d.reset();
        assert_eq!(d, DeltaCounter::new(&b));
    }
}
