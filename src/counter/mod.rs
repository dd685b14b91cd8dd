//! Sparse numeric accumulators with an always-exact running total.
//!
//! Every backend keeps `total_count() == Σ stored values` at every
//! observable point: each mutation that changes a value adjusts the cached
//! total by the delta in the same step.  Absent keys read as the configured
//! default value, which is never part of the total or of iteration.
//!
//! | Backend               | Storage                          | Use when |
//! |-----------------------|----------------------------------|----------|
//! | [`ClassicCounter`]    | `AHashMap<K, f64>`               | General purpose |
//! | [`CompactCounter`]    | open-addressed, linear scanning  | Many small counters; memory density |
//! | [`ConcurrentCounter`] | sharded `RwLock` maps            | Shared tallies across threads |
//! | [`DeltaCounter`]      | base reference + sparse overrides | Cheap what-if edits of a large counter |
//!
//! Generic helpers in [`crate::counters`] take `C: Counter<K>` so the hot
//! loops are monomorphised per backend.

pub mod classic;
pub mod compact;
pub mod concurrent;
pub mod delta;
pub mod text;

use std::hash::Hash;

pub use classic::ClassicCounter;
pub use compact::CompactCounter;
pub use concurrent::ConcurrentCounter;
pub use delta::{Changes, DeltaCounter};

/// Absolute tolerance applied to totals when comparing counters.
///
/// Running totals accumulate in mutation order, so two counters holding the
/// same entries may differ in the last bits of their totals.
pub const TOTAL_TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Counter trait
// ---------------------------------------------------------------------------

/// The capability set shared by every counter backend.
pub trait Counter<K: Hash + Eq + Clone> {
    /// Returns the stored value for `key`, or the default value if absent.
    fn get_count(&self, key: &K) -> f64;

    /// Inserts or replaces the value for `key`.
    fn set_count(&mut self, key: K, value: f64);

    /// Adds `delta` to the value for `key` and returns the new value.
    ///
    /// An absent key counts as `0.0` whatever the default value is.
    fn increment_count(&mut self, key: K, delta: f64) -> f64;

    /// Treats values as logs and stores `ln(e^old + e^log_delta)`.
    ///
    /// An absent key counts as `-∞`, so the new value is exactly
    /// `log_delta`.
    fn log_increment_count(&mut self, key: K, log_delta: f64) -> f64;

    /// Removes `key`, returning its value or the default if it was absent.
    fn remove(&mut self, key: &K) -> f64;

    fn contains_key(&self, key: &K) -> bool;

    /// Calls `f` once per explicit entry, in unspecified order.
    fn for_each_entry<F: FnMut(&K, f64)>(&self, f: F);

    /// Replaces every stored value with `f(key, value)`, keeping the total
    /// in step.
    fn transform_values<F: FnMut(&K, f64) -> f64>(&mut self, f: F);

    /// Number of explicit entries.
    fn size(&self) -> usize;

    /// Removes every entry and resets the total to zero.
    fn clear(&mut self);

    /// Sum of all explicit values.
    fn total_count(&self) -> f64;

    fn default_value(&self) -> f64;

    fn set_default_value(&mut self, value: f64);

    // -----------------------------------------------------------------------
    // Provided
    // -----------------------------------------------------------------------

    #[inline]
    fn increment(&mut self, key: K) -> f64 {
        self.increment_count(key, 1.0)
    }

    #[inline]
    fn decrement_count(&mut self, key: K, delta: f64) -> f64 {
        self.increment_count(key, -delta)
    }

    #[inline]
    fn decrement(&mut self, key: K) -> f64 {
        self.increment_count(key, -1.0)
    }

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Returns the explicit keys, in unspecified order.
    fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.size());
        self.for_each_entry(|k, _| keys.push(k.clone()));
        keys
    }

    /// Returns a snapshot of the explicit `(key, value)` pairs.
    fn entries(&self) -> Vec<(K, f64)> {
        let mut entries = Vec::with_capacity(self.size());
        self.for_each_entry(|k, v| entries.push((k.clone(), v)));
        entries
    }

    /// Adds every non-zero entry of `other` into `self`.
    fn add_all<C: Counter<K>>(&mut self, other: &C)
    where
        Self: Sized,
    {
        for (key, value) in other.entries() {
            if value != 0.0 {
                self.increment_count(key, value);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Write-through entry handles
// ---------------------------------------------------------------------------

/// A mutable view of one entry that keeps its counter's total exact.
///
/// Obtained from [`EntriesMut::next_entry`].  The borrow of the counter
/// lasts as long as the handle, so no insert or remove can happen while a
/// handle is alive.
pub struct EntryMut<'e, K> {
    key: &'e K,
    value: &'e mut f64,
    total: &'e mut f64,
}

impl<'e, K> EntryMut<'e, K> {
    #[inline]
    pub fn key(&self) -> &K {
        self.key
    }

    #[inline]
    pub fn value(&self) -> f64 {
        *self.value
    }

    /// Stores `value`, adjusts the total by the delta, and returns the old
    /// value.
    #[inline]
    pub fn set_value(&mut self, value: f64) -> f64 {
        let old = *self.value;
        *self.value = value;
        *self.total += value - old;
        old
    }
}

/// Lending iterator over write-through entry handles.
///
/// ```
/// use tally::counter::{ClassicCounter, Counter};
///
/// let mut c = ClassicCounter::new();
/// c.set_count("a", 1.0);
/// c.set_count("b", 3.0);
/// let mut entries = c.entries_mut();
/// while let Some(mut e) = entries.next_entry() {
///     let v = e.value();
///     e.set_value(v * 2.0);
/// }
/// assert_eq!(c.total_count(), 8.0);
/// ```
pub struct EntriesMut<'a, I> {
    inner: I,
    total: &'a mut f64,
}

impl<'a, I> EntriesMut<'a, I> {
    pub(crate) fn new(inner: I, total: &'a mut f64) -> Self {
        EntriesMut { inner, total }
    }
}

impl<'a, K: 'a, I> EntriesMut<'a, I>
where
    I: Iterator<Item = (&'a K, &'a mut f64)>,
{
    /// Returns the next entry handle, or `None` when exhausted.
    pub fn next_entry(&mut self) -> Option<EntryMut<'_, K>> {
        let (key, value) = self.inner.next()?;
        Some(EntryMut {
            key,
            value,
            total: &mut *self.total,
        })
    }
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

/// Explicit-entry equality shared by the `PartialEq` impls.
///
/// Totals may differ by [`TOTAL_TOLERANCE`]; keys and values must match
/// exactly.  A key stored at the default value is not the same as an absent
/// key.
pub(crate) fn same_entries<K, A, B>(a: &A, b: &B) -> bool
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    if a.size() != b.size() {
        return false;
    }
    if (a.total_count() - b.total_count()).abs() > TOTAL_TOLERANCE {
        return false;
    }
    let mut equal = true;
    a.for_each_entry(|k, v| {
        if equal && (!b.contains_key(k) || b.get_count(k) != v) {
            equal = false;
        }
    });
    equal
}
