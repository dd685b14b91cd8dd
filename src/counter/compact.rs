use std::fmt;
use std::hash::Hash;

use ahash::RandomState;

use super::{same_entries, Counter, EntriesMut};
use crate::math::log_add;

/// Smallest table; keeps the index mask meaningful.
const MIN_SLOTS: usize = 8;

/// Open-addressed counter with linear scanning.
///
/// Keys and values live in two flat arrays whose length is always a power
/// of two, so a lookup step is a mask and an increment.  The table grows by
/// doubling once it is three quarters full.  Removal uses backward-shift
/// deletion, so there are no tombstones and lookups never scan dead slots.
///
/// Trades the per-entry allocation and bucket overhead of a general hash
/// map for density; lookups and iteration touch contiguous memory.
pub struct CompactCounter<K> {
    keys: Vec<Option<K>>,
    values: Vec<f64>,
    /// Always `keys.len() - 1`.
    mask: usize,
    len: usize,
    total: f64,
    default_value: f64,
    build_hasher: RandomState,
}

impl<K: Hash + Eq + Clone> CompactCounter<K> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a counter that can hold `capacity` keys without growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = (capacity * 4 / 3 + 1).next_power_of_two().max(MIN_SLOTS);
        CompactCounter {
            keys: (0..slots).map(|_| None).collect(),
            values: vec![0.0; slots],
            mask: slots - 1,
            len: 0,
            total: 0.0,
            default_value: 0.0,
            build_hasher: RandomState::new(),
        }
    }

    /// Number of slots in the table (a power of two).
    pub fn slot_count(&self) -> usize {
        self.keys.len()
    }

    /// Iterates over `(key, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> + '_ {
        self.keys
            .iter()
            .zip(self.values.iter())
            .filter_map(|(k, v)| k.as_ref().map(|k| (k, *v)))
    }

    /// Returns write-through handles over every entry.
    pub fn entries_mut(
        &mut self,
    ) -> EntriesMut<'_, impl Iterator<Item = (&K, &mut f64)> + '_> {
        let inner = self
            .keys
            .iter()
            .zip(self.values.iter_mut())
            .filter_map(|(k, v)| k.as_ref().map(|k| (k, v)));
        EntriesMut::new(inner, &mut self.total)
    }

    // -----------------------------------------------------------------------
    // Slot search
    // -----------------------------------------------------------------------

    #[inline]
    fn home_slot(&self, key: &K) -> usize {
        let h = self.build_hasher.hash_one(key);
        ((h ^ (h >> 32)) as usize) & self.mask
    }

    /// `Ok(slot)` holding `key`, or `Err(slot)` of the empty slot that ends
    /// its search sequence.
    #[inline]
    fn find(&self, key: &K) -> Result<usize, usize> {
        let mut i = self.home_slot(key);
        loop {
            match &self.keys[i] {
                None => return Err(i),
                Some(k) if k == key => return Ok(i),
                Some(_) => i = (i + 1) & self.mask,
            }
        }
    }

    /// Returns the slot for `key`, inserting it with value `0.0` if absent.
    fn slot_or_insert(&mut self, key: K) -> usize {
        match self.find(&key) {
            Ok(i) => i,
            Err(mut i) => {
                if (self.len + 1) * 4 > self.keys.len() * 3 {
                    self.grow();
                    i = match self.find(&key) {
                        Ok(i) | Err(i) => i,
                    };
                }
                self.keys[i] = Some(key);
                self.values[i] = 0.0;
                self.len += 1;
                i
            }
        }
    }

    fn grow(&mut self) {
        let slots = self.keys.len() * 2;
        let old_keys = std::mem::replace(&mut self.keys, (0..slots).map(|_| None).collect());
        let old_values = std::mem::replace(&mut self.values, vec![0.0; slots]);
        self.mask = slots - 1;
        for (k, v) in old_keys.into_iter().zip(old_values) {
            if let Some(k) = k {
                let i = match self.find(&k) {
                    Ok(i) | Err(i) => i,
                };
                self.keys[i] = Some(k);
                self.values[i] = v;
            }
        }
    }

    /// Empties `hole` and shifts later members of its cluster back so every
    /// remaining key stays reachable from its home slot.
    fn delete_slot(&mut self, mut hole: usize) {
        self.keys[hole] = None;
        self.len -= 1;
        let mut j = hole;
        loop {
            j = (j + 1) & self.mask;
            let home = match &self.keys[j] {
                None => break,
                Some(k) => self.home_slot(k),
            };
            // Movable iff `hole` lies on the search path from `home` to `j`.
            if (j.wrapping_sub(home) & self.mask) >= (j.wrapping_sub(hole) & self.mask) {
                self.keys[hole] = self.keys[j].take();
                self.values[hole] = self.values[j];
                hole = j;
            }
        }
    }
}

impl<K: Hash + Eq + Clone> Default for CompactCounter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone> Clone for CompactCounter<K> {
    fn clone(&self) -> Self {
        CompactCounter {
            keys: self.keys.clone(),
            values: self.values.clone(),
            mask: self.mask,
            len: self.len,
            total: self.total,
            default_value: self.default_value,
            build_hasher: self.build_hasher.clone(),
        }
    }
}

impl<K: Hash + Eq + Clone> Counter<K> for CompactCounter<K> {
    #[inline]
    fn get_count(&self, key: &K) -> f64 {
        match self.find(key) {
            Ok(i) => self.values[i],
            Err(_) => self.default_value,
        }
    }

    fn set_count(&mut self, key: K, value: f64) {
        let i = self.slot_or_insert(key);
        self.total += value - self.values[i];
        self.values[i] = value;
    }

    fn increment_count(&mut self, key: K, delta: f64) -> f64 {
        let i = self.slot_or_insert(key);
        self.values[i] += delta;
        self.total += delta;
        self.values[i]
    }

    fn log_increment_count(&mut self, key: K, log_delta: f64) -> f64 {
        let (i, new) = match self.find(&key) {
            Ok(i) => (i, log_add(log_delta, self.values[i])),
            Err(_) => (self.slot_or_insert(key), log_delta),
        };
        self.total += new - self.values[i];
        self.values[i] = new;
        new
    }

    fn remove(&mut self, key: &K) -> f64 {
        match self.find(key) {
            Ok(i) => {
                let v = self.values[i];
                self.total -= v;
                self.delete_slot(i);
                v
            }
            Err(_) => self.default_value,
        }
    }

    #[inline]
    fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_ok()
    }

    fn for_each_entry<F: FnMut(&K, f64)>(&self, mut f: F) {
        for (k, v) in self.iter() {
            f(k, v);
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
        self.len
    }

    fn clear(&mut self) {
        for k in self.keys.iter_mut() {
            *k = None;
        }
        self.values.fill(0.0);
        self.len = 0;
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

impl<K: Hash + Eq + Clone> PartialEq for CompactCounter<K> {
    fn eq(&self, other: &Self) -> bool {
        same_entries(self, other)
    }
}

impl<K: fmt::Debug + Hash + Eq + Clone> fmt::Debug for CompactCounter<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
