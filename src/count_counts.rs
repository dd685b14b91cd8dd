//! Frequency-of-frequencies tables.
//!
//! For an integer-valued counter, `n_r` is the number of distinct keys whose
//! count is `r`.  Counts are rounded to the nearest integer first; keys that
//! round to zero are left out, so every stored `r` and `n_r` is positive.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::counter::{ClassicCounter, Counter};
use crate::error::{Error, Result};

/// Rounds a non-negative count to its frequency bucket.
#[inline]
pub(crate) fn frequency_of(count: f64) -> u64 {
    count.round() as u64
}

/// Rejects negative (or NaN) counts.
pub(crate) fn check_non_negative<K, C>(counter: &C) -> Result<()>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let mut bad = None;
    counter.for_each_entry(|k, v| {
        if bad.is_none() && !(v >= 0.0) {
            bad = Some(Error::NegativeCount {
                key: format!("{k:?}"),
                count: v,
            });
        }
    });
    match bad {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Ordered map from frequency `r` to count-of-counts `n_r`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountCounts {
    buckets: BTreeMap<u64, u64>,
}

impl CountCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from `counter`, rejecting negative counts.
    pub fn from_counter<K, C>(counter: &C) -> Result<Self>
    where
        K: Hash + Eq + Clone + Debug,
        C: Counter<K>,
    {
        check_non_negative(counter)?;
        let mut cc = CountCounts::new();
        counter.for_each_entry(|_, v| cc.record(frequency_of(v)));
        Ok(cc)
    }

    /// Counts one more key at frequency `r`.  Zero is ignored.
    pub fn record(&mut self, r: u64) {
        if r > 0 {
            *self.buckets.entry(r).or_insert(0) += 1;
        }
    }

    /// `n_r`, or 0 if no key has frequency `r`.
    pub fn get(&self, r: u64) -> u64 {
        self.buckets.get(&r).copied().unwrap_or(0)
    }

    /// Number of distinct frequencies.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `(r, n_r)` pairs in ascending `r`.
    pub fn iter(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.buckets.iter().map(|(r, n)| (*r, *n))
    }

    /// Number of keys with a positive frequency, `Σ n_r`.
    pub fn observed(&self) -> u64 {
        self.buckets.values().sum()
    }

    /// Total observed mass, `N = Σ r·n_r`, in `f64` so huge frequencies
    /// cannot overflow.
    pub fn total_mass(&self) -> f64 {
        self.iter().map(|(r, n)| r as f64 * n as f64).sum()
    }

    /// Parallel `r` and `n` arrays in ascending `r`.
    pub fn to_arrays(&self) -> (Vec<u64>, Vec<u64>) {
        self.iter().unzip()
    }

    /// Dense `[n_0, n_1, …, n_max]`; index 0 is always 0.
    pub fn up_to(&self, max: u64) -> Vec<u64> {
        (0..=max).map(|r| self.get(r)).collect()
    }

    /// The table as a counter keyed by frequency.
    pub fn as_counter(&self) -> ClassicCounter<u64> {
        let mut c = ClassicCounter::with_capacity(self.len());
        for (r, n) in self.iter() {
            c.set_count(r, n as f64);
        }
        c
    }
}

impl FromIterator<(u64, u64)> for CountCounts {
    /// Collects `(r, n_r)` pairs; repeated frequencies add up.
    fn from_iter<I: IntoIterator<Item = (u64, u64)>>(iter: I) -> Self {
        let mut cc = CountCounts::new();
        for (r, n) in iter {
            if r > 0 && n > 0 {
                *cc.buckets.entry(r).or_insert(0) += n;
            }
        }
        cc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_rounded_counts() {
        let mut c = ClassicCounter::new();
        c.set_count("a", 1.0);
        c.set_count("b", 1.2);
        c.set_count("c", 2.6);
        c.set_count("d", 3.0);
        c.set_count("e", 0.4);
        let cc = CountCounts::from_counter(&c).unwrap();
        assert_eq!(cc.get(1), 2);
        assert_eq!(cc.get(3), 2);
        assert_eq!(cc.get(0), 0, "zero-rounded counts are unseen");
        assert_eq!(cc.len(), 2);
        assert_eq!(cc.observed(), 4);
        assert_eq!(cc.total_mass(), 8.0);
        assert_eq!(cc.to_arrays(), (vec![1, 3], vec![2, 2]));
        assert_eq!(cc.up_to(4), vec![0, 2, 0, 2, 0]);
    }

    #[test]
    fn rejects_negative_counts() {
        let mut c = ClassicCounter::new();
        c.set_count("a", 2.0);
        c.set_count("b", -1.0);
        let err = CountCounts::from_counter(&c).unwrap_err();
        assert!(matches!(err, Error::NegativeCount { count, .. } if count == -1.0));
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let mut c = ClassicCounter::new();
        c.set_count("a", 1.5e19);
        c.set_count("b", 1.5e19);
        let cc = CountCounts::from_counter(&c).unwrap();
        assert_eq!(cc.observed(), 2);
        assert!((cc.total_mass() / 3.0e19 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn as_counter_mirrors_table() {
        let cc: CountCounts = [(1, 10), (2, 6), (2, 1), (0, 4)].into_iter().collect();
        let c = cc.as_counter();
        assert_eq!(c.get_count(&2), 7.0);
        assert_eq!(c.total_count(), 17.0);
        assert!(!c.contains_key(&0));
    }
}
