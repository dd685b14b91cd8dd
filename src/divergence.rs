//! Divergences and mixtures over [`Distribution`]s.
//!
//! Unlike the counter versions in [`crate::counters`], these account for
//! the unlisted part of the universe: every key listed by neither side is
//! scored once per slot with both sides' unseen probabilities.  All logs
//! are base 2.

use std::hash::Hash;

use ahash::AHashSet;

use crate::counter::{ClassicCounter, Counter};
use crate::distribution::Distribution;
use crate::math::log2_ratio;
use crate::smoothing;

/// Keys listed by either side.
fn listed_union<K: Hash + Eq + Clone>(d1: &Distribution<K>, d2: &Distribution<K>) -> AHashSet<K> {
    let mut union = AHashSet::with_capacity(d1.explicit_size() + d2.explicit_size());
    d1.for_each_explicit(|k, _| {
        union.insert(k.clone());
    });
    d2.for_each_explicit(|k, _| {
        union.insert(k.clone());
    });
    union
}

/// Universe slots of `d` listed by neither side.
#[inline]
fn remaining_slots<K>(d: &Distribution<K>, listed: usize) -> usize
where
    K: Hash + Eq + Clone,
{
    d.number_of_keys().saturating_sub(listed)
}

#[inline]
fn kl_term(p: f64, q: f64) -> f64 {
    if p <= 0.0 {
        0.0
    } else if q <= 0.0 {
        f64::INFINITY
    } else {
        p * log2_ratio(p, q)
    }
}

/// `KL(from ‖ to)` in bits over the whole universe of `from`.
///
/// `+∞` if `to` gives zero probability to a key `from` does not.
pub fn kl_divergence<K: Hash + Eq + Clone>(from: &Distribution<K>, to: &Distribution<K>) -> f64 {
    let union = listed_union(from, to);
    let mut result = 0.0;
    for k in &union {
        result += kl_term(from.probability_of(k), to.probability_of(k));
        if result == f64::INFINITY {
            return result;
        }
    }
    let remaining = remaining_slots(from, union.len());
    if remaining > 0 {
        result += remaining as f64 * kl_term(from.unseen_probability(), to.unseen_probability());
    }
    result
}

/// `w1·d1 + (1 − w1)·d2` over the listed keys of both.  Mass the listed
/// keys do not cover is reserved for the rest of `d1`'s universe.
pub fn weighted_average<K: Hash + Eq + Clone>(
    d1: &Distribution<K>,
    w1: f64,
    d2: &Distribution<K>,
) -> Distribution<K> {
    let w2 = 1.0 - w1;
    let union = listed_union(d1, d2);
    let mut mixed = ClassicCounter::with_capacity(union.len());
    for k in union {
        let p = w1 * d1.probability_of(&k) + w2 * d2.probability_of(&k);
        mixed.set_count(k, p);
    }
    let number_of_keys = d1.number_of_keys().max(mixed.size());
    smoothing::from_partially_specified_counter(&mixed, number_of_keys)
}

/// Equal-weight mixture of `d1` and `d2`.
pub fn average<K: Hash + Eq + Clone>(d1: &Distribution<K>, d2: &Distribution<K>) -> Distribution<K> {
    weighted_average(d1, 0.5, d2)
}

/// Jensen-Shannon divergence in bits; symmetric and at most 1.
pub fn jensen_shannon_divergence<K: Hash + Eq + Clone>(
    d1: &Distribution<K>,
    d2: &Distribution<K>,
) -> f64 {
    let mid = average(d1, d2);
    (kl_divergence(d1, &mid) + kl_divergence(d2, &mid)) / 2.0
}

/// Same as [`jensen_shannon_divergence`].
pub fn information_radius<K: Hash + Eq + Clone>(d1: &Distribution<K>, d2: &Distribution<K>) -> f64 {
    jensen_shannon_divergence(d1, d2)
}

/// `KL(d1 ‖ skew·d2 + (1 − skew)·d1)`.  Finite for any `skew < 1`.
pub fn skew_divergence<K: Hash + Eq + Clone>(
    d1: &Distribution<K>,
    d2: &Distribution<K>,
    skew: f64,
) -> f64 {
    let mixed = weighted_average(d2, skew, d1);
    kl_divergence(d1, &mixed)
}

/// Shared mass, `Σ min(p1, p2)` over the universe of `d1`.  1 for equal
/// distributions, 0 for disjoint ones.
pub fn overlap<K: Hash + Eq + Clone>(d1: &Distribution<K>, d2: &Distribution<K>) -> f64 {
    let union = listed_union(d1, d2);
    let mut shared: f64 = union
        .iter()
        .map(|k| d1.probability_of(k).min(d2.probability_of(k)))
        .sum();
    let remaining = remaining_slots(d1, union.len());
    if remaining > 0 {
        shared += remaining as f64 * d1.unseen_probability().min(d2.unseen_probability());
    }
    shared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoothing::{from_counter, laplace};

    fn counts(pairs: &[(&'static str, f64)]) -> ClassicCounter<&'static str> {
        let mut c = ClassicCounter::new();
        for &(k, v) in pairs {
            c.set_count(k, v);
        }
        c
    }

    #[test]
    fn kl_of_identical_is_zero() {
        let d = laplace(&counts(&[("a", 3.0), ("b", 1.0)]), 5).unwrap();
        assert!(kl_divergence(&d, &d).abs() < 1e-12);
        assert!((overlap(&d, &d) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn kl_counts_unseen_slots() {
        // p = [1/2, 1/4, 1/8, 1/8], q = [1/4, 1/4, 1/4, 1/4]
        let p = smoothing::from_counter_with_reserved_mass(&counts(&[("a", 2.0), ("b", 1.0)]), 4, 0.25)
            .unwrap();
        let q = smoothing::from_counter_with_reserved_mass(&counts(&[("a", 1.0)]), 4, 0.75).unwrap();
        let expected = 0.5 * 1.0 + 0.25 * 0.0 + 2.0 * 0.125 * (-1.0);
        assert!((kl_divergence(&p, &q) - expected).abs() < 1e-12);
    }

    #[test]
    fn kl_is_infinite_when_support_is_missing() {
        let p = from_counter(&counts(&[("a", 1.0), ("b", 1.0)]));
        let q = from_counter(&counts(&[("a", 1.0)]));
        assert_eq!(kl_divergence(&p, &q), f64::INFINITY);
        assert!(kl_divergence(&q, &p).is_finite());
        assert!(skew_divergence(&p, &q, 0.99).is_finite());
    }

    #[test]
    fn jensen_shannon_bounds() {
        let p = from_counter(&counts(&[("a", 1.0)]));
        let q = from_counter(&counts(&[("b", 1.0)]));
        let js = jensen_shannon_divergence(&p, &q);
        assert!((js - 1.0).abs() < 1e-12, "disjoint point masses are one bit apart, got {js}");
        assert_eq!(js, information_radius(&q, &p));
        assert_eq!(overlap(&p, &q), 0.0);
    }

    #[test]
    fn averages_stay_normalized() {
        let p = laplace(&counts(&[("a", 3.0)]), 4).unwrap();
        let q = laplace(&counts(&[("b", 1.0), ("c", 1.0)]), 4).unwrap();
        let m = weighted_average(&p, 0.3, &q);
        assert_eq!(m.number_of_keys(), 4);
        let mut total = 0.0;
        for k in ["a", "b", "c", "d"] {
            total += m.probability_of(&k);
        }
        assert!((total - 1.0).abs() < 1e-12);
        let expected = 0.3 * p.probability_of(&"d") + 0.7 * q.probability_of(&"d");
        assert!((m.probability_of(&"d") - expected).abs() < 1e-12);
        let (avg, half) = (average(&p, &q), weighted_average(&p, 0.5, &q));
        for k in ["a", "b", "c", "d"] {
            assert!((avg.probability_of(&k) - half.probability_of(&k)).abs() < 1e-15);
        }
    }
}
