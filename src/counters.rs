//! Free-standing operations over any [`Counter`] backend.
//!
//! Everything here is generic over `C: Counter<K>` so each call is
//! monomorphised for the backend in use.  Functions that build a new
//! counter return a [`ClassicCounter`]; `*_in_place` functions mutate their
//! first argument.
//!
//! On a [`ConcurrentCounter`](crate::counter::ConcurrentCounter) these are
//! sequences of single-key operations, not one atomic step.

use std::hash::Hash;

use rand::Rng;

use crate::counter::{ClassicCounter, Counter};
use crate::math::{self, log2_ratio};

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Counts each item once.
pub fn as_counter<K, I>(items: I) -> ClassicCounter<K>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    items.into_iter().collect()
}

/// `c1·w1 + c2·w2` over the union of keys.
pub fn linear_combination<K, A, B>(c1: &A, w1: f64, c2: &B, w2: f64) -> ClassicCounter<K>
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let mut result = ClassicCounter::with_capacity(c1.size().max(c2.size()));
    c1.for_each_entry(|k, v| result.set_count(k.clone(), v * w1));
    c2.for_each_entry(|k, v| {
        result.increment_count(k.clone(), v * w2);
    });
    result
}

/// Element-wise mean of two counters; a key missing from one side counts
/// as 0 there.
pub fn average<K, A, B>(c1: &A, c2: &B) -> ClassicCounter<K>
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    linear_combination(c1, 0.5, c2, 0.5)
}

/// A copy of `c` with every value multiplied by `factor`.
pub fn scale<K, C>(c: &C, factor: f64) -> ClassicCounter<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut result = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| result.set_count(k.clone(), v * factor));
    result
}

/// A copy of `c` scaled to sum to 1 (unchanged if the total is 0).
pub fn as_normalized<K, C>(c: &C) -> ClassicCounter<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let total = c.total_count();
    if total == 0.0 {
        return ClassicCounter::from_counter(c);
    }
    scale(c, 1.0 / total)
}

// ---------------------------------------------------------------------------
// In-place arithmetic
// ---------------------------------------------------------------------------

pub fn add_in_place<K, T, A>(target: &mut T, arg: &A)
where
    K: Hash + Eq + Clone,
    T: Counter<K>,
    A: Counter<K>,
{
    add_scaled_in_place(target, arg, 1.0);
}

/// `target += arg · scale`, key by key.
pub fn add_scaled_in_place<K, T, A>(target: &mut T, arg: &A, scale: f64)
where
    K: Hash + Eq + Clone,
    T: Counter<K>,
    A: Counter<K>,
{
    arg.for_each_entry(|k, v| {
        target.increment_count(k.clone(), v * scale);
    });
}

pub fn subtract_in_place<K, T, A>(target: &mut T, arg: &A)
where
    K: Hash + Eq + Clone,
    T: Counter<K>,
    A: Counter<K>,
{
    add_scaled_in_place(target, arg, -1.0);
}

pub fn multiply_in_place<K, C>(target: &mut C, factor: f64)
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    target.transform_values(|_, v| v * factor);
}

pub fn divide_in_place<K, C>(target: &mut C, divisor: f64)
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    target.transform_values(|_, v| v / divisor);
}

/// Scales `target` to sum to 1.  A zero total leaves it untouched.
pub fn normalize<K, C>(target: &mut C)
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let total = target.total_count();
    if total != 0.0 {
        divide_in_place(target, total);
    }
}

/// Treats values as natural logs and shifts them so that `Σ e^v == 1`.
pub fn log_normalize_in_place<K, C>(target: &mut C)
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let log_total = log_sum(target);
    target.transform_values(|_, v| v - log_total);
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Largest value; `-∞` for an empty counter.
pub fn max<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut m = f64::NEG_INFINITY;
    c.for_each_entry(|_, v| m = m.max(v));
    m
}

/// Smallest value; `+∞` for an empty counter.
pub fn min<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut m = f64::INFINITY;
    c.for_each_entry(|_, v| m = m.min(v));
    m
}

fn best_by<K, C, F>(c: &C, better: F) -> Option<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(K, f64)> = None;
    c.for_each_entry(|k, v| {
        if best.as_ref().map_or(true, |(_, b)| better(v, *b)) {
            best = Some((k.clone(), v));
        }
    });
    best.map(|(k, _)| k)
}

/// Key with the largest value; ties go to the first key seen.
pub fn argmax<K, C>(c: &C) -> Option<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    best_by(c, |v, b| v > b)
}

/// Key with the smallest value; ties go to the first key seen.
pub fn argmin<K, C>(c: &C) -> Option<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    best_by(c, |v, b| v < b)
}

/// Mean of the stored values (NaN for an empty counter).
pub fn mean<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    c.total_count() / c.size() as f64
}

/// `ln Σ e^v` over the stored values.
pub fn log_sum<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut values = Vec::with_capacity(c.size());
    c.for_each_entry(|_, v| values.push(v));
    math::log_sum(&values)
}

pub fn l1_norm<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut sum = 0.0;
    c.for_each_entry(|_, v| sum += v.abs());
    sum
}

pub fn l2_norm<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut sum = 0.0;
    c.for_each_entry(|_, v| sum += v * v);
    sum.sqrt()
}

/// `Σ c1(k)·c2(k)` over keys present in both.
pub fn dot_product<K, A, B>(c1: &A, c2: &B) -> f64
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    fn sparse_dot<K, S, L>(small: &S, large: &L) -> f64
    where
        K: Hash + Eq + Clone,
        S: Counter<K>,
        L: Counter<K>,
    {
        let mut dot = 0.0;
        small.for_each_entry(|k, v| {
            if v != 0.0 && large.contains_key(k) {
                dot += v * large.get_count(k);
            }
        });
        dot
    }
    if c1.size() <= c2.size() {
        sparse_dot(c1, c2)
    } else {
        sparse_dot(c2, c1)
    }
}

/// Entries sorted by value, highest first.
pub fn to_sorted_list<K, C>(c: &C) -> Vec<(K, f64)>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut entries = c.entries();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries
}

/// True if every key of either counter has values within `tolerance`.
/// Absent keys read as each counter's default value.
pub fn equals_within<K, A, B>(a: &A, b: &B, tolerance: f64) -> bool
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let mut equal = true;
    a.for_each_entry(|k, v| {
        if equal && !((v - b.get_count(k)).abs() <= tolerance) {
            equal = false;
        }
    });
    b.for_each_entry(|k, v| {
        if equal && !a.contains_key(k) && !((v - a.get_count(k)).abs() <= tolerance) {
            equal = false;
        }
    });
    equal
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// Keeps only the `n` highest-valued entries.
pub fn retain_top<K, C>(c: &mut C, n: usize)
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    if c.size() <= n {
        return;
    }
    let sorted = to_sorted_list(c);
    for (k, _) in &sorted[n..] {
        c.remove(k);
    }
}

/// Removes entries below `threshold` and returns their keys.
pub fn retain_above<K, C>(c: &mut C, threshold: f64) -> Vec<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let mut removed = Vec::new();
    c.for_each_entry(|k, v| {
        if v < threshold {
            removed.push(k.clone());
        }
    });
    for k in &removed {
        c.remove(k);
    }
    removed
}

// ---------------------------------------------------------------------------
// Information theory (log base 2)
// ---------------------------------------------------------------------------

/// Shannon entropy of the normalized counter, in bits.
pub fn entropy<K, C>(c: &C) -> f64
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let total = c.total_count();
    let mut h = 0.0;
    c.for_each_entry(|_, v| {
        if v != 0.0 {
            let p = v / total;
            h -= p * p.log2();
        }
    });
    h
}

/// `H(from, to) = −Σ p_from·log2 p_to` after normalizing both; `+∞` if
/// `to` is zero where `from` is positive.
pub fn cross_entropy<K, A, B>(from: &A, to: &B) -> f64
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let total_from = from.total_count();
    let total_to = to.total_count();
    let mut h = 0.0;
    from.for_each_entry(|k, v| {
        if v != 0.0 {
            let q = to.get_count(k) / total_to;
            h -= (v / total_from) * q.log2();
        }
    });
    h
}

/// `KL(from ‖ to)` in bits over the normalized counters.
///
/// Returns `+∞` as soon as `to` assigns zero to a key `from` holds.
pub fn kl_divergence<K, A, B>(from: &A, to: &B) -> f64
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let total_from = from.total_count();
    let total_to = to.total_count();
    let mut result = 0.0;
    from.for_each_entry(|k, v| {
        if v == 0.0 || result == f64::INFINITY {
            return;
        }
        let p = v / total_from;
        let q = to.get_count(k) / total_to;
        if q == 0.0 {
            result = f64::INFINITY;
        } else {
            result += p * log2_ratio(p, q);
        }
    });
    result
}

/// Mean of each side's KL divergence to their average, in bits.
pub fn jensen_shannon_divergence<K, A, B>(c1: &A, c2: &B) -> f64
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let d1 = as_normalized(c1);
    let d2 = as_normalized(c2);
    let mid = average(&d1, &d2);
    (kl_divergence(&d1, &mid) + kl_divergence(&d2, &mid)) / 2.0
}

/// `KL(c1 ‖ skew·c2 + (1−skew)·c1)` over the normalized counters.
pub fn skew_divergence<K, A, B>(c1: &A, c2: &B, skew: f64) -> f64
where
    K: Hash + Eq + Clone,
    A: Counter<K>,
    B: Counter<K>,
{
    let d1 = as_normalized(c1);
    let d2 = as_normalized(c2);
    let mixed = linear_combination(&d2, skew, &d1, 1.0 - skew);
    kl_divergence(&d1, &mixed)
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

/// Draws a key with probability proportional to its value.
///
/// Non-positive values are never drawn; `None` if no value is positive.
pub fn sample<K, C, R>(c: &C, rng: &mut R) -> Option<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
    R: Rng + ?Sized,
{
    let mut total = 0.0;
    c.for_each_entry(|_, v| {
        if v > 0.0 {
            total += v;
        }
    });
    if !(total > 0.0) {
        return None;
    }
    let target = rng.gen::<f64>() * total;
    let mut cumulative = 0.0;
    let mut picked: Option<K> = None;
    let mut last_positive: Option<&K> = None;
    // Entries are visited once; the last positive key covers rounding
    // shortfall at the top of the range.
    let entries = c.entries();
    for (k, v) in &entries {
        if *v <= 0.0 {
            continue;
        }
        cumulative += v;
        last_positive = Some(k);
        if cumulative > target {
            picked = Some(k.clone());
            break;
        }
    }
    picked.or_else(|| last_positive.cloned())
}
