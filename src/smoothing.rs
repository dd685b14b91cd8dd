//! Factories that turn an empirical counter into a [`Distribution`].
//!
//! All factories are pure: the input counter is read once and never
//! modified.  Counts handed to the smoothing estimators (Laplace,
//! Good-Turing, Dirichlet, …) must be non-negative; a negative count is
//! rejected with [`Error::NegativeCount`] before anything is built.
//!
//! Frequency-based estimators round each count to the nearest integer.  A
//! key whose count rounds to zero is treated as unseen: it is not listed and
//! receives a share of the reserved mass.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use crate::count_counts::{check_non_negative, frequency_of, CountCounts};
use crate::counter::{ClassicCounter, Counter};
use crate::counters;
use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::sgt::{SgtConfig, SimpleGoodTuring};

/// Frequencies up to this value are adjusted by legacy Good-Turing.
const GOOD_TURING_MAX_FREQ: u64 = 10;
/// Fewest keys a frequency bucket needs for Good-Turing to trust it.
const GOOD_TURING_MIN_BUCKET: u64 = 3;
/// Pseudo-count used when Good-Turing falls back to Lidstone.
const FALLBACK_LAMBDA: f64 = 0.5;

fn check_parameter(name: &'static str, value: f64) -> Result<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

fn check_universe(number_of_keys: usize, observed: usize) -> Result<()> {
    if number_of_keys < observed {
        return Err(Error::UniverseTooSmall {
            number_of_keys,
            observed,
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Plain normalization
// ---------------------------------------------------------------------------

/// Every distinct key gets `1 / |keys|`; nothing is reserved.
pub fn uniform<K, I>(keys: I) -> Distribution<K>
where
    K: Hash + Eq + Clone,
    I: IntoIterator<Item = K>,
{
    let mut counter = ClassicCounter::new();
    for key in keys {
        counter.set_count(key, 1.0);
    }
    let n = counter.size();
    counters::divide_in_place(&mut counter, n as f64);
    Distribution::from_parts(counter, n, 0.0)
}

/// Divides every count by the total.  The universe is exactly the listed
/// keys.  A zero total leaves the values as they are.
pub fn from_counter<K, C>(c: &C) -> Distribution<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let counter = counters::as_normalized(c);
    let n = counter.size();
    Distribution::from_parts(counter, n, 0.0)
}

/// Normalizes the listed keys to `1 − reserved_mass` and reserves the rest
/// for the `number_of_keys − |c|` unlisted keys.
pub fn from_counter_with_reserved_mass<K, C>(
    c: &C,
    number_of_keys: usize,
    reserved_mass: f64,
) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    if !(0.0..=1.0).contains(&reserved_mass) {
        return Err(Error::InvalidParameter {
            name: "reserved_mass",
            value: reserved_mass,
        });
    }
    check_universe(number_of_keys, c.size())?;
    let mut counter = counters::as_normalized(c);
    counters::multiply_in_place(&mut counter, 1.0 - reserved_mass);
    Ok(Distribution::from_parts(counter, number_of_keys, reserved_mass))
}

/// Uses the counts as probabilities as they stand.
///
/// If they sum to at least 1 they are normalized and nothing is reserved;
/// otherwise the shortfall `1 − total` becomes the reserved mass.
pub fn from_partially_specified_counter<K, C>(c: &C, number_of_keys: usize) -> Distribution<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let total = c.total_count();
    if total >= 1.0 {
        Distribution::from_parts(counters::as_normalized(c), number_of_keys, 0.0)
    } else {
        Distribution::from_parts(ClassicCounter::from_counter(c), number_of_keys, 1.0 - total)
    }
}

/// Treats the values as natural logs: shifts by the maximum, exponentiates
/// and normalizes.
pub fn from_log_values<K, C>(c: &C) -> Distribution<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    let max = counters::max(c);
    let mut exp = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| exp.set_count(k.clone(), (v - max).exp()));
    from_counter(&exp)
}

/// Softmax over per-class scores of a multiclass logistic model.
pub fn from_logistic_scores<K, C>(c: &C) -> Distribution<K>
where
    K: Hash + Eq + Clone,
    C: Counter<K>,
{
    from_log_values(c)
}

// ---------------------------------------------------------------------------
// Additive smoothing
// ---------------------------------------------------------------------------

/// Add-one smoothing over a universe of `number_of_keys` keys.
pub fn laplace<K, C>(c: &C, number_of_keys: usize) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    lidstone(c, number_of_keys, 1.0)
}

/// Adds `lambda` to every key in the universe, seen or not:
/// `p(k) = (c(k) + λ) / (T + λ·N)`.
pub fn lidstone<K, C>(c: &C, number_of_keys: usize, lambda: f64) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    check_non_negative(c)?;
    check_parameter("lambda", lambda)?;
    check_universe(number_of_keys, c.size())?;
    let new_total = c.total_count() + lambda * number_of_keys as f64;
    if !(new_total > 0.0) {
        return Err(Error::InvalidParameter {
            name: "lambda",
            value: lambda,
        });
    }
    let unseen = (number_of_keys - c.size()) as f64;
    let reserved_mass = unseen * lambda / new_total;

    let mut counter = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| counter.set_count(k.clone(), (v + lambda) / new_total));
    Ok(Distribution::from_parts(counter, number_of_keys, reserved_mass))
}

/// Lidstone smoothing where the unseen mass is carried by the listed key
/// `unk`, which gets no pseudo-count.  Keys outside the counter get 0.
pub fn laplace_with_explicit_unknown<K, C>(c: &C, lambda: f64, unk: &K) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    check_non_negative(c)?;
    check_parameter("lambda", lambda)?;
    let smoothed_keys = c.size() - usize::from(c.contains_key(unk));
    let total = c.total_count() + lambda * smoothed_keys as f64;
    if !(total > 0.0) {
        return Err(Error::InvalidParameter {
            name: "lambda",
            value: lambda,
        });
    }
    let mut counter = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| {
        let p = if k == unk { v / total } else { (v + lambda) / total };
        counter.set_count(k.clone(), p);
    });
    let n = counter.size();
    Ok(Distribution::from_parts(counter, n, 0.0))
}

/// Subtracts `discount` from every count above it.  The subtracted mass,
/// plus the whole of every count at or below `discount`, is reserved for
/// the unlisted keys.
pub fn absolutely_discounted<K, C>(
    c: &C,
    number_of_keys: usize,
    discount: f64,
) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    check_non_negative(c)?;
    check_parameter("discount", discount)?;
    check_universe(number_of_keys, c.size())?;
    let total = c.total_count();
    if total == 0.0 {
        return Ok(Distribution::from_parts(ClassicCounter::new(), number_of_keys, 1.0));
    }

    let mut counter = ClassicCounter::new();
    let mut reserved = 0.0;
    c.for_each_entry(|k, v| {
        if v > discount {
            counter.set_count(k.clone(), (v - discount) / total);
            reserved += discount;
        } else {
            reserved += v;
        }
    });
    let reserved_mass = reserved / total;
    if reserved_mass > 0.0 && number_of_keys == counter.size() {
        return Err(Error::UniverseTooSmall {
            number_of_keys,
            observed: counter.size(),
        });
    }
    Ok(Distribution::from_parts(counter, number_of_keys, reserved_mass))
}

// ---------------------------------------------------------------------------
// Good-Turing
// ---------------------------------------------------------------------------

/// Adjusted frequencies `r* = (r+1)·n_{r+1}/n_r` for `r = 1..=9` and the
/// observed mass after adjustment, or `None` if some bucket `1..=10` holds
/// fewer than three keys.
struct TuringTable {
    adjusted: [f64; GOOD_TURING_MAX_FREQ as usize],
    n1: u64,
    adjusted_mass: f64,
}

impl TuringTable {
    fn build(cc: &CountCounts) -> Option<Self> {
        let n = cc.up_to(GOOD_TURING_MAX_FREQ);
        if let Some(r) = (1..=GOOD_TURING_MAX_FREQ).find(|&r| n[r as usize] < GOOD_TURING_MIN_BUCKET) {
            debug!(
                frequency = r,
                count_of_counts = n[r as usize],
                "count-of-counts too sparse for good-turing, falling back to lidstone(0.5)"
            );
            return None;
        }
        let mut adjusted = [0.0; GOOD_TURING_MAX_FREQ as usize];
        let mut mass = cc.total_mass();
        for r in 1..GOOD_TURING_MAX_FREQ as usize {
            adjusted[r] = (r + 1) as f64 * n[r + 1] as f64 / n[r] as f64;
            mass -= (r as f64 - adjusted[r]) * n[r] as f64;
        }
        Some(TuringTable {
            adjusted,
            n1: n[1],
            adjusted_mass: mass,
        })
    }

    /// Unnormalized smoothed frequency for a raw frequency `r > 0`.
    fn smoothed(&self, r: u64) -> f64 {
        if r < GOOD_TURING_MAX_FREQ {
            self.adjusted[r as usize]
        } else {
            r as f64
        }
    }
}

/// Classic Good-Turing over frequencies 1..10.
///
/// Reserves `n_1 / N` for unseen keys and rescales adjusted frequencies so
/// the listed keys carry the rest.  Keys with frequency 10 or more keep
/// their raw frequency.  When any of `n_1..n_10` is below 3 the table is
/// too sparse to trust and the result is [`lidstone`] with `λ = 0.5`
/// instead; this fallback is logged at debug level.
pub fn good_turing<K, C>(c: &C, number_of_keys: usize) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let cc = CountCounts::from_counter(c)?;
    check_universe(number_of_keys, c.size())?;
    let Some(table) = TuringTable::build(&cc) else {
        return lidstone(c, number_of_keys, FALLBACK_LAMBDA);
    };

    let observed = cc.total_mass();
    let reserved_mass = table.n1 as f64 / observed;
    let norm = (1.0 - reserved_mass) / table.adjusted_mass;
    let mut counter = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| {
        let r = frequency_of(v);
        if r > 0 {
            counter.set_count(k.clone(), table.smoothed(r) * norm);
        }
    });
    if number_of_keys == counter.size() {
        return Err(Error::UniverseTooSmall {
            number_of_keys,
            observed: counter.size(),
        });
    }
    Ok(Distribution::from_parts(counter, number_of_keys, reserved_mass))
}

/// Good-Turing without reserved mass: the listed key `unk` stands for all
/// unseen events and everything is normalized over the listed keys.  Falls
/// back to [`laplace_with_explicit_unknown`] with `λ = 0.5` on sparse data.
pub fn good_turing_with_explicit_unknown<K, C>(c: &C, unk: &K) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let cc = CountCounts::from_counter(c)?;
    let Some(table) = TuringTable::build(&cc) else {
        return laplace_with_explicit_unknown(c, FALLBACK_LAMBDA, unk);
    };

    let mut counter = ClassicCounter::with_capacity(c.size());
    c.for_each_entry(|k, v| {
        let r = frequency_of(v);
        if r > 0 {
            counter.set_count(k.clone(), table.smoothed(r) / table.adjusted_mass);
        }
    });
    let n = counter.size();
    Ok(Distribution::from_parts(counter, n, 0.0))
}

/// Simple Good-Turing smoothing with the default configuration.
///
/// `number_of_keys` must exceed the number of observed keys so the unseen
/// mass has somewhere to go.
pub fn simple_good_turing<K, C>(c: &C, number_of_keys: usize) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    simple_good_turing_with_config(c, number_of_keys, SgtConfig::default())
}

pub fn simple_good_turing_with_config<K, C>(
    c: &C,
    number_of_keys: usize,
    config: SgtConfig,
) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let cc = CountCounts::from_counter(c)?;
    let observed = cc.observed() as usize;
    if number_of_keys <= observed {
        return Err(Error::UniverseTooSmall {
            number_of_keys,
            observed,
        });
    }
    let (r, n) = cc.to_arrays();
    let sgt = SimpleGoodTuring::with_config(&r, &n, config)?;

    let mut counter = ClassicCounter::with_capacity(observed);
    c.for_each_entry(|k, v| {
        let freq = frequency_of(v);
        if let Some(p) = sgt.probability_of_frequency(freq).filter(|_| freq > 0) {
            counter.set_count(k.clone(), p);
        }
    });
    Ok(Distribution::from_parts(
        counter,
        number_of_keys,
        sgt.probability_for_unseen(),
    ))
}

// ---------------------------------------------------------------------------
// Dirichlet prior
// ---------------------------------------------------------------------------

/// `(W, w / W)` with `W = T + w`.
fn dirichlet_weights<K, C>(c: &C, prior: &Distribution<K>, weight: f64) -> Result<(f64, f64)>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    if prior.is_dynamic() {
        return Err(Error::DynamicPrior);
    }
    check_non_negative(c)?;
    check_parameter("weight", weight)?;
    let total_weight = c.total_count() + weight;
    if !(total_weight > 0.0) {
        return Err(Error::InvalidParameter {
            name: "weight",
            value: weight,
        });
    }
    Ok((total_weight, weight / total_weight))
}

/// Adds `weight` pseudo-counts spread according to `prior`:
/// `p(k) = c(k)/W + prior(k)·w/W` with `W = T + w`.  The universe is the
/// prior's; its reserved mass shrinks by `w/W`.
///
/// `prior` must be static.
pub fn dirichlet_prior<K, C>(c: &C, prior: &Distribution<K>, weight: f64) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let (total_weight, multiplier) = dirichlet_weights(c, prior, weight)?;
    let mut counter = counters::scale(c, 1.0 / total_weight);
    prior.for_each_explicit(|k, p| {
        counter.increment_count(k.clone(), p * multiplier);
    });
    Ok(Distribution::from_parts(
        counter,
        prior.number_of_keys(),
        prior.reserved_mass() * multiplier,
    ))
}

/// Same probabilities as [`dirichlet_prior`], but only the sparse empirical
/// part is stored; every prior lookup goes to the shared `prior`.
pub fn dynamic_dirichlet_prior<K, C>(
    c: &C,
    prior: Arc<Distribution<K>>,
    weight: f64,
) -> Result<Distribution<K>>
where
    K: Hash + Eq + Clone + Debug,
    C: Counter<K>,
{
    let (total_weight, multiplier) = dirichlet_weights(c, &*prior, weight)?;
    let sparse = counters::scale(c, 1.0 / total_weight);
    Ok(Distribution::dynamic(sparse, prior, multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(pairs: &[(&'static str, f64)]) -> ClassicCounter<&'static str> {
        let mut c = ClassicCounter::new();
        for &(k, v) in pairs {
            c.set_count(k, v);
        }
        c
    }

    /// Sums probabilities over the listed keys plus `unseen` unlisted ones.
    fn mass_over_universe(d: &Distribution<&'static str>, unseen: &[&'static str]) -> f64 {
        let mut sum = 0.0;
        d.for_each_explicit(|_, p| sum += p);
        for k in unseen {
            assert!(!d.contains_key(k));
            sum += d.probability_of(k);
        }
        sum
    }

    #[test]
    fn laplace_reference_case() {
        let d = laplace(&counter(&[("a", 1.0)]), 4).unwrap();
        assert!((d.probability_of(&"a") - 2.0 / 6.0).abs() < 1e-15);
        for k in ["x", "y", "z"] {
            assert!((d.probability_of(&k) - 1.0 / 6.0).abs() < 1e-15);
        }
        assert!((mass_over_universe(&d, &["x", "y", "z"]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn lidstone_validation() {
        let c = counter(&[("a", 1.0), ("b", 2.0)]);
        assert!(matches!(lidstone(&c, 1, 0.5), Err(Error::UniverseTooSmall { .. })));
        assert!(matches!(
            lidstone(&c, 4, -0.5),
            Err(Error::InvalidParameter { name: "lambda", .. })
        ));
        assert!(matches!(
            lidstone(&counter(&[("a", -1.0)]), 4, 0.5),
            Err(Error::NegativeCount { .. })
        ));
        let d = lidstone(&c, 2, 0.5).unwrap();
        assert_eq!(d.reserved_mass(), 0.0, "full universe leaves nothing in reserve");
    }

    #[test]
    fn uniform_and_plain_normalization() {
        let d = uniform(["a", "b", "a", "c", "d"]);
        assert_eq!(d.number_of_keys(), 4);
        assert_eq!(d.probability_of(&"c"), 0.25);

        let d = from_counter(&counter(&[("a", 3.0), ("b", 1.0)]));
        assert_eq!(d.probability_of(&"a"), 0.75);
        assert_eq!(d.probability_of(&"zzz"), 0.0, "closed universe");
    }

    #[test]
    fn reserved_mass_factories() {
        let c = counter(&[("a", 3.0), ("b", 1.0)]);
        let d = from_counter_with_reserved_mass(&c, 4, 0.2).unwrap();
        assert!((d.probability_of(&"a") - 0.6).abs() < 1e-15);
        assert!((d.probability_of(&"q") - 0.1).abs() < 1e-15);
        assert!((mass_over_universe(&d, &["q", "r"]) - 1.0).abs() < 1e-12);
        assert!(from_counter_with_reserved_mass(&c, 4, 1.5).is_err());

        let partial = from_partially_specified_counter(&counter(&[("a", 0.5), ("b", 0.25)]), 3);
        assert_eq!(partial.reserved_mass(), 0.25);
        assert_eq!(partial.probability_of(&"c"), 0.25);
        let full = from_partially_specified_counter(&counter(&[("a", 3.0), ("b", 1.0)]), 3);
        assert_eq!(full.reserved_mass(), 0.0);
        assert_eq!(full.probability_of(&"a"), 0.75);
    }

    #[test]
    fn log_values_and_softmax() {
        let c = counter(&[("a", 1000.0), ("b", 1000.0 + 2f64.ln())]);
        let d = from_log_values(&c);
        assert!((d.probability_of(&"b") - 2.0 / 3.0).abs() < 1e-12, "must not overflow");
        let s = from_logistic_scores(&counter(&[("x", 0.0), ("y", 0.0)]));
        assert_eq!(s.probability_of(&"x"), 0.5);
    }

    #[test]
    fn explicit_unknown_smoothing() {
        let c = counter(&[("a", 2.0), ("b", 1.0), ("UNK", 1.0)]);
        let d = laplace_with_explicit_unknown(&c, 1.0, &"UNK").unwrap();
        assert!((d.probability_of(&"a") - 3.0 / 6.0).abs() < 1e-15);
        assert!((d.probability_of(&"UNK") - 1.0 / 6.0).abs() < 1e-15);
        assert_eq!(d.probability_of(&"never"), 0.0);
        assert!((d.total_count() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn absolute_discounting() {
        let c = counter(&[("a", 5.0), ("b", 3.0), ("c", 0.5)]);
        let d = absolutely_discounted(&c, 5, 1.0).unwrap();
        // total 8.5; a, b each give up 1.0 and c (0.5) falls to reserve.
        assert!((d.probability_of(&"a") - 4.0 / 8.5).abs() < 1e-15);
        assert!(!d.contains_key(&"c"));
        assert!((d.reserved_mass() - 2.5 / 8.5).abs() < 1e-15);
        assert!((mass_over_universe(&d, &["c", "x", "y"]) - 1.0).abs() < 1e-12);
        assert!(matches!(
            absolutely_discounted(&counter(&[("a", 5.0), ("b", 3.0)]), 2, 1.0),
            Err(Error::UniverseTooSmall { .. })
        ));
    }

    /// Three keys at each frequency 1..=10, plus a couple of heavy hitters.
    fn dense() -> ClassicCounter<String> {
        let mut c = ClassicCounter::new();
        for r in 1..=10u32 {
            for i in 0..3 {
                c.set_count(format!("k{r}_{i}"), r as f64);
            }
        }
        c.set_count("big".to_string(), 40.0);
        c.set_count("bigger".to_string(), 55.0);
        c
    }

    #[test]
    fn good_turing_conserves_mass() {
        let c = dense();
        let d = good_turing(&c, 100).unwrap();
        let unseen = 100 - c.size();
        let mut sum = 0.0;
        d.for_each_explicit(|_, p| sum += p);
        sum += unseen as f64 * d.probability_of(&"nope".to_string());
        assert!((sum - 1.0).abs() < 1e-12, "mass {sum}");
        // n_1 = 3, N = 3·55 + 95
        assert!((d.reserved_mass() - 3.0 / 260.0).abs() < 1e-15);
        assert!(
            d.probability_of(&"bigger".to_string()) > d.probability_of(&"big".to_string()),
            "raw frequencies above 10 keep their order"
        );
    }

    #[test]
    fn good_turing_falls_back_on_sparse_data() {
        let c = counter(&[("a", 1.0), ("b", 2.0)]);
        let gt = good_turing(&c, 10).unwrap();
        let lid = lidstone(&c, 10, 0.5).unwrap();
        assert_eq!(gt, lid);

        let g = good_turing_with_explicit_unknown(&c, &"a").unwrap();
        let l = laplace_with_explicit_unknown(&c, 0.5, &"a").unwrap();
        assert_eq!(g, l);
    }

    #[test]
    fn good_turing_with_unknown_normalizes_listed_keys() {
        let mut c = dense();
        c.set_count("<unk>".to_string(), 7.0);
        let d = good_turing_with_explicit_unknown(&c, &"<unk>".to_string()).unwrap();
        assert_eq!(d.reserved_mass(), 0.0);
        assert!((d.total_count() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn simple_good_turing_distribution() {
        let mut c = ClassicCounter::new();
        let buckets = [(1u32, 10u32), (2, 6), (3, 4), (5, 2), (8, 1)];
        for (r, n) in buckets {
            for i in 0..n {
                c.set_count(format!("r{r}_{i}"), r as f64);
            }
        }
        c.set_count("rounds_to_zero".to_string(), 0.3);
        let d = simple_good_turing(&c, 50).unwrap();
        assert!((d.reserved_mass() - 10.0 / 52.0).abs() < 1e-15);
        assert!(!d.contains_key(&"rounds_to_zero".to_string()));
        assert_eq!(d.explicit_size(), 23);
        let unseen = 50 - 23;
        let mut sum = 0.0;
        d.for_each_explicit(|_, p| sum += p);
        sum += unseen as f64 * d.probability_of(&"rounds_to_zero".to_string());
        assert!((sum - 1.0).abs() < 1e-9);

        assert!(matches!(
            simple_good_turing(&c, 23),
            Err(Error::UniverseTooSmall { number_of_keys: 23, observed: 23 })
        ));
    }

    #[test]
    fn dirichlet_static_and_dynamic_agree() {
        let prior = Arc::new(laplace(&counter(&[("a", 4.0), ("b", 2.0), ("c", 1.0)]), 6).unwrap());
        let c = counter(&[("a", 1.0), ("d", 2.0)]);
        let s = dirichlet_prior(&c, &prior, 3.0).unwrap();
        let d = dynamic_dirichlet_prior(&c, Arc::clone(&prior), 3.0).unwrap();
        assert!(d.is_dynamic());
        assert_eq!(s.number_of_keys(), 6);
        for k in ["a", "b", "c", "d", "e", "f"] {
            let (ps, pd) = (s.probability_of(&k), d.probability_of(&k));
            assert!((ps - pd).abs() < 1e-15, "{k}: static {ps} vs dynamic {pd}");
        }
        assert!((s.total_count() - d.total_count()).abs() < 1e-12);
        assert!((s.total_count() - 1.0).abs() < 1e-12);
        assert_eq!(s.argmax(), d.argmax());
        // W = 3 + 3, so a = 1/6 + prior(a)·1/2
        assert!((s.probability_of(&"a") - (1.0 / 6.0 + prior.probability_of(&"a") * 0.5)).abs() < 1e-15);
    }

    #[test]
    fn dirichlet_rejects_dynamic_prior() {
        let prior = Arc::new(laplace(&counter(&[("a", 1.0)]), 3).unwrap());
        let dynamic = dynamic_dirichlet_prior(&counter(&[("b", 1.0)]), prior, 1.0).unwrap();
        assert!(matches!(
            dirichlet_prior(&counter(&[("a", 1.0)]), &dynamic, 1.0),
            Err(Error::DynamicPrior)
        ));
        assert!(matches!(
            dynamic_dirichlet_prior(&counter(&[("a", 1.0)]), Arc::new(dynamic), 1.0),
            Err(Error::DynamicPrior)
        ));
    }
}
