//! Held-out log-likelihood: how well each smoothing method predicts a test
//! trace after training on a Zipf(s=1) sample.
//!
//! Unsmoothed maximum likelihood assigns zero to every unseen key, so its
//! held-out cross-entropy is infinite; the smoothed estimators differ in how
//! much mass they move to the unseen tail.
//!
//! Run with:
//!     cargo run --example held_out --release

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tally::{divergence, smoothing, ClassicCounter, Counter, Distribution};

/// Key universe size.
const POOL: usize = 50_000;
/// Training sample size.
const TRAIN: usize = 100_000;
/// Held-out sample size.
const TEST: usize = 20_000;

// ---------------------------------------------------------------------------
// Zipf(s=1) trace
//
// Inverse CDF: P(X ≤ k) ≈ ln(k) / ln(N), so k = N^u for u ~ Uniform(0, 1].
// ---------------------------------------------------------------------------

fn zipf<R: Rng>(rng: &mut R, pool: usize) -> usize {
    let u: f64 = 1.0 - rng.gen::<f64>();
    let k = (pool as f64).powf(u) as usize;
    k.saturating_sub(1).min(pool - 1)
}

fn sample(seed: u64, len: usize) -> ClassicCounter<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| zipf(&mut rng, POOL)).collect()
}

/// Average bits per held-out token.
fn cross_entropy(d: &Distribution<usize>, test: &ClassicCounter<usize>) -> f64 {
    let mut bits = 0.0;
    test.for_each_entry(|k, n| bits -= n * d.probability_of(k).log2());
    bits / test.total_count()
}

fn main() {
    let train = sample(0xD1CE, TRAIN);
    let test = sample(0xBEEF, TEST);
    println!(
        "training tokens {}, distinct {}, universe {POOL}",
        train.total_count(),
        train.size()
    );

    let candidates = [
        ("mle", Ok(smoothing::from_counter(&train))),
        ("laplace", smoothing::laplace(&train, POOL)),
        ("lidstone 0.1", smoothing::lidstone(&train, POOL, 0.1)),
        ("absolute 0.75", smoothing::absolutely_discounted(&train, POOL, 0.75)),
        ("good-turing", smoothing::good_turing(&train, POOL)),
        ("simple good-turing", smoothing::simple_good_turing(&train, POOL)),
    ];

    let reference = smoothing::simple_good_turing(&test, POOL);
    println!("{:<20} {:>12} {:>12} {:>10}", "method", "bits/token", "reserved", "overlap");
    for (name, d) in candidates {
        match d {
            Ok(d) => {
                let overlap = match &reference {
                    Ok(r) => divergence::overlap(&d, r),
                    Err(_) => f64::NAN,
                };
                println!(
                    "{name:<20} {:>12.4} {:>12.6} {overlap:>10.4}",
                    cross_entropy(&d, &test),
                    d.reserved_mass()
                );
            }
            Err(e) => println!("{name:<20} failed: {e}"),
        }
    }
}
