//! Gale & Sampson's Simple Good-Turing estimator.
//!
//! Given a frequency-of-frequencies table (`r` ascending, `n_r` the number
//! of types seen exactly `r` times), the estimator
//!
//! 1. averages each `n_r` over the gap to its neighbouring frequencies
//!    (`z_r = 2·n_r / (r_next − r_prev)`),
//! 2. fits `ln z = intercept + slope·ln r` by least squares,
//! 3. walks the buckets in ascending `r`, using the empirical Turing
//!    estimate `(r+1)·n_{r+1}/n_r` until it is statistically
//!    indistinguishable from the regression estimate, then switches to the
//!    regression for every higher bucket,
//! 4. renormalizes so the seen mass is `1 − p_zero`, where
//!    `p_zero = n_1 / N` is reserved for unseen types.
//!
//! The switch is one-way: once taken it is never reverted.
//!
//! # Example
//! ```
//! use tally::SimpleGoodTuring;
//!
//! let sgt = SimpleGoodTuring::new(&[1, 2, 3, 5, 8], &[10, 6, 4, 2, 1]).unwrap();
//! assert!((sgt.probability_for_unseen() - 10.0 / 52.0).abs() < 1e-15);
//! let seen: f64 = sgt.n().iter().zip(sgt.probabilities()).map(|(n, p)| *n as f64 * p).sum();
//! assert!((sgt.probability_for_unseen() + seen - 1.0).abs() < 1e-12);
//! ```

use std::fmt;
use std::io::BufRead;

use tracing::{debug, trace, warn};

use crate::count_counts::CountCounts;
use crate::error::{Error, Result};

/// Fewest distinct frequencies the regression accepts.
pub const MIN_INPUT: usize = 5;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tunables for [`SimpleGoodTuring`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SgtConfig {
    /// Multiplier of the standard deviation that decides when the empirical
    /// and regression estimates are indistinguishable.
    pub confidence_factor: f64,
    /// Largest accepted deviation of the final masses from 1.
    pub tolerance: f64,
}

impl SgtConfig {
    /// 95% confidence (p < 0.05).
    pub const CONFIDENCE_95: f64 = 1.96;
    /// 90% confidence (p < 0.1).
    pub const CONFIDENCE_90: f64 = 1.65;

    pub fn new() -> Self {
        SgtConfig {
            confidence_factor: Self::CONFIDENCE_95,
            tolerance: 1e-12,
        }
    }

    pub fn confidence_factor(mut self, f: f64) -> Self {
        assert!(f > 0.0 && f.is_finite(), "confidence_factor must be positive");
        self.confidence_factor = f;
        self
    }

    pub fn tolerance(mut self, t: f64) -> Self {
        assert!(t > 0.0, "tolerance must be positive");
        self.tolerance = t;
        self
    }
}

impl Default for SgtConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// A fitted Simple Good-Turing estimate.  All intermediates are kept and
/// exposed through accessors.
#[derive(Debug, Clone)]
pub struct SimpleGoodTuring {
    r: Vec<u64>,
    n: Vec<u64>,
    z: Vec<f64>,
    log_r: Vec<f64>,
    log_z: Vec<f64>,
    slope: f64,
    intercept: f64,
    r_star: Vec<f64>,
    p: Vec<f64>,
    p_zero: f64,
    n_total: f64,
    n_total_prime: f64,
    switched_at: Option<usize>,
}

impl SimpleGoodTuring {
    /// Fits the estimator with the default configuration.
    ///
    /// `r` must be positive and strictly increasing, `n` positive and of
    /// the same length, and there must be at least [`MIN_INPUT`] buckets.
    pub fn new(r: &[u64], n: &[u64]) -> Result<Self> {
        Self::with_config(r, n, SgtConfig::default())
    }

    /// Fits from `(r, n_r)` pairs, which must already be in ascending `r`.
    pub fn from_pairs(pairs: &[(u64, u64)]) -> Result<Self> {
        let (r, n): (Vec<u64>, Vec<u64>) = pairs.iter().copied().unzip();
        Self::new(&r, &n)
    }

    pub fn from_count_counts(cc: &CountCounts) -> Result<Self> {
        let (r, n) = cc.to_arrays();
        Self::new(&r, &n)
    }

    pub fn with_config(r: &[u64], n: &[u64], config: SgtConfig) -> Result<Self> {
        validate(r, n)?;
        let rows = r.len();

        let n_total: f64 = r.iter().zip(n).map(|(&r, &n)| r as f64 * n as f64).sum();
        let p_zero = if r[0] == 1 { n[0] as f64 / n_total } else { 0.0 };

        let z: Vec<f64> = (0..rows)
            .map(|j| {
                let i = if j == 0 { 0.0 } else { r[j - 1] as f64 };
                let k = if j == rows - 1 { 2.0 * r[j] as f64 - i } else { r[j + 1] as f64 };
                2.0 * n[j] as f64 / (k - i)
            })
            .collect();
        let log_r: Vec<f64> = r.iter().map(|&v| (v as f64).ln()).collect();
        let log_z: Vec<f64> = z.iter().map(|v| v.ln()).collect();
        let (slope, intercept) = best_fit(&log_r, &log_z);
        debug!(slope, intercept, rows, "simple good-turing regression");
        if slope > -1.0 {
            warn!(slope, "regression slope above -1; estimates may be unreliable");
        }

        let smoothed = |x: f64| (intercept + slope * x.ln()).exp();
        let mut r_star = Vec::with_capacity(rows);
        let mut switched_at = None;
        for j in 0..rows {
            let rj = r[j] as f64;
            let y = (rj + 1.0) * smoothed(rj + 1.0) / smoothed(rj);
            if switched_at.is_none() {
                let next = (j + 1 < rows && r[j + 1] == r[j] + 1).then(|| n[j + 1] as f64);
                match next {
                    None => switched_at = Some(j),
                    Some(next) => {
                        let nj = n[j] as f64;
                        let x = (rj + 1.0) * next / nj;
                        let half_width = config.confidence_factor
                            * ((rj + 1.0).powi(2) * next / nj.powi(2) * (1.0 + next / nj)).sqrt();
                        trace!(r = r[j], x, y, half_width, "turing vs regression");
                        if (x - y).abs() <= half_width {
                            switched_at = Some(j);
                        } else {
                            r_star.push(x);
                        }
                    }
                }
            }
            if switched_at.is_some() {
                r_star.push(y);
            }
        }

        let n_total_prime: f64 = n.iter().zip(&r_star).map(|(&n, rs)| n as f64 * rs).sum();
        let p: Vec<f64> = r_star
            .iter()
            .map(|rs| (1.0 - p_zero) * rs / n_total_prime)
            .collect();

        let sgt = SimpleGoodTuring {
            r: r.to_vec(),
            n: n.to_vec(),
            z,
            log_r,
            log_z,
            slope,
            intercept,
            r_star,
            p,
            p_zero,
            n_total,
            n_total_prime,
            switched_at,
        };
        sgt.check_conservation(config.tolerance);
        Ok(sgt)
    }

    fn check_conservation(&self, tolerance: f64) {
        let sum = self.p_zero
            + self
                .n
                .iter()
                .zip(&self.p)
                .map(|(&n, p)| n as f64 * p)
                .sum::<f64>();
        assert!(
            (1.0 - sum).abs() <= tolerance,
            "simple good-turing lost probability mass: total {sum}, tolerance {tolerance}"
        );
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Mass reserved for unseen types, `n_1 / N`.
    pub fn probability_for_unseen(&self) -> f64 {
        self.p_zero
    }

    /// Per-type probability for each bucket, parallel to [`r`](Self::r).
    pub fn probabilities(&self) -> &[f64] {
        &self.p
    }

    /// Probability of one type seen `r` times, or `None` if `r` is not a
    /// bucket.  `r == 0` yields the total unseen mass.
    pub fn probability_of_frequency(&self, r: u64) -> Option<f64> {
        if r == 0 {
            return Some(self.p_zero);
        }
        self.r.binary_search(&r).ok().map(|j| self.p[j])
    }

    /// `(r, p_r)` pairs, starting with `(0, p_zero)`.
    pub fn estimates(&self) -> Vec<(u64, f64)> {
        std::iter::once((0, self.p_zero))
            .chain(self.r.iter().copied().zip(self.p.iter().copied()))
            .collect()
    }

    pub fn r(&self) -> &[u64] {
        &self.r
    }

    pub fn n(&self) -> &[u64] {
        &self.n
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn log_r(&self) -> &[f64] {
        &self.log_r
    }

    pub fn log_z(&self) -> &[f64] {
        &self.log_z
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Smoothed frequency estimate per bucket.
    pub fn r_star(&self) -> &[f64] {
        &self.r_star
    }

    /// `N = Σ r·n_r`.
    pub fn n_total(&self) -> f64 {
        self.n_total
    }

    /// `N' = Σ n_r·r*`.
    pub fn n_total_prime(&self) -> f64 {
        self.n_total_prime
    }

    /// Index of the first bucket estimated by the regression.
    pub fn switched_at(&self) -> Option<usize> {
        self.switched_at
    }
}

fn validate(r: &[u64], n: &[u64]) -> Result<()> {
    if r.len() != n.len() {
        return Err(Error::MismatchedLengths {
            r: r.len(),
            n: n.len(),
        });
    }
    if r.len() < MIN_INPUT {
        return Err(Error::TooFewBuckets {
            min: MIN_INPUT,
            got: r.len(),
        });
    }
    let mut prev = 0;
    for (index, (&ri, &ni)) in r.iter().zip(n).enumerate() {
        if ri <= prev {
            return Err(Error::InvalidFrequencyOrder { index });
        }
        if ni == 0 {
            return Err(Error::ZeroCountOfCounts { frequency: ri });
        }
        prev = ri;
    }
    Ok(())
}

/// Ordinary least squares of `y` on `x`, returning `(slope, intercept)`.
fn best_fit(x: &[f64], y: &[f64]) -> (f64, f64) {
    let len = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / len;
    let mean_y = y.iter().sum::<f64>() / len;
    let mut xy = 0.0;
    let mut xx = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        xy += (xi - mean_x) * (yi - mean_y);
        xx += (xi - mean_x) * (xi - mean_x);
    }
    let slope = xy / xx;
    (slope, mean_y - slope * mean_x)
}

impl fmt::Display for SimpleGoodTuring {
    /// Tab-separated table: `r  n  p  r*`, one row per bucket.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "r\tn\tp\tr*")?;
        writeln!(f, "0\t-\t{}\t-", self.p_zero)?;
        for j in 0..self.r.len() {
            writeln!(
                f,
                "{}\t{}\t{}\t{}",
                self.r[j], self.n[j], self.p[j], self.r_star[j]
            )?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Reads whitespace-separated `r n` pairs, one per line.  Blank lines and
/// lines starting with `#` are skipped.
pub fn parse_pairs<R: BufRead>(reader: R) -> Result<Vec<(u64, u64)>> {
    let mut pairs = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let (Some(r), Some(n), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(Error::MalformedLine {
                line: i + 1,
                content: line.clone(),
            });
        };
        let parse = |s: &str| {
            s.parse::<u64>().map_err(|_| Error::InvalidValue {
                line: i + 1,
                value: s.to_owned(),
            })
        };
        pairs.push((parse(r)?, parse(n)?));
    }
    Ok(pairs)
}
