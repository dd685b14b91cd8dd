//! Log-space arithmetic shared by the counters and the smoothing code.

/// Differences larger than this are below double precision once
/// exponentiated, so the smaller operand is dropped.
const LOG_TOLERANCE: f64 = 30.0;

/// Returns `ln(e^a + e^b)` without overflowing for large magnitudes.
///
/// `-∞` is the identity: `log_add(-∞, b) == b`.
#[inline]
pub fn log_add(a: f64, b: f64) -> f64 {
    let (max, neg_diff) = if a > b { (a, b - a) } else { (b, a - b) };
    if max == f64::NEG_INFINITY {
        max
    } else if neg_diff < -LOG_TOLERANCE {
        max
    } else {
        max + neg_diff.exp().ln_1p()
    }
}

/// Returns `ln(Σ e^v)` over `values`, shifting by the maximum first.
///
/// An empty input yields `-∞`.
pub fn log_sum(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY || max.is_infinite() {
        return max;
    }
    let sum: f64 = values.iter().map(|v| (v - max).exp()).sum();
    max + sum.ln()
}

/// `log2(x)`, spelled the way the divergence code reads.
#[inline]
pub(crate) fn log2_ratio(num: f64, den: f64) -> f64 {
    (num / den).ln() / std::f64::consts::LN_2
}
