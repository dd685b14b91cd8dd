//! Sparse counters with exact running totals, and the smoothing estimators
//! that turn them into probability distributions.
//!
//! ```
//! use tally::{smoothing, ClassicCounter, Counter};
//!
//! let mut words = ClassicCounter::new();
//! for w in "the cat saw the dog".split_whitespace() {
//!     words.increment(w);
//! }
//! assert_eq!(words.total_count(), 5.0);
//!
//! let d = smoothing::laplace(&words, 10).unwrap();
//! assert!((d.probability_of(&"the") - 3.0 / 15.0).abs() < 1e-12);
//! assert!((d.probability_of(&"bird") - 1.0 / 15.0).abs() < 1e-12);
//! ```

mod builder;
mod count_counts;
mod error;
pub mod counter;
pub mod counters;
pub mod distribution;
pub mod divergence;
pub mod math;
pub mod sgt;
pub mod smoothing;

pub use builder::CounterBuilder;
pub use count_counts::CountCounts;
pub use counter::{
    ClassicCounter, CompactCounter, ConcurrentCounter, Counter, DeltaCounter, TOTAL_TOLERANCE,
};
pub use distribution::Distribution;
pub use error::{Error, Result};
pub use sgt::{SgtConfig, SimpleGoodTuring};
