//! Error types for counters, serialization and smoothing.

use thiserror::Error;

/// Error variants for rejected input.
///
/// Every variant describes a problem with the caller's data; nothing is
/// committed when one of these is returned.  Internal consistency failures
/// (a smoothing routine producing mass that does not sum to one) are not
/// represented here: they panic.
#[derive(Debug, Error)]
pub enum Error {
    /// A line of the text format was not a `key<TAB>value` pair.
    #[error("line {line}: expected `key<TAB>value`, got {content:?}")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// The offending line.
        content: String,
    },

    /// The value column of a line did not parse as a float.
    #[error("line {line}: invalid count {value:?}")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// The text that failed to parse.
        value: String,
    },

    /// A key cannot be written in the text format.
    #[error("key {0:?} contains a tab or newline, or starts with '#', and cannot be serialized")]
    UnencodableKey(String),

    /// A smoothing routine was given a negative count.
    #[error("negative count {count} for key {key}")]
    NegativeCount {
        /// Debug rendering of the key.
        key: String,
        /// The negative value.
        count: f64,
    },

    /// Frequency and count-of-counts arrays differ in length.
    #[error("frequency array has {r} entries but count-of-counts array has {n}")]
    MismatchedLengths {
        /// Length of `r`.
        r: usize,
        /// Length of `n`.
        n: usize,
    },

    /// Not enough distinct frequency buckets for the regression.
    #[error("need at least {min} distinct frequencies, got {got}")]
    TooFewBuckets {
        /// Minimum accepted.
        min: usize,
        /// Number supplied.
        got: usize,
    },

    /// Frequencies were zero or not strictly increasing.
    #[error("frequencies must be positive and strictly increasing (index {index})")]
    InvalidFrequencyOrder {
        /// Index of the first bad frequency.
        index: usize,
    },

    /// A count-of-counts entry was zero.
    #[error("count-of-counts for frequency {frequency} must be positive")]
    ZeroCountOfCounts {
        /// The frequency whose bucket is empty.
        frequency: u64,
    },

    /// The declared universe leaves no room for unseen keys.
    #[error("universe of {number_of_keys} keys is too small for {observed} observed keys")]
    UniverseTooSmall {
        /// Declared universe size.
        number_of_keys: usize,
        /// Number of explicitly observed keys.
        observed: usize,
    },

    /// A smoothing parameter was out of range or not finite.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A dynamic Distribution was passed where a static prior is required.
    #[error("prior distribution must be static")]
    DynamicPrior,

    /// An I/O error occurred while reading or writing counters.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for counter and smoothing operations.
pub type Result<T> = std::result::Result<T, Error>;
