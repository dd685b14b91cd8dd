use std::hash::Hash;

use crate::counter::{ClassicCounter, CompactCounter, ConcurrentCounter, Counter};

/// Builder for configuring and constructing any counter backend.
///
/// # Example
/// ```
/// use tally::{CounterBuilder, Counter};
///
/// let mut c = CounterBuilder::new()
///     .initial_capacity(1_000)
///     .default_value(-1.0)
///     .build_compact::<&str>();
/// assert_eq!(c.get_count(&"missing"), -1.0);
/// c.increment("seen");
/// assert_eq!(c.total_count(), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct CounterBuilder {
    initial_capacity: usize,
    default_value: f64,
    num_shards: usize,
}

impl CounterBuilder {
    pub fn new() -> Self {
        CounterBuilder {
            initial_capacity: 0,
            default_value: 0.0,
            num_shards: 16,
        }
    }

    /// Expected number of distinct keys (default: 0).
    ///
    /// For the concurrent backend this is ignored; shards grow on demand.
    pub fn initial_capacity(mut self, n: usize) -> Self {
        self.initial_capacity = n;
        self
    }

    /// Value reported for absent keys (default: `0.0`).
    pub fn default_value(mut self, v: f64) -> Self {
        self.default_value = v;
        self
    }

    /// Set the number of shards for [`build_concurrent`](Self::build_concurrent)
    /// (must be a power of two; default: 16).
    pub fn num_shards(mut self, n: usize) -> Self {
        assert!(n > 0 && n.is_power_of_two(), "num_shards must be a power of two");
        self.num_shards = n;
        self
    }

    pub fn build_classic<K: Hash + Eq + Clone>(&self) -> ClassicCounter<K> {
        let mut c = ClassicCounter::with_capacity(self.initial_capacity);
        c.set_default_value(self.default_value);
        c
    }

    pub fn build_compact<K: Hash + Eq + Clone>(&self) -> CompactCounter<K> {
        let mut c = CompactCounter::with_capacity(self.initial_capacity);
        c.set_default_value(self.default_value);
        c
    }

    pub fn build_concurrent<K: Hash + Eq + Clone>(&self) -> ConcurrentCounter<K> {
        let mut c = ConcurrentCounter::new(self.num_shards);
        Counter::set_default_value(&mut c, self.default_value);
        c
    }
}

impl Default for CounterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_backend_honours_default_value() {
        let b = CounterBuilder::new().default_value(0.25);
        assert_eq!(b.build_classic::<u8>().get_count(&1), 0.25);
        assert_eq!(b.build_compact::<u8>().get_count(&1), 0.25);
        assert_eq!(b.build_concurrent::<u8>().get_count(&1), 0.25);
    }

    #[test]
    fn capacity_presizes_compact_table() {
        let c = CounterBuilder::new().initial_capacity(100).build_compact::<u32>();
        assert!(c.slot_count() * 3 >= 100 * 4, "100 keys must fit without growing");
    }

    #[test]
    fn shard_count_is_applied() {
        let c = CounterBuilder::new().num_shards(4).build_concurrent::<u32>();
        assert_eq!(c.num_shards(), 4);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_bad_shard_count() {
        let _ = CounterBuilder::new().num_shards(6);
    }
}
