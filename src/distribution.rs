//! Immutable normalized probability views.
//!
//! A [`Distribution`] holds explicit per-key probabilities, a declared
//! universe size and the mass reserved for keys it does not list.  An
//! unlisted key gets an equal share of the reserved mass:
//!
//! ```text
//! p(k) = explicit(k)                                   if k is listed
//!      = reserved_mass / (number_of_keys − |listed|)   otherwise (0 if no slots)
//! ```
//!
//! Distributions are produced by the factories in [`crate::smoothing`] and
//! never change afterwards.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use rand::Rng;

use crate::counter::{ClassicCounter, Counter};
use crate::counters;

/// How many keys `Display` shows.
const DISPLAY_ENTRIES: usize = 20;

#[derive(Clone)]
enum Repr<K> {
    Static {
        counter: ClassicCounter<K>,
        reserved_mass: f64,
    },
    /// Sparse empirical mass over a shared prior.  The prior is always
    /// `Static`.
    Dynamic {
        sparse: ClassicCounter<K>,
        prior: Arc<Distribution<K>>,
        prior_multiplier: f64,
        /// Keys listed in `sparse` or the prior.
        listed: usize,
    },
}

/// A normalized distribution over a (possibly implicit) key universe.
#[derive(Clone)]
pub struct Distribution<K> {
    number_of_keys: usize,
    repr: Repr<K>,
}

impl<K: Hash + Eq + Clone> Distribution<K> {
    /// Wraps already-normalized values.
    pub(crate) fn from_parts(
        counter: ClassicCounter<K>,
        number_of_keys: usize,
        reserved_mass: f64,
    ) -> Self {
        Distribution {
            number_of_keys,
            repr: Repr::Static {
                counter,
                reserved_mass,
            },
        }
    }

    /// Builds the dynamic variant.  `prior` must be static.
    pub(crate) fn dynamic(
        sparse: ClassicCounter<K>,
        prior: Arc<Distribution<K>>,
        prior_multiplier: f64,
    ) -> Self {
        let mut listed = prior.explicit_size();
        sparse.for_each_entry(|k, _| {
            if !prior.contains_key(k) {
                listed += 1;
            }
        });
        let number_of_keys = prior.number_of_keys;
        Distribution {
            number_of_keys,
            repr: Repr::Dynamic {
                sparse,
                prior,
                prior_multiplier,
                listed,
            },
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Probability of `key`, listed or not.
    pub fn probability_of(&self, key: &K) -> f64 {
        match &self.repr {
            Repr::Static { counter, .. } => {
                if counter.contains_key(key) {
                    counter.get_count(key)
                } else {
                    self.unseen_probability()
                }
            }
            Repr::Dynamic {
                sparse,
                prior,
                prior_multiplier,
                ..
            } => {
                let from_prior = if prior.contains_key(key) {
                    prior.get_count(key)
                } else if sparse.contains_key(key) {
                    0.0
                } else {
                    return self.unseen_probability();
                };
                sparse.get_count(key) + from_prior * prior_multiplier
            }
        }
    }

    /// Probability of any single unlisted key; 0 when every slot of the
    /// universe is listed.
    pub fn unseen_probability(&self) -> f64 {
        let slots = self.number_of_keys.saturating_sub(self.explicit_size());
        if slots == 0 {
            return 0.0;
        }
        match &self.repr {
            Repr::Static { reserved_mass, .. } => reserved_mass / slots as f64,
            Repr::Dynamic {
                prior,
                prior_multiplier,
                ..
            } => prior.reserved_mass() / slots as f64 * prior_multiplier,
        }
    }

    /// Natural log of [`probability_of`](Self::probability_of); `-∞` for a
    /// zero probability.
    pub fn log_probability_of(&self, key: &K) -> f64 {
        self.probability_of(key).ln()
    }

    /// Listed mass plus reserved mass; 1 up to rounding for every factory.
    pub fn total_count(&self) -> f64 {
        match &self.repr {
            Repr::Static {
                counter,
                reserved_mass,
            } => counter.total_count() + reserved_mass,
            Repr::Dynamic {
                sparse,
                prior,
                prior_multiplier,
                ..
            } => sparse.total_count() + prior.total_count() * prior_multiplier,
        }
    }

    /// Mass shared by the unlisted keys.
    pub fn reserved_mass(&self) -> f64 {
        match &self.repr {
            Repr::Static { reserved_mass, .. } => *reserved_mass,
            Repr::Dynamic {
                prior,
                prior_multiplier,
                ..
            } => prior.reserved_mass() * prior_multiplier,
        }
    }

    /// Declared universe size.
    pub fn number_of_keys(&self) -> usize {
        self.number_of_keys
    }

    /// Number of listed keys.
    pub fn explicit_size(&self) -> usize {
        match &self.repr {
            Repr::Static { counter, .. } => counter.size(),
            Repr::Dynamic { listed, .. } => *listed,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.repr, Repr::Dynamic { .. })
    }

    /// Whether `key` is listed.
    pub fn contains_key(&self, key: &K) -> bool {
        match &self.repr {
            Repr::Static { counter, .. } => counter.contains_key(key),
            Repr::Dynamic { sparse, prior, .. } => {
                sparse.contains_key(key) || prior.contains_key(key)
            }
        }
    }

    /// Listed probability of `key`, or 0 for an unlisted key.
    pub fn get_count(&self, key: &K) -> f64 {
        if self.contains_key(key) {
            self.probability_of(key)
        } else {
            0.0
        }
    }

    /// Calls `f` with every listed key and its probability.
    pub fn for_each_explicit<F: FnMut(&K, f64)>(&self, mut f: F) {
        match &self.repr {
            Repr::Static { counter, .. } => counter.for_each_entry(f),
            Repr::Dynamic { sparse, prior, .. } => {
                // Type-erased so the recursive call instantiates only once.
                let mut listed = |k: &K, _: f64| f(k, self.probability_of(k));
                prior.for_each_explicit(&mut listed as &mut dyn FnMut(&K, f64));
                sparse.for_each_entry(|k, _| {
                    if !prior.contains_key(k) {
                        f(k, self.probability_of(k));
                    }
                });
            }
        }
    }

    /// Listed keys, in unspecified order.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.explicit_size());
        self.for_each_explicit(|k, _| keys.push(k.clone()));
        keys
    }

    /// Listed probabilities as a counter.
    pub fn explicit_counter(&self) -> ClassicCounter<K> {
        match &self.repr {
            Repr::Static { counter, .. } => counter.clone(),
            Repr::Dynamic { .. } => {
                let mut c = ClassicCounter::with_capacity(self.explicit_size());
                self.for_each_explicit(|k, p| c.set_count(k.clone(), p));
                c
            }
        }
    }

    /// The listed key with the highest probability; `None` if nothing is
    /// listed.
    ///
    /// Ties go to the first key in iteration order.  Static and dynamic
    /// distributions with equal probabilities iterate differently, so on a
    /// tie they may name different (equally probable) keys.
    pub fn argmax(&self) -> Option<K> {
        match &self.repr {
            Repr::Static { counter, .. } => counters::argmax(counter),
            Repr::Dynamic { .. } => {
                let mut best: Option<(K, f64)> = None;
                self.for_each_explicit(|k, p| {
                    if best.as_ref().map_or(true, |(_, b)| p > *b) {
                        best = Some((k.clone(), p));
                    }
                });
                best.map(|(k, _)| k)
            }
        }
    }

    /// Draws a listed key with probability proportional to its listed
    /// mass.  Reserved mass is not sampled; `None` if no listed key has
    /// positive mass.
    pub fn draw_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<K> {
        match &self.repr {
            Repr::Static { counter, .. } => counters::sample(counter, rng),
            Repr::Dynamic { .. } => counters::sample(&self.explicit_counter(), rng),
        }
    }

    /// Copies a dynamic distribution into a static one with identical
    /// probabilities.
    pub fn to_static(&self) -> Distribution<K> {
        match &self.repr {
            Repr::Static { .. } => self.clone(),
            Repr::Dynamic { .. } => Distribution::from_parts(
                self.explicit_counter(),
                self.number_of_keys,
                self.reserved_mass(),
            ),
        }
    }
}

impl<K: Hash + Eq + Clone> PartialEq for Distribution<K> {
    /// Same universe, same reserved mass, same listed keys and values.
    fn eq(&self, other: &Self) -> bool {
        if self.number_of_keys != other.number_of_keys
            || self.reserved_mass() != other.reserved_mass()
            || self.explicit_size() != other.explicit_size()
        {
            return false;
        }
        let mut equal = true;
        self.for_each_explicit(|k, p| {
            if equal && (!other.contains_key(k) || other.probability_of(k) != p) {
                equal = false;
            }
        });
        equal
    }
}

impl<K: Hash + Eq + Clone + fmt::Display> fmt::Display for Distribution<K> {
    /// The most probable listed keys, highest first.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = Vec::with_capacity(self.explicit_size());
        self.for_each_explicit(|k, p| entries.push((k.clone(), p)));
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        write!(f, "[")?;
        for (i, (k, p)) in entries.iter().take(DISPLAY_ENTRIES).enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{k}:{p:.3e}")?;
        }
        write!(f, "]")
    }
}

impl<K: Hash + Eq + Clone + fmt::Debug> fmt::Debug for Distribution<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Distribution")
            .field("number_of_keys", &self.number_of_keys)
            .field("reserved_mass", &self.reserved_mass())
            .field("dynamic", &self.is_dynamic())
            .field("explicit", &self.explicit_counter())
            .finish()
    }
}
