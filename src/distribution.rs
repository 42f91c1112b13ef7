//! Probability and rate distributions over successor states.

use std::collections::BTreeMap;
use std::fmt;

/// A weighted mapping from successor state indices to probabilities (or rates).
///
/// Keys are unique; adding weight to an existing key accumulates it.
/// Iteration is in ascending state order, so everything derived from a
/// distribution (sums, exports, products) is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    map: BTreeMap<usize, f64>,
}

impl Distribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// A Dirac distribution placing all mass on `target`.
    pub fn point(target: usize) -> Self {
        let mut d = Self::new();
        d.add(target, 1.0);
        d
    }

    /// Adds `weight` to the entry for `target`, creating it if needed.
    ///
    /// Returns `true` if the entry did not exist before.
    pub fn add(&mut self, target: usize, weight: f64) -> bool {
        debug_assert!(weight >= 0.0, "weights must be non-negative");
        match self.map.get_mut(&target) {
            Some(w) => {
                *w += weight;
                false
            }
            None => {
                self.map.insert(target, weight);
                true
            }
        }
    }

    /// Overwrites the weight for `target`.
    pub fn set(&mut self, target: usize, weight: f64) {
        debug_assert!(weight >= 0.0, "weights must be non-negative");
        self.map.insert(target, weight);
    }

    /// Weight of `target`, or `0.0` if absent.
    pub fn get(&self, target: usize) -> f64 {
        self.map.get(&target).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, target: usize) -> bool {
        self.map.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Total weight.
    pub fn sum(&self) -> f64 {
        self.map.values().sum()
    }

    /// Total weight, excluding the self-loop on `state`.
    pub fn sum_without(&self, state: usize) -> f64 {
        self.iter().filter(|&(t, _)| t != state).map(|(_, w)| w).sum()
    }

    /// Successor states in ascending order.
    pub fn support(&self) -> impl Iterator<Item = usize> + '_ {
        self.map.keys().copied()
    }

    /// `(target, weight)` pairs in ascending target order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.map.iter().map(|(&t, &w)| (t, w))
    }

    /// Returns true if every successor lies in `set`.
    pub fn is_subset_of(&self, set: &crate::bitset::BitSet) -> bool {
        self.support().all(|t| set.contains(t))
    }

    /// Returns true if some successor lies in `set`.
    pub fn intersects(&self, set: &crate::bitset::BitSet) -> bool {
        self.support().any(|t| set.contains(t))
    }

    /// Weighted sum `Σ w(t) · values[t]`.
    pub fn dot(&self, values: &[f64]) -> f64 {
        self.iter().map(|(t, w)| w * values[t]).sum()
    }

    /// Builds a new distribution with every target passed through `f`.
    ///
    /// Weights of targets that collide after mapping are accumulated.
    pub fn map_targets(&self, mut f: impl FnMut(usize) -> usize) -> Distribution {
        let mut d = Distribution::new();
        for (t, w) in self.iter() {
            d.add(f(t), w);
        }
        d
    }

    /// Divides every weight by `factor` (e.g. turning rates into probabilities).
    pub fn scaled(&self, factor: f64) -> Distribution {
        Distribution {
            map: self.map.iter().map(|(&t, &w)| (t, w / factor)).collect(),
        }
    }
}

impl FromIterator<(usize, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (usize, f64)>>(iter: I) -> Self {
        let mut d = Distribution::new();
        for (t, w) in iter {
            d.add(t, w);
        }
        d
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (t, w)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", t, w)?;
        }
        write!(f, "}}")
    }
}
