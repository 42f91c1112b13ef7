//! Bit sets over state indices.
//!
//! State sets appear everywhere in model checking: label extensions,
//! satisfaction sets of state formulas, and the results of graph-based
//! precomputation. This module provides a compact bit set backed by `u64`
//! words, with the few set-algebraic operations the checkers need.

use std::fmt;

/// A set of state indices backed by a vector of u64 words.
///
/// The set grows automatically when inserting beyond the current capacity.
/// Operations that need a universe (e.g. [`BitSet::complement`]) take the
/// number of states explicitly.
#[derive(Clone, Default)]
pub struct BitSet {
    words: Vec<u64>,
    /// Cached population count
    count: usize,
}

const WORD_BITS: usize = u64::BITS as usize;

impl BitSet {
    /// Creates an empty set able to hold states `0..capacity` without growing.
    pub fn new(capacity: usize) -> Self {
        Self {
            words: vec![0; capacity.div_ceil(WORD_BITS)],
            count: 0,
        }
    }

    /// Creates an empty set with no pre-allocated capacity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the set `{0, 1, ..., n-1}`.
    pub fn full(n: usize) -> Self {
        let mut set = Self::new(n);
        set.extend(0..n);
        set
    }

    /// Number of states in the set.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Word index and bit mask of a state.
    #[inline]
    fn locate(state: usize) -> (usize, u64) {
        (state / WORD_BITS, 1 << (state % WORD_BITS))
    }

    #[inline]
    pub fn contains(&self, state: usize) -> bool {
        let (w, mask) = Self::locate(state);
        self.words.get(w).is_some_and(|word| word & mask != 0)
    }

    /// Adds `state`, growing the storage if needed. Returns true if the
    /// state was not yet in the set.
    pub fn insert(&mut self, state: usize) -> bool {
        let (w, mask) = Self::locate(state);
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        let word = &mut self.words[w];
        let added = *word & mask == 0;
        *word |= mask;
        self.count += added as usize;
        added
    }

    /// Removes `state`. Returns true if it was in the set.
    pub fn remove(&mut self, state: usize) -> bool {
        let (w, mask) = Self::locate(state);
        let Some(word) = self.words.get_mut(w) else {
            return false;
        };
        let removed = *word & mask != 0;
        *word &= !mask;
        self.count -= removed as usize;
        removed
    }

    /// Sets membership of `index` to `value`.
    pub fn set(&mut self, index: usize, value: bool) {
        if value {
            self.insert(index);
        } else {
            self.remove(index);
        }
    }

    /// Removes every state.
    pub fn clear(&mut self) {
        self.words.fill(0);
        self.count = 0;
    }

    /// Adds every state from an iterator.
    pub fn extend(&mut self, iter: impl IntoIterator<Item = usize>) {
        for index in iter {
            self.insert(index);
        }
    }

    fn recount(&mut self) {
        self.count = self.words.iter().map(|w| w.count_ones() as usize).sum();
    }

    /// In-place union: `self = self ∪ other`.
    pub fn union_with(&mut self, other: &BitSet) {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a |= *b;
        }
        self.recount();
    }

    /// In-place intersection: `self = self ∩ other`.
    pub fn intersect_with(&mut self, other: &BitSet) {
        for (i, a) in self.words.iter_mut().enumerate() {
            *a &= other.words.get(i).copied().unwrap_or(0);
        }
        self.recount();
    }

    /// In-place difference: `self = self \ other`.
    pub fn difference_with(&mut self, other: &BitSet) {
        for (a, b) in self.words.iter_mut().zip(&other.words) {
            *a &= !*b;
        }
        self.recount();
    }

    /// Returns `{0..n} \ self`.
    pub fn complement(&self, n: usize) -> BitSet {
        (0..n).filter(|&i| !self.contains(i)).collect()
    }

    /// Returns true if every state of `self` is also in `other`.
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.iter().all(|i| other.contains(i))
    }

    /// States in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            words: &self.words,
            base: 0,
            word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl PartialEq for BitSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && self.iter().eq(other.iter())
    }
}

impl Eq for BitSet {}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = BitSet::empty();
        set.extend(iter);
        set
    }
}

/// Iterator over the states of a [`BitSet`].
pub struct BitSetIter<'a> {
    words: &'a [u64],
    /// First state of the current word
    base: usize,
    /// Remaining bits of the current word
    word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.word == 0 {
            self.base += WORD_BITS;
            self.word = *self.words.get(self.base / WORD_BITS)?;
        }
        let bit = self.word.trailing_zeros() as usize;
        self.word &= self.word - 1;
        Some(self.base + bit)
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_membership() {
        let mut goal = BitSet::new(10);
        assert!(goal.is_empty());
        assert!(!goal.contains(3));
        assert!(!goal.contains(500));

        assert!(goal.insert(3));
        assert!(!goal.insert(3));
        goal.set(9, true);
        assert_eq!(goal.len(), 2);
        assert!(goal.remove(3));
        assert!(!goal.remove(3));
        assert!(!goal.remove(500));
        goal.set(9, false);
        assert!(goal.is_empty());
    }

    #[test]
    fn test_grows_past_capacity() {
        let mut states = BitSet::empty();
        states.insert(130);
        assert!(states.contains(130));
        assert!(!states.contains(129));
        assert_eq!(states.len(), 1);
    }

    #[test]
    fn test_ascending_iteration() {
        let states: BitSet = [65, 10, 0, 63, 64, 200].into_iter().collect();
        assert_eq!(states.iter().collect::<Vec<_>>(), vec![0, 10, 63, 64, 65, 200]);
        assert_eq!(BitSet::new(300).iter().next(), None);
        assert_eq!(format!("{:?}", states), "{0, 10, 63, 64, 65, 200}");
    }

    #[test]
    fn test_set_algebra() {
        let left: BitSet = [1, 2, 3, 70].into_iter().collect();
        let right: BitSet = [3, 4, 70, 140].into_iter().collect();

        let mut union = left.clone();
        union.union_with(&right);
        assert_eq!(union, [1, 2, 3, 4, 70, 140].into_iter().collect::<BitSet>());

        let mut both = left.clone();
        both.intersect_with(&right);
        assert_eq!(both, [3, 70].into_iter().collect::<BitSet>());

        let mut only_left = left.clone();
        only_left.difference_with(&right);
        assert_eq!(only_left, [1, 2].into_iter().collect::<BitSet>());
        assert!(only_left.is_subset(&left));
        assert!(!left.is_subset(&only_left));

        only_left.clear();
        assert!(only_left.is_empty());
    }

    #[test]
    fn test_complement_within_model() {
        let goal: BitSet = [0, 2].into_iter().collect();
        assert_eq!(goal.complement(5), [1, 3, 4].into_iter().collect::<BitSet>());
        assert_eq!(BitSet::full(3), [0, 1, 2].into_iter().collect::<BitSet>());
        assert_eq!(BitSet::full(0), BitSet::empty());
    }

    #[test]
    fn test_equality_ignores_capacity() {
        let mut wide = BitSet::new(1000);
        wide.insert(7);
        assert_eq!(wide, [7].into_iter().collect::<BitSet>());
    }
}
