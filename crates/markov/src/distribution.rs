#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use crate::StateIndex;

/// A sparse mapping from target states to non-negative weights, either
/// probabilities or rates. The support is kept sorted by target state so that
/// iteration order, and therefore structural equality, is deterministic.
///
/// Zero weights are never stored: adding a zero weight for an absent target is
/// a no-op, and `set` with a zero weight removes the entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Distribution {
    support: Vec<(StateIndex, f64)>,
}

impl Distribution {
    /// Creates an empty distribution.
    pub fn new() -> Distribution {
        Distribution { support: Vec::new() }
    }

    /// Adds the given weight to the weight of the target state.
    pub fn add(&mut self, target: StateIndex, weight: f64) {
        match self.support.binary_search_by_key(&target, |&(state, _)| state) {
            Ok(index) => self.support[index].1 += weight,
            Err(index) => {
                if weight != 0.0 {
                    self.support.insert(index, (target, weight));
                }
            }
        }
    }

    /// Sets the weight of the target state, removing the entry when the weight
    /// is zero.
    pub fn set(&mut self, target: StateIndex, weight: f64) {
        match self.support.binary_search_by_key(&target, |&(state, _)| state) {
            Ok(index) => {
                if weight == 0.0 {
                    self.support.remove(index);
                } else {
                    self.support[index].1 = weight;
                }
            }
            Err(index) => {
                if weight != 0.0 {
                    self.support.insert(index, (target, weight));
                }
            }
        }
    }

    /// Returns the weight of the target state, zero when the state is not in
    /// the support.
    pub fn get(&self, target: StateIndex) -> f64 {
        match self.support.binary_search_by_key(&target, |&(state, _)| state) {
            Ok(index) => self.support[index].1,
            Err(_) => 0.0,
        }
    }

    /// Iterates over the (target, weight) pairs in order of target state.
    pub fn iter(&self) -> impl Iterator<Item = (StateIndex, f64)> + '_ {
        self.support.iter().copied()
    }

    /// Returns the number of states in the support.
    pub fn len(&self) -> usize {
        self.support.len()
    }

    /// Returns true iff the distribution has an empty support.
    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    /// Returns the total weight of the distribution.
    pub fn sum(&self) -> f64 {
        self.support.iter().map(|&(_, weight)| weight).sum()
    }
}

impl FromIterator<(StateIndex, f64)> for Distribution {
    fn from_iter<I: IntoIterator<Item = (StateIndex, f64)>>(iter: I) -> Self {
        let mut distribution = Distribution::new();
        for (target, weight) in iter {
            distribution.add(target, weight);
        }
        distribution
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.support
                .iter()
                .format_with(", ", |(target, weight), f| f(&format_args!("{target}: {weight}")))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_accumulates() {
        let mut distribution = Distribution::new();
        distribution.add(StateIndex::new(3), 0.25);
        distribution.add(StateIndex::new(1), 0.5);
        distribution.add(StateIndex::new(3), 0.25);

        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution.get(StateIndex::new(3)), 0.5);
        assert_eq!(distribution.sum(), 1.0);

        // Support iterates in target order.
        let targets: Vec<usize> = distribution.iter().map(|(target, _)| target.value()).collect();
        assert_eq!(targets, vec![1, 3]);
    }

    #[test]
    fn test_distribution_zero_weights() {
        let mut distribution = Distribution::new();
        distribution.add(StateIndex::new(0), 0.0);
        assert!(distribution.is_empty());

        distribution.set(StateIndex::new(0), 0.75);
        distribution.set(StateIndex::new(0), 0.0);
        assert!(distribution.is_empty());
    }
}
