#![forbid(unsafe_code)]

use std::fmt;
use std::iter;

use itertools::Itertools;

use crate::Choice;
use crate::Distribution;
use crate::StateIndex;
use crate::TransitionSystem;

/// Simple explicit-state representation of a Markov chain: every state has a
/// single outgoing distribution. The same storage serves discrete time chains
/// (weights are probabilities) and continuous time chains (weights are
/// rates); the distinction is made by the [crate::Model] wrapper.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkovChain {
    distributions: Vec<Distribution>,
}

impl MarkovChain {
    /// Creates a new chain with the given number of states and no transitions.
    pub fn new(num_of_states: usize) -> MarkovChain {
        MarkovChain {
            distributions: vec![Distribution::new(); num_of_states],
        }
    }

    /// Sets the probability (or rate) of moving from one state to another.
    pub fn set_probability(&mut self, from: StateIndex, to: StateIndex, probability: f64) {
        self.distributions[from].set(to, probability);
    }

    /// Adds to the probability (or rate) of moving from one state to another.
    pub fn add_probability(&mut self, from: StateIndex, to: StateIndex, probability: f64) {
        self.distributions[from].add(to, probability);
    }

    /// Returns the outgoing distribution of the given state.
    pub fn distribution(&self, state_index: StateIndex) -> &Distribution {
        &self.distributions[state_index]
    }
}

impl TransitionSystem for MarkovChain {
    fn num_of_states(&self) -> usize {
        self.distributions.len()
    }

    fn num_of_choices(&self, _state_index: StateIndex) -> usize {
        1
    }

    fn choices(&self, state_index: StateIndex) -> impl Iterator<Item = Choice<'_>> + '_ {
        iter::once(Choice {
            action: None,
            distribution: &self.distributions[state_index],
        })
    }

    fn num_of_transitions(&self) -> usize {
        self.distributions.iter().map(|distribution| distribution.len()).sum()
    }
}

impl fmt::Display for MarkovChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[ {} ]",
            self.distributions
                .iter()
                .enumerate()
                .format_with(", ", |(state, distribution), f| {
                    f(&format_args!("{state}: {distribution}"))
                })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markov_chain() {
        let mut chain = MarkovChain::new(3);
        chain.set_probability(StateIndex::new(0), StateIndex::new(1), 0.5);
        chain.set_probability(StateIndex::new(0), StateIndex::new(2), 0.5);
        chain.set_probability(StateIndex::new(1), StateIndex::new(1), 1.0);

        assert_eq!(chain.num_of_states(), 3);
        assert_eq!(chain.num_of_transitions(), 3);
        assert_eq!(chain.num_of_choices(StateIndex::new(0)), 1);

        let choice = chain.choices(StateIndex::new(0)).next().unwrap();
        assert!(choice.action.is_none());
        assert_eq!(choice.distribution.sum(), 1.0);

        // The deadlock state has an empty distribution.
        assert!(chain.distribution(StateIndex::new(2)).is_empty());
    }
}
