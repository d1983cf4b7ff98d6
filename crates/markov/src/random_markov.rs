#![forbid(unsafe_code)]

use bitvec::vec::BitVec;
use rand::Rng;

use crate::MarkovChain;
use crate::Proposition;
use crate::StateIndex;

/// Generates a random Markov chain with the desired number of states and out
/// degree.
///
/// All weights are multiples of 1/4, so that sums of weights lifted to any
/// partition are exact in floating point. This keeps the exact signature
/// comparison of the naive engine and the tolerance based comparison of the
/// efficient engine interchangeable on generated models.
pub fn random_markov_chain(rng: &mut impl Rng, num_of_states: usize, outdegree: usize) -> MarkovChain {
    assert!(num_of_states > 0, "Cannot generate an empty Markov chain");

    let mut chain = MarkovChain::new(num_of_states);

    for state_index in 0..num_of_states {
        for _ in 0..rng.random_range(1..=outdegree) {
            let target = rng.random_range(0..num_of_states);
            let weight = rng.random_range(1..=4) as f64 * 0.25;

            chain.add_probability(StateIndex::new(state_index), StateIndex::new(target), weight);
        }
    }

    chain
}

/// Generates random propositions over the given number of states, each state
/// satisfying each proposition with probability one half.
pub fn random_propositions(rng: &mut impl Rng, num_of_states: usize, num_of_propositions: usize) -> Vec<Proposition> {
    (0..num_of_propositions)
        .map(|index| {
            let mut states = BitVec::repeat(false, num_of_states);
            for state in 0..num_of_states {
                if rng.random_bool(0.5) {
                    states.set(state, true);
                }
            }

            Proposition::new(format!("p{index}"), states)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use stoch_utilities::random_test;

    use crate::TransitionSystem;

    #[test]
    fn test_random_markov_chain() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            assert_eq!(chain.num_of_states(), 10);

            // Every state has at least one outgoing transition.
            for state_index in chain.iter_states() {
                assert!(!chain.distribution(state_index).is_empty());
            }
        });
    }
}
