#![forbid(unsafe_code)]

use crate::MarkovChain;
use crate::StateIndex;
use crate::TransitionSystem;

/// Stores the weighted incoming transitions of a Markov chain, so that the
/// predecessors of a state can be enumerated in time proportional to their
/// number rather than to the number of states.
pub struct IncomingTransitions {
    /// Offset of the first incoming transition per target state, with a
    /// sentinel entry at the end.
    state2incoming: Vec<usize>,
    sources: Vec<StateIndex>,
    weights: Vec<f64>,
}

impl IncomingTransitions {
    pub fn new(chain: &MarkovChain) -> IncomingTransitions {
        let mut state2incoming = vec![0usize; chain.num_of_states() + 1];

        // Count the number of incoming transitions for each state.
        for state_index in chain.iter_states() {
            for (target, _) in chain.distribution(state_index).iter() {
                state2incoming[target.value() + 1] += 1;
            }
        }

        // Compute the start offsets (prefix sum).
        for index in 1..state2incoming.len() {
            state2incoming[index] += state2incoming[index - 1];
        }

        // Place the transitions, using the offsets as write cursors.
        let num_of_transitions = state2incoming[chain.num_of_states()];
        let mut cursor = state2incoming.clone();
        let mut sources = vec![StateIndex::new(0); num_of_transitions];
        let mut weights = vec![0.0f64; num_of_transitions];

        for state_index in chain.iter_states() {
            for (target, weight) in chain.distribution(state_index).iter() {
                let position = cursor[target.value()];
                sources[position] = state_index;
                weights[position] = weight;
                cursor[target.value()] += 1;
            }
        }

        IncomingTransitions {
            state2incoming,
            sources,
            weights,
        }
    }

    /// Returns an iterator over the (source, weight) pairs of transitions into
    /// the given state.
    pub fn transitions_into(&self, target: StateIndex) -> impl Iterator<Item = (StateIndex, f64)> + '_ {
        let start = self.state2incoming[target.value()];
        let end = self.state2incoming[target.value() + 1];
        (start..end).map(move |index| (self.sources[index], self.weights[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use stoch_utilities::random_test;

    use crate::random_markov_chain;

    #[test]
    fn test_random_incoming_transitions() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let incoming = IncomingTransitions::new(&chain);

            // Check that for every outgoing transition there is an incoming transition.
            for state_index in chain.iter_states() {
                for (target, weight) in chain.distribution(state_index).iter() {
                    let found = incoming
                        .transitions_into(target)
                        .any(|(source, incoming_weight)| source == state_index && incoming_weight == weight);
                    assert!(
                        found,
                        "Outgoing transition ({state_index}, {target}, {weight}) should have an incoming transition"
                    );
                }
            }

            // Check that all incoming transitions belong to some outgoing transition.
            for state_index in chain.iter_states() {
                for (source, weight) in incoming.transitions_into(state_index) {
                    assert_eq!(
                        chain.distribution(source).get(state_index),
                        weight,
                        "Incoming transition ({source}, {state_index}) should match the outgoing distribution"
                    );
                }
            }
        });
    }
}
