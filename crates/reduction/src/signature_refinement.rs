#![forbid(unsafe_code)]

use bumpalo::Bump;
use log::debug;
use log::trace;
use rustc_hash::FxHashMap;

use stoch_markov::TransitionSystem;
use stoch_utilities::TimeProgress;

use crate::BlockIndex;
use crate::IndexedPartition;
use crate::Partition;
use crate::Signature;
use crate::SignatureBuilder;
use crate::state_signature;

/// Refines the given partition to the coarsest stable partition by repeated
/// signature computation.
///
/// Every pass computes the signature of every state lifted to the current
/// partition and assigns a fresh dense block number to each distinct
/// (old block, signature) pair. The partition is stable exactly when the
/// number of distinct pairs equals the previous number of blocks; the number
/// of blocks grows strictly otherwise, so the loop terminates after at most
/// `num_of_states` passes. This is the quadratic worst-case baseline that
/// [crate::valmari_refine] improves upon, but it serves chains and MDPs
/// uniformly.
pub fn signature_refinement_naive<T: TransitionSystem>(ts: &T, initial: IndexedPartition) -> IndexedPartition {
    let mut partition = initial;
    let mut builder = SignatureBuilder::default();
    let mut iteration = 0usize;

    let progress = TimeProgress::new(
        |(iteration, blocks)| {
            debug!("Iteration {iteration}, found {blocks} blocks...");
        },
        5,
    );

    loop {
        // The signatures of one pass live in the arena, which is dropped with
        // the intern map before the next pass starts.
        let arena = Bump::new();
        let mut choices = Vec::new();
        let mut id: FxHashMap<(BlockIndex, Signature<'_>), BlockIndex> = FxHashMap::default();
        let mut next_partition = vec![BlockIndex::new(0); ts.num_of_states()];

        for state_index in ts.iter_states() {
            let signature = state_signature(ts, state_index, &partition, &arena, &mut builder, &mut choices);
            trace!("State {state_index} signature {signature:?}");

            let key = (partition.block_number(state_index), signature);
            let number = if let Some(index) = id.get(&key) {
                *index
            } else {
                let number = BlockIndex::new(id.len());
                id.insert(key, number);
                number
            };

            next_partition[state_index.value()] = number;
        }

        let num_of_blocks = id.len();
        debug_assert!(
            num_of_blocks >= partition.num_of_blocks(),
            "Refinement can only split blocks, never merge them"
        );

        if num_of_blocks == partition.num_of_blocks() {
            // Every block had a single signature, so the partition is stable.
            break;
        }

        partition = IndexedPartition::with_partition(next_partition, num_of_blocks);

        iteration += 1;
        progress.print((iteration, num_of_blocks));

        debug_assert!(
            iteration <= ts.num_of_states().max(2),
            "There can never be more splits than the number of states"
        );
    }

    trace!("Refinement partition {partition}");
    debug_assert!(
        is_valid_refinement(ts, &partition),
        "The resulting partition is not stable"
    );
    partition
}

/// Returns true iff all states in the same block of the partition have the
/// same signature lifted to that partition.
pub fn is_valid_refinement<T: TransitionSystem>(ts: &T, partition: &impl Partition) -> bool {
    let arena = Bump::new();
    let mut builder = SignatureBuilder::default();
    let mut choices = Vec::new();
    let mut block_to_signature: Vec<Option<Signature<'_>>> = vec![None; partition.num_of_blocks()];

    for state_index in ts.iter_states() {
        let block = partition.block_number(state_index);
        let signature = state_signature(ts, state_index, partition, &arena, &mut builder, &mut choices);

        match block_to_signature[block.value()] {
            Some(block_signature) => {
                if signature != block_signature {
                    trace!(
                        "State {state_index} has signature {signature:?}, but its block {block} has signature {block_signature:?}"
                    );
                    return false;
                }
            }
            None => block_to_signature[block.value()] = Some(signature),
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use stoch_markov::Distribution;
    use stoch_markov::MarkovChain;
    use stoch_markov::Mdp;
    use stoch_markov::Proposition;
    use stoch_markov::StateIndex;
    use stoch_markov::random_markov_chain;
    use stoch_markov::random_propositions;
    use stoch_utilities::random_test;

    use crate::initial_partition;

    /// The chain 0 -> 1 -> 2 -> 2, all with probability one.
    fn three_state_chain() -> MarkovChain {
        let mut chain = MarkovChain::new(3);
        chain.set_probability(StateIndex::new(0), StateIndex::new(1), 1.0);
        chain.set_probability(StateIndex::new(1), StateIndex::new(2), 1.0);
        chain.set_probability(StateIndex::new(2), StateIndex::new(2), 1.0);
        chain
    }

    #[test]
    fn test_refinement_splits_by_distance_to_target() {
        // The proposition only holds in state 2, so initially 0 and 1 share a
        // block. Their signatures differ because only state 1 moves all mass
        // into the target block, so refinement ends with three singletons.
        let chain = three_state_chain();
        let proposition = Proposition::from_states("target", 3, &[2]);

        let initial = initial_partition(3, &[proposition]);
        assert_eq!(initial.num_of_blocks(), 2);

        let partition = signature_refinement_naive(&chain, initial);
        assert_eq!(partition.num_of_blocks(), 3);
    }

    #[test]
    fn test_refinement_merges_self_loops() {
        // Two states with a probability one self loop and no distinguishing
        // proposition collapse into a single block.
        let mut chain = MarkovChain::new(2);
        chain.set_probability(StateIndex::new(0), StateIndex::new(0), 1.0);
        chain.set_probability(StateIndex::new(1), StateIndex::new(1), 1.0);

        let partition = signature_refinement_naive(&chain, initial_partition(2, &[]));
        assert_eq!(partition.num_of_blocks(), 1);
    }

    #[test]
    fn test_refinement_is_idempotent() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let propositions = random_propositions(rng, 10, 2);

            let stable = signature_refinement_naive(&chain, initial_partition(10, &propositions));
            let again = signature_refinement_naive(&chain, stable.clone());

            assert_eq!(stable.num_of_blocks(), again.num_of_blocks());
        });
    }

    #[test]
    fn test_refinement_monotonic_growth() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let propositions = random_propositions(rng, 10, 2);

            let initial = initial_partition(10, &propositions);
            let blocks_before = initial.num_of_blocks();
            let partition = signature_refinement_naive(&chain, initial);

            assert!(partition.num_of_blocks() >= blocks_before);
            assert!(is_valid_refinement(&chain, &partition));
        });
    }

    #[test]
    fn test_refinement_preserves_propositions() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let propositions = random_propositions(rng, 10, 2);

            let partition = signature_refinement_naive(&chain, initial_partition(10, &propositions));

            // Two states in the same block never disagree on a proposition.
            for left in chain.iter_states() {
                for right in chain.iter_states() {
                    if partition.block_number(left) == partition.block_number(right) {
                        for proposition in &propositions {
                            assert_eq!(proposition.holds_in(left), proposition.holds_in(right));
                        }
                    }
                }
            }
        });
    }

    #[test]
    fn test_refinement_mdp_choices() {
        // State 0 has two choices that point to distinct but bisimilar
        // absorbing states; states 3 and 4 are copies of state 0. All of
        // 0, 3, 4 must end up together, separate from the absorbing states.
        let mut mdp = Mdp::new(5);
        let alpha = mdp.add_action("alpha");

        for source in [0, 3, 4] {
            let mut to_first = Distribution::new();
            to_first.add(StateIndex::new(1), 1.0);
            let mut to_second = Distribution::new();
            to_second.add(StateIndex::new(2), 1.0);
            mdp.add_choice(StateIndex::new(source), Some(alpha), to_first);
            mdp.add_choice(StateIndex::new(source), Some(alpha), to_second);
        }
        for absorbing in [1, 2] {
            let mut distribution = Distribution::new();
            distribution.add(StateIndex::new(absorbing), 1.0);
            mdp.add_choice(StateIndex::new(absorbing), Some(alpha), distribution);
        }

        let absorbing = Proposition::from_states("absorbing", 5, &[1, 2]);
        let partition = signature_refinement_naive(&mdp, initial_partition(5, &[absorbing]));

        assert_eq!(partition.num_of_blocks(), 2);
        assert_eq!(
            partition.block_number(StateIndex::new(0)),
            partition.block_number(StateIndex::new(3))
        );
        assert_eq!(
            partition.block_number(StateIndex::new(1)),
            partition.block_number(StateIndex::new(2))
        );
    }

    #[test]
    fn test_refinement_empty_model() {
        let chain = MarkovChain::new(0);
        let partition = signature_refinement_naive(&chain, initial_partition(0, &[]));
        assert_eq!(partition.num_of_blocks(), 0);
    }
}
