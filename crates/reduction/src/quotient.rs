#![forbid(unsafe_code)]

use bitvec::vec::BitVec;

use stoch_markov::Distribution;
use stoch_markov::MarkovChain;
use stoch_markov::Mdp;
use stoch_markov::Proposition;
use stoch_markov::StateIndex;
use stoch_markov::TransitionSystem;

use crate::MinimisationError;
use crate::Partition;

/// Returns, per block, the representative member with the smallest state
/// index.
pub fn block_representatives(partition: &impl Partition) -> Result<Vec<StateIndex>, MinimisationError> {
    let mut representatives: Vec<Option<StateIndex>> = vec![None; partition.num_of_blocks()];

    for state_index in (0..partition.len()).map(StateIndex::new) {
        let block = partition.block_number(state_index);
        if representatives[block.value()].is_none() {
            representatives[block.value()] = Some(state_index);
        }
    }

    representatives
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(MinimisationError::InternalInvariantViolation(
            "every block of a refined partition must have at least one member",
        ))
}

/// Builds the quotient chain: one state per block whose outgoing distribution
/// is the representative's distribution lifted to the partition. All members
/// of a stable block have identical lifted distributions, so any
/// representative suffices.
pub fn quotient_markov_chain(
    chain: &MarkovChain,
    partition: &impl Partition,
) -> Result<(MarkovChain, Vec<StateIndex>), MinimisationError> {
    let representatives = block_representatives(partition)?;
    let mut quotient = MarkovChain::new(partition.num_of_blocks());

    for (block, &representative) in representatives.iter().enumerate() {
        for (target, weight) in chain.distribution(representative).iter() {
            quotient.add_probability(
                StateIndex::new(block),
                StateIndex::new(partition.block_number(target).value()),
                weight,
            );
        }
    }

    Ok((quotient, representatives))
}

/// Builds the quotient MDP from the representative of every block. Choices
/// that lift to the same distribution collapse through the duplicate
/// suppression of [Mdp::add_choice].
pub fn quotient_mdp(mdp: &Mdp, partition: &impl Partition) -> Result<(Mdp, Vec<StateIndex>), MinimisationError> {
    let representatives = block_representatives(partition)?;
    let mut quotient = Mdp::new(partition.num_of_blocks());
    for action in mdp.actions() {
        quotient.add_action(action);
    }

    for (block, &representative) in representatives.iter().enumerate() {
        for choice in mdp.choices(representative) {
            let mut lifted = Distribution::new();
            for (target, weight) in choice.distribution.iter() {
                lifted.add(StateIndex::new(partition.block_number(target).value()), weight);
            }

            quotient.add_choice(StateIndex::new(block), choice.action, lifted);
        }
    }

    Ok((quotient, representatives))
}

/// Images every proposition onto the quotient: a block satisfies a
/// proposition iff any, equivalently every, member state did.
pub fn lift_propositions(propositions: &[Proposition], partition: &impl Partition) -> Vec<Proposition> {
    propositions
        .iter()
        .map(|proposition| {
            let mut states = BitVec::repeat(false, partition.num_of_blocks());
            for state in proposition.states.iter_ones() {
                states.set(partition.block_number(StateIndex::new(state)).value(), true);
            }

            Proposition::new(proposition.name.clone(), states)
        })
        .collect()
}
