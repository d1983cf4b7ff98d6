#![forbid(unsafe_code)]

use bitvec::vec::BitVec;

use log::debug;
use stoch_markov::Proposition;

use crate::BlockIndex;
use crate::IndexedPartition;

/// Constructs the coarsest partition in which every block is exactly the set
/// of states that share the same truth vector over all propositions, so
/// `num_of_blocks` is at most `2^num_of_propositions`.
///
/// An empty proposition list yields the single block containing all states,
/// and zero states yield the empty partition.
pub fn initial_partition(num_of_states: usize, propositions: &[Proposition]) -> IndexedPartition {
    if num_of_states == 0 {
        return IndexedPartition::with_partition(Vec::new(), 0);
    }

    if propositions.is_empty() {
        return IndexedPartition::new(num_of_states);
    }

    debug_assert!(
        propositions
            .iter()
            .all(|proposition| proposition.states.len() == num_of_states),
        "Every proposition must be defined over all states"
    );

    // Compute all combinations of propositions that are realized by at least
    // one state. Every candidate is refined in place against the members and
    // non-members of each further proposition, so the candidate list never
    // holds more than one set per realized truth vector.
    let mut combinations: Vec<BitVec> = Vec::new();

    let members = propositions[0].states.clone();
    let non_members = !members.clone();
    combinations.push(members);
    combinations.push(non_members);

    for proposition in &propositions[1..] {
        let complement = !proposition.states.clone();

        let count = combinations.len();
        for index in 0..count {
            let mut members = combinations[index].clone();
            members &= proposition.states.as_bitslice();
            let mut non_members = combinations[index].clone();
            non_members &= complement.as_bitslice();

            if members.not_any() {
                combinations[index] = non_members;
            } else {
                combinations[index] = members;
                if non_members.any() {
                    combinations.push(non_members);
                }
            }
        }
    }

    combinations.retain(|combination| combination.any());
    debug!(
        "Initial partition has {} blocks for {} propositions",
        combinations.len(),
        propositions.len()
    );

    let mut partition = vec![BlockIndex::new(0); num_of_states];
    for (block, combination) in combinations.iter().enumerate() {
        for state in combination.iter_ones() {
            partition[state] = BlockIndex::new(block);
        }
    }

    IndexedPartition::with_partition(partition, combinations.len())
}
