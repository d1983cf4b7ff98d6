#![forbid(unsafe_code)]

use log::trace;

use stoch_markov::IncomingTransitions;
use stoch_markov::MarkovChain;
use stoch_markov::StateIndex;
use stoch_markov::TransitionSystem;

use crate::BlockIndex;
use crate::IndexedPartition;
use crate::Partition;

/// Absolute tolerance for comparing accumulated weights. Probability values
/// are sums of floating point products, so exact equality would spuriously
/// distinguish bisimilar states.
pub const ACCURACY: f64 = 1e-8;

/// Returns true iff the accumulated weights are equal within [ACCURACY].
fn is_weight_equal(left: f64, right: f64) -> bool {
    (left - right).abs() <= ACCURACY
}

/// Refines the given partition of a Markov chain to the coarsest stable
/// partition, reaching the same fixpoint as [crate::signature_refinement_naive]
/// in amortized near-linear time.
///
/// # Details
///
/// The states are kept in a permutation `elems` in which every block occupies
/// a contiguous range, with `location` as the inverse permutation. Blocks are
/// processed as splitters from a worklist: the weight of every transition
/// into the splitter is accumulated at its source state, the predecessor
/// states are marked by swapping them into the marked prefix of their block,
/// and every block containing both marked and unmarked states is split at the
/// borderline. Since marking only separates predecessors from
/// non-predecessors, the marked part is afterwards refined by weight value:
/// states whose weight differs from the block representative are split off,
/// sorted by weight and cut into runs of equal weight. Every newly created
/// block becomes a splitter itself, and the partition is stable exactly when
/// the worklist is empty.
pub fn valmari_refine(chain: &MarkovChain, initial: IndexedPartition) -> IndexedPartition {
    debug_assert_eq!(chain.num_of_states(), initial.len(), "The partition does not cover the chain");

    if chain.num_of_states() == 0 {
        return initial;
    }

    let incoming = IncomingTransitions::new(chain);
    let mut refiner = Refiner::new(&initial);
    refiner.refine(&incoming);

    IndexedPartition::with_partition(refiner.block, refiner.start.len())
}

struct Refiner {
    /// Permutation of the states in which every block occupies a contiguous
    /// range.
    elems: Vec<StateIndex>,

    /// The inverse of `elems`: the position of every state in the
    /// permutation.
    location: Vec<usize>,

    /// The block of every state.
    block: Vec<BlockIndex>,

    /// Range bounds per block: the block occupies `start..end` in `elems`.
    start: Vec<usize>,
    end: Vec<usize>,

    /// Cursor per block separating the marked elements `start..borderline`
    /// from the unmarked ones `borderline..end`. Equal to `start` for every
    /// block between two splitter passes.
    borderline: Vec<usize>,
}

impl Refiner {
    /// Groups the states contiguously per block with a counting sort over the
    /// initial partition.
    fn new(initial: &IndexedPartition) -> Refiner {
        let num_of_states = initial.len();
        let num_of_blocks = initial.num_of_blocks();
        let block: Vec<BlockIndex> = initial.iter().collect();

        let mut count = vec![0usize; num_of_blocks];
        for &b in &block {
            count[b.value()] += 1;
        }

        let mut end = vec![0usize; num_of_blocks];
        let mut running = 0usize;
        for (index, &size) in count.iter().enumerate() {
            debug_assert!(size > 0, "Block {index} of the initial partition is empty");
            running += size;
            end[index] = running;
        }

        // Place the states back to front so that the grouping is stable; the
        // cursors end up at the start of their block.
        let mut cursor = end.clone();
        let mut elems = vec![StateIndex::new(0); num_of_states];
        let mut location = vec![0usize; num_of_states];
        for state in (0..num_of_states).rev() {
            let b = block[state].value();
            cursor[b] -= 1;
            elems[cursor[b]] = StateIndex::new(state);
            location[state] = cursor[b];
        }

        let start = cursor.clone();
        let borderline = cursor;

        Refiner {
            elems,
            location,
            block,
            start,
            end,
            borderline,
        }
    }

    fn refine(&mut self, incoming: &IncomingTransitions) {
        let num_of_states = self.elems.len();

        // Unprocessed splitters, seeded with every initial block. Every block
        // created during refinement carries a fresh id and is pushed exactly
        // once, so the worklist never holds duplicates.
        let mut worklist: Vec<BlockIndex> = (0..self.start.len()).map(BlockIndex::new).collect();

        // Dense scratch for the accumulated predecessor weight per state,
        // reset through the touched list after every splitter so that a pass
        // costs no more than the predecessor edges of the splitter.
        let mut weight = vec![0.0f64; num_of_states];
        let mut touched: Vec<StateIndex> = Vec::new();
        let mut candidates: Vec<BlockIndex> = Vec::new();

        while let Some(splitter) = worklist.pop() {
            trace!("Processing splitter {splitter}");
            touched.clear();
            candidates.clear();

            // Accumulate the weight of every transition into the splitter at
            // its source state.
            for position in self.start[splitter.value()]..self.end[splitter.value()] {
                let target = self.elems[position];
                for (source, probability) in incoming.transitions_into(target) {
                    if weight[source.value()] == 0.0 {
                        touched.push(source);
                    }
                    weight[source.value()] += probability;
                }
            }

            // Mark every predecessor state within its block, collecting every
            // block that contains at least one predecessor.
            for &state in &touched {
                let b = self.block[state.value()];
                if self.borderline[b.value()] == self.start[b.value()] {
                    candidates.push(b);
                }
                self.mark(state);
            }

            for &candidate in &candidates {
                // When every element was marked the block is structurally
                // unaffected by this splitter; otherwise the marked prefix
                // becomes a new block.
                let refined = if self.borderline[candidate.value()] == self.end[candidate.value()] {
                    self.borderline[candidate.value()] = self.start[candidate.value()];
                    candidate
                } else {
                    let refined = self.split_marked(candidate);
                    worklist.push(refined);
                    refined
                };

                // Marking only distinguishes "has a transition into the
                // splitter" from "has none"; the elements of the refined
                // block can still carry different accumulated weights. The
                // representative is the weight at the first position of the
                // block.
                let representative = weight[self.elems[self.start[refined.value()]].value()];
                for position in self.start[refined.value()]..self.end[refined.value()] {
                    if !is_weight_equal(weight[self.elems[position].value()], representative) {
                        self.mark(self.elems[position]);
                    }
                }

                if self.borderline[refined.value()] != self.start[refined.value()] {
                    // Split off the elements that differ from the
                    // representative and separate them into runs of equal
                    // weight, each its own block.
                    let differing = self.split_marked(refined);
                    worklist.push(differing);
                    self.sort_by_weight(differing, &weight);
                    self.cut_weight_runs(differing, &weight, &mut worklist);
                }
            }

            // Reset the scratch entries touched by this splitter.
            for &state in &touched {
                weight[state.value()] = 0.0;
            }

            self.assert_consistent();
        }
    }

    /// Marks the given state by swapping it to the borderline of its block
    /// and advancing the borderline.
    fn mark(&mut self, state: StateIndex) {
        let b = self.block[state.value()];
        let position = self.location[state.value()];
        let borderline = self.borderline[b.value()];
        debug_assert!(position >= borderline, "State {state} is already marked");

        self.swap_positions(position, borderline);
        self.borderline[b.value()] += 1;
    }

    /// Splits the marked prefix `start..borderline` off into a new block; the
    /// unmarked suffix keeps the old block id with a shrunken range.
    fn split_marked(&mut self, block_index: BlockIndex) -> BlockIndex {
        let begin = self.start[block_index.value()];
        let middle = self.borderline[block_index.value()];
        let end = self.end[block_index.value()];
        debug_assert!(
            begin < middle && middle < end,
            "A split requires both marked and unmarked elements"
        );

        let new_block = BlockIndex::new(self.start.len());
        self.start.push(begin);
        self.end.push(middle);
        self.borderline.push(begin);

        self.start[block_index.value()] = middle;
        self.borderline[block_index.value()] = middle;

        for position in begin..middle {
            self.block[self.elems[position].value()] = new_block;
        }

        trace!("Split block {block_index} into {block_index} and {new_block}");
        new_block
    }

    /// Sorts the elements of the given block by their accumulated weight,
    /// keeping `location` in sync.
    fn sort_by_weight(&mut self, block_index: BlockIndex, weight: &[f64]) {
        let begin = self.start[block_index.value()];
        let end = self.end[block_index.value()];

        self.elems[begin..end].sort_by(|left, right| weight[left.value()].total_cmp(&weight[right.value()]));
        for position in begin..end {
            self.location[self.elems[position].value()] = position;
        }
    }

    /// Cuts a block that is sorted by weight into maximal runs of equal
    /// weight. The first run keeps the block id, every further run becomes a
    /// new block and a splitter. A run is closed against the weight of its
    /// first element, so the tolerance cannot chain across a gradient of
    /// weights.
    fn cut_weight_runs(&mut self, block_index: BlockIndex, weight: &[f64], worklist: &mut Vec<BlockIndex>) {
        let begin = self.start[block_index.value()];
        let end = self.end[block_index.value()];

        let mut run_start = begin;
        for position in begin + 1..end {
            if !is_weight_equal(
                weight[self.elems[position].value()],
                weight[self.elems[run_start].value()],
            ) {
                if run_start == begin {
                    // The first run keeps the block id with a shrunken range.
                    self.end[block_index.value()] = position;
                } else {
                    self.new_run_block(run_start, position, worklist);
                }
                run_start = position;
            }
        }

        if run_start != begin {
            self.new_run_block(run_start, end, worklist);
        }
    }

    /// Registers `begin..end` as a new block and enqueues it as a splitter.
    fn new_run_block(&mut self, begin: usize, end: usize, worklist: &mut Vec<BlockIndex>) {
        let new_block = BlockIndex::new(self.start.len());
        self.start.push(begin);
        self.end.push(end);
        self.borderline.push(begin);

        for position in begin..end {
            self.block[self.elems[position].value()] = new_block;
        }

        worklist.push(new_block);
    }

    /// Swaps the elements at the given positions and updates `location`.
    fn swap_positions(&mut self, left: usize, right: usize) {
        self.elems.swap(left, right);
        self.location[self.elems[left].value()] = left;
        self.location[self.elems[right].value()] = right;
    }

    /// Checks the permutation and range invariants between splitter passes.
    fn assert_consistent(&self) {
        if cfg!(debug_assertions) {
            for (position, &state) in self.elems.iter().enumerate() {
                debug_assert_eq!(
                    self.location[state.value()],
                    position,
                    "The location array is not the inverse of the permutation"
                );
            }

            let mut covered = vec![false; self.elems.len()];
            for b in 0..self.start.len() {
                debug_assert!(self.start[b] < self.end[b], "Block {b} has an empty range");
                debug_assert_eq!(
                    self.start[b], self.borderline[b],
                    "Block {b} still has marked elements between splitter passes"
                );

                for position in self.start[b]..self.end[b] {
                    let state = self.elems[position];
                    debug_assert!(!covered[position], "Position {position} is covered by multiple blocks");
                    covered[position] = true;
                    debug_assert_eq!(
                        self.block[state.value()].value(),
                        b,
                        "State {state} does not lie within the range of its block"
                    );
                }
            }

            debug_assert!(
                !covered.contains(&false),
                "The block ranges do not tile the permutation"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use stoch_markov::Proposition;
    use stoch_markov::random_markov_chain;
    use stoch_markov::random_propositions;
    use stoch_utilities::random_test;

    use crate::initial_partition;
    use crate::signature_refinement_naive;

    /// Returns true iff the partitions induce the same equivalence relation,
    /// runs in O(n^2).
    fn equal_partitions(left: &impl Partition, right: &impl Partition) -> bool {
        for block_index in (0..left.num_of_blocks()).map(BlockIndex::new) {
            let mut other_block_index = None;

            for state_index in (0..left.len())
                .map(StateIndex::new)
                .filter(|&state_index| left.block_number(state_index) == block_index)
            {
                match other_block_index {
                    None => other_block_index = Some(right.block_number(state_index)),
                    Some(other_block_index) => {
                        if right.block_number(state_index) != other_block_index {
                            return false;
                        }
                    }
                }
            }
        }

        for block_index in (0..right.num_of_blocks()).map(BlockIndex::new) {
            let mut other_block_index = None;

            for state_index in (0..right.len())
                .map(StateIndex::new)
                .filter(|&state_index| right.block_number(state_index) == block_index)
            {
                match other_block_index {
                    None => other_block_index = Some(left.block_number(state_index)),
                    Some(other_block_index) => {
                        if left.block_number(state_index) != other_block_index {
                            return false;
                        }
                    }
                }
            }
        }

        true
    }

    #[test]
    fn test_valmari_splits_by_distance_to_target() {
        let mut chain = MarkovChain::new(3);
        chain.set_probability(StateIndex::new(0), StateIndex::new(1), 1.0);
        chain.set_probability(StateIndex::new(1), StateIndex::new(2), 1.0);
        chain.set_probability(StateIndex::new(2), StateIndex::new(2), 1.0);

        let proposition = Proposition::from_states("target", 3, &[2]);
        let partition = valmari_refine(&chain, initial_partition(3, &[proposition]));

        assert_eq!(partition.num_of_blocks(), 3);
    }

    #[test]
    fn test_valmari_merges_self_loops() {
        let mut chain = MarkovChain::new(2);
        chain.set_probability(StateIndex::new(0), StateIndex::new(0), 1.0);
        chain.set_probability(StateIndex::new(1), StateIndex::new(1), 1.0);

        let partition = valmari_refine(&chain, initial_partition(2, &[]));
        assert_eq!(partition.num_of_blocks(), 1);
    }

    /// Two states moving their mass into the same target, with weights that
    /// differ by the given amount.
    fn tolerance_chain(difference: f64) -> MarkovChain {
        let mut chain = MarkovChain::new(3);
        chain.set_probability(StateIndex::new(0), StateIndex::new(2), 0.5);
        chain.set_probability(StateIndex::new(1), StateIndex::new(2), 0.5 + difference);
        chain.set_probability(StateIndex::new(2), StateIndex::new(2), 1.0);
        chain
    }

    #[test]
    fn test_valmari_tolerance_boundary() {
        let proposition = Proposition::from_states("target", 3, &[2]);

        // A difference below the tolerance keeps the pair merged.
        let partition = valmari_refine(&tolerance_chain(5e-9), initial_partition(3, &[proposition.clone()]));
        assert_eq!(partition.num_of_blocks(), 2);
        assert_eq!(
            partition.block_number(StateIndex::new(0)),
            partition.block_number(StateIndex::new(1))
        );

        // A difference above the tolerance splits the pair.
        let partition = valmari_refine(&tolerance_chain(5e-7), initial_partition(3, &[proposition]));
        assert_eq!(partition.num_of_blocks(), 3);
    }

    #[test]
    fn test_valmari_weight_runs() {
        // Four states move mass 0.25, 0.5, 0.5 and 1.0 into the absorbing
        // state. The weight refinement must separate all three weight
        // classes in a single pass, regardless of which one carries the
        // representative weight.
        let mut chain = MarkovChain::new(5);
        chain.set_probability(StateIndex::new(0), StateIndex::new(4), 0.25);
        chain.set_probability(StateIndex::new(1), StateIndex::new(4), 0.5);
        chain.set_probability(StateIndex::new(2), StateIndex::new(4), 0.5);
        chain.set_probability(StateIndex::new(3), StateIndex::new(4), 1.0);
        chain.set_probability(StateIndex::new(4), StateIndex::new(4), 1.0);

        let proposition = Proposition::from_states("target", 5, &[4]);
        let partition = valmari_refine(&chain, initial_partition(5, &[proposition]));

        assert_eq!(partition.num_of_blocks(), 4);
        assert_eq!(
            partition.block_number(StateIndex::new(1)),
            partition.block_number(StateIndex::new(2))
        );
        assert_ne!(
            partition.block_number(StateIndex::new(0)),
            partition.block_number(StateIndex::new(3))
        );
    }

    #[test]
    fn test_valmari_empty_chain() {
        let chain = MarkovChain::new(0);
        let partition = valmari_refine(&chain, initial_partition(0, &[]));
        assert_eq!(partition.num_of_blocks(), 0);
    }

    #[test]
    fn test_valmari_is_idempotent() {
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let propositions = random_propositions(rng, 10, 2);

            let stable = valmari_refine(&chain, initial_partition(10, &propositions));
            let again = valmari_refine(&chain, stable.clone());

            assert_eq!(stable.num_of_blocks(), again.num_of_blocks());
            assert!(equal_partitions(&stable, &again));
        });
    }

    #[test]
    fn test_random_agreement_with_naive() {
        // Both engines must reach the coarsest fixpoint: the same number of
        // blocks and the same induced equivalence, although block ids may
        // differ. The generated weights are dyadic, so the exact and the
        // tolerance based weight comparisons coincide.
        random_test(100, |rng| {
            let chain = random_markov_chain(rng, 10, 3);
            let propositions = random_propositions(rng, 10, 2);

            let initial = initial_partition(10, &propositions);
            let expected = signature_refinement_naive(&chain, initial.clone());
            let result = valmari_refine(&chain, initial);

            assert_eq!(expected.num_of_blocks(), result.num_of_blocks());
            assert!(
                equal_partitions(&expected, &result),
                "Naive {expected} and Valmari {result} disagree"
            );
        });
    }
}
