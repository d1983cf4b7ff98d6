#![forbid(unsafe_code)]

use std::fmt;

use itertools::Itertools;

use stoch_markov::StateIndex;
use stoch_utilities::TaggedIndex;

/// A zero sized tag for the blocks of a partition.
pub struct BlockTag;

/// The index for blocks.
pub type BlockIndex = TaggedIndex<BlockTag>;

/// A trait for partition refinement algorithms that expose the block number
/// for every state. Can be used to compute the quotient of a model.
///
/// The invariants are that every state belongs to exactly one block, that
/// block numbers are dense in `0..num_of_blocks()`, and that every block is
/// non-empty.
pub trait Partition {
    /// Returns the block number for the given state.
    fn block_number(&self, state_index: StateIndex) -> BlockIndex;

    /// Returns the number of blocks in the partition.
    fn num_of_blocks(&self) -> usize;

    /// Returns the number of elements in the partition.
    fn len(&self) -> usize;

    /// Returns whether the partition is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Defines a partition based on an explicit indexing of elements to their
/// block number.
#[derive(Clone, Debug)]
pub struct IndexedPartition {
    partition: Vec<BlockIndex>,

    num_of_blocks: usize,
}

impl IndexedPartition {
    /// Create a new partition where all elements are in a single block.
    pub fn new(num_of_elements: usize) -> IndexedPartition {
        IndexedPartition {
            partition: vec![BlockIndex::new(0); num_of_elements],
            num_of_blocks: if num_of_elements == 0 { 0 } else { 1 },
        }
    }

    /// Create a new partition with the given partitioning. The block numbers
    /// must be dense, every block in `0..num_of_blocks` non-empty.
    pub fn with_partition(partition: Vec<BlockIndex>, num_of_blocks: usize) -> IndexedPartition {
        let result = IndexedPartition {
            partition,
            num_of_blocks,
        };

        result.assert_consistent();
        result
    }

    /// Iterates over the block number of every element.
    pub fn iter(&self) -> impl Iterator<Item = BlockIndex> + '_ {
        self.partition.iter().copied()
    }

    /// Returns true iff the partition invariants hold.
    fn assert_consistent(&self) {
        if cfg!(debug_assertions) {
            let mut occupied = vec![false; self.num_of_blocks];
            for (element, block) in self.partition.iter().enumerate() {
                debug_assert!(
                    block.value() < self.num_of_blocks,
                    "Partition {self}, element {element} has block number {block} out of bounds"
                );
                occupied[block.value()] = true;
            }

            debug_assert!(
                !occupied.contains(&false),
                "Partition {self} contains empty blocks"
            );
        }
    }
}

impl Partition for IndexedPartition {
    fn block_number(&self, state_index: StateIndex) -> BlockIndex {
        self.partition[state_index.value()]
    }

    fn num_of_blocks(&self) -> usize {
        self.num_of_blocks
    }

    fn len(&self) -> usize {
        self.partition.len()
    }
}

impl fmt::Display for IndexedPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks = (0..self.num_of_blocks).format_with(", ", |block, f| {
            let members = self
                .partition
                .iter()
                .enumerate()
                .filter(move |(_, other)| other.value() == block)
                .map(|(element, _)| element)
                .format(", ");

            f(&format_args!("{{{members}}}"))
        });

        write!(f, "{{{blocks}}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_partition() {
        let partition = IndexedPartition::new(4);
        assert_eq!(partition.num_of_blocks(), 1);
        assert_eq!(partition.len(), 4);

        let partition = IndexedPartition::with_partition(
            vec![
                BlockIndex::new(1),
                BlockIndex::new(0),
                BlockIndex::new(1),
                BlockIndex::new(2),
            ],
            3,
        );

        assert_eq!(partition.num_of_blocks(), 3);
        assert_eq!(partition.block_number(StateIndex::new(0)), partition.block_number(StateIndex::new(2)));
        assert_eq!(format!("{partition}"), "{{1}, {0, 2}, {3}}");
    }

    #[test]
    fn test_indexed_partition_empty() {
        let partition = IndexedPartition::new(0);
        assert_eq!(partition.num_of_blocks(), 0);
        assert!(partition.is_empty());
    }
}
