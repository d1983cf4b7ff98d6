#![forbid(unsafe_code)]

use std::cmp::Ordering;
use std::hash::Hash;
use std::hash::Hasher;

use bumpalo::Bump;

use stoch_markov::ActionIndex;
use stoch_markov::StateIndex;
use stoch_markov::TransitionSystem;

use crate::BlockIndex;
use crate::Partition;

/// Scratch vector used to lift a single distribution to the current
/// partition.
pub type SignatureBuilder = Vec<(BlockIndex, f64)>;

/// The signature of a single choice: its distribution lifted to the current
/// partition, sorted by block, with the mass of transitions into the same
/// block combined, plus the optional action tag of the choice.
///
/// Weights are compared and hashed bit-exactly; the naive engine deliberately
/// uses structural equality and no tolerance.
#[derive(Clone, Copy, Debug)]
pub struct ChoiceSignature<'a> {
    pub action: Option<ActionIndex>,
    pub entries: &'a [(BlockIndex, f64)],
}

impl PartialEq for ChoiceSignature<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.action == other.action
            && self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(other.entries)
                .all(|(&(block, weight), &(other_block, other_weight))| {
                    block == other_block && weight.to_bits() == other_weight.to_bits()
                })
    }
}

impl Eq for ChoiceSignature<'_> {}

impl Hash for ChoiceSignature<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.action.hash(state);
        for &(block, weight) in self.entries {
            block.hash(state);
            weight.to_bits().hash(state);
        }
    }
}

impl Ord for ChoiceSignature<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.action.cmp(&other.action).then_with(|| {
            for (&(block, weight), &(other_block, other_weight)) in self.entries.iter().zip(other.entries) {
                let ordering = block
                    .cmp(&other_block)
                    .then_with(|| weight.to_bits().cmp(&other_weight.to_bits()));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }

            self.entries.len().cmp(&other.entries.len())
        })
    }
}

impl PartialOrd for ChoiceSignature<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The signature of a state: its deduplicated choice signatures in sorted
/// order. For a Markov chain this is a single untagged choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Signature<'a>(&'a [ChoiceSignature<'a>]);

impl<'a> Signature<'a> {
    pub fn new(choices: &'a [ChoiceSignature<'a>]) -> Signature<'a> {
        Signature(choices)
    }

    pub fn as_slice(&self) -> &'a [ChoiceSignature<'a>] {
        self.0
    }
}

/// Computes the signature of a state under the given partition. The builder
/// and choices vectors are scratch space reused between states; the resulting
/// slices are allocated in the arena.
pub fn state_signature<'a>(
    ts: &impl TransitionSystem,
    state_index: StateIndex,
    partition: &impl Partition,
    arena: &'a Bump,
    builder: &mut SignatureBuilder,
    choices: &mut Vec<ChoiceSignature<'a>>,
) -> Signature<'a> {
    choices.clear();

    for choice in ts.choices(state_index) {
        builder.clear();
        for (target, weight) in choice.distribution.iter() {
            if weight != 0.0 {
                builder.push((partition.block_number(target), weight));
            }
        }

        // Transitions into the same block combine additively: bisimulation
        // compares the aggregate mass into an equivalence class, not the
        // individual transitions.
        builder.sort_unstable_by_key(|&(block, _)| block);
        builder.dedup_by(|current, previous| {
            if current.0 == previous.0 {
                previous.1 += current.1;
                true
            } else {
                false
            }
        });

        choices.push(ChoiceSignature {
            action: choice.action,
            entries: arena.alloc_slice_copy(builder),
        });
    }

    // Choices that lift to the same distribution count once.
    choices.sort_unstable();
    choices.dedup();

    Signature::new(arena.alloc_slice_copy(choices))
}
