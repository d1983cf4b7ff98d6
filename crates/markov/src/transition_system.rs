#![forbid(unsafe_code)]

//! The transition system trait and associated index types.

use stoch_utilities::TaggedIndex;

use crate::Distribution;

/// A unique type for the states.
pub struct StateTag;

/// A unique type for the action labels of nondeterministic models.
pub struct ActionTag;

/// The index for a state.
pub type StateIndex = TaggedIndex<StateTag>;

/// The index for an action label.
pub type ActionIndex = TaggedIndex<ActionTag>;

/// One outgoing choice of a state: a weighted distribution over target states
/// with an optional action tag. Markov chains have exactly one untagged choice
/// per state, MDPs can have several.
#[derive(Clone, Copy, Debug)]
pub struct Choice<'a> {
    pub action: Option<ActionIndex>,
    pub distribution: &'a Distribution,
}

/// The capability that the refinement engines require from a probabilistic
/// model: enumerate, per state, the outgoing choices as weighted
/// distributions. Implementing this trait is sufficient for signature based
/// refinement, which is why one engine serves chains and MDPs uniformly.
pub trait TransitionSystem {
    /// Returns the number of states.
    fn num_of_states(&self) -> usize;

    /// Iterate over all state indices in the transition system.
    fn iter_states(&self) -> impl Iterator<Item = StateIndex> + '_ {
        (0..self.num_of_states()).map(StateIndex::new)
    }

    /// Returns the number of outgoing choices for the given state.
    fn num_of_choices(&self, state_index: StateIndex) -> usize;

    /// Returns the outgoing choices for the given state.
    fn choices(&self, state_index: StateIndex) -> impl Iterator<Item = Choice<'_>> + '_;

    /// Returns the total number of transitions, i.e. the summed support sizes
    /// of all choices.
    fn num_of_transitions(&self) -> usize;
}
