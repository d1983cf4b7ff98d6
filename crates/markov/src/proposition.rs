#![forbid(unsafe_code)]

use std::fmt;

use bitvec::vec::BitVec;
use itertools::Itertools;

use crate::StateIndex;

/// A named atomic proposition: the set of states in which the proposition
/// holds, stored as a bit per state. Propositions seed the initial partition
/// and are preserved by bisimulation minimisation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposition {
    pub name: String,
    pub states: BitVec,
}

impl Proposition {
    /// Creates a proposition from its satisfying set.
    pub fn new(name: impl Into<String>, states: BitVec) -> Proposition {
        Proposition {
            name: name.into(),
            states,
        }
    }

    /// Creates a proposition over `num_of_states` states that holds exactly in
    /// the given states.
    pub fn from_states(name: impl Into<String>, num_of_states: usize, states: &[usize]) -> Proposition {
        let mut membership = BitVec::repeat(false, num_of_states);
        for &state in states {
            membership.set(state, true);
        }

        Proposition::new(name, membership)
    }

    /// Returns true iff the proposition holds in the given state.
    pub fn holds_in(&self, state_index: StateIndex) -> bool {
        self.states[state_index.value()]
    }
}

impl fmt::Display for Proposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {{{}}}", self.name, self.states.iter_ones().format(", "))
    }
}
