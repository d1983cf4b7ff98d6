#![forbid(unsafe_code)]

use std::fmt;

use crate::MarkovChain;
use crate::Mdp;
use crate::TransitionSystem;

/// An explicit-state probabilistic model, tagged by its category. Discrete
/// and continuous time chains share the [MarkovChain] representation; the tag
/// decides whether the weights are interpreted as probabilities or rates.
#[derive(Clone, Debug)]
pub enum Model {
    /// A discrete time Markov chain.
    Dtmc(MarkovChain),
    /// A continuous time Markov chain.
    Ctmc(MarkovChain),
    /// A Markov decision process.
    Mdp(Mdp),
}

/// The category of a [Model], used for dispatch and diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
    Dtmc,
    Ctmc,
    Mdp,
}

impl Model {
    /// Returns the category of this model.
    pub fn kind(&self) -> ModelKind {
        match self {
            Model::Dtmc(_) => ModelKind::Dtmc,
            Model::Ctmc(_) => ModelKind::Ctmc,
            Model::Mdp(_) => ModelKind::Mdp,
        }
    }

    /// Returns the number of states of the underlying model.
    pub fn num_of_states(&self) -> usize {
        match self {
            Model::Dtmc(chain) | Model::Ctmc(chain) => chain.num_of_states(),
            Model::Mdp(mdp) => mdp.num_of_states(),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Dtmc => write!(f, "DTMC"),
            ModelKind::Ctmc => write!(f, "CTMC"),
            ModelKind::Mdp => write!(f, "MDP"),
        }
    }
}
