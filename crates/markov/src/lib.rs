#![doc = include_str!("../README.md")]

mod distribution;
mod incoming;
mod markov_chain;
mod mdp;
mod model;
mod proposition;
mod random_markov;
mod transition_system;

pub use distribution::*;
pub use incoming::*;
pub use markov_chain::*;
pub use mdp::*;
pub use model::*;
pub use proposition::*;
pub use random_markov::*;
pub use transition_system::*;
