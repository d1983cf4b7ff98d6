#![doc = include_str!("../README.md")]

mod initial_partition;
mod partition;
mod quotient;
mod reduce;
mod signature_refinement;
mod signatures;
mod valmari;

pub use initial_partition::*;
pub use partition::*;
pub use quotient::*;
pub use reduce::*;
pub use signature_refinement::*;
pub use signatures::*;
pub use valmari::*;
