#![forbid(unsafe_code)]

use log::info;

use stoch_markov::MarkovChain;
use stoch_markov::Model;
use stoch_markov::ModelKind;
use stoch_markov::Proposition;
use stoch_markov::StateIndex;
use stoch_markov::TransitionSystem;
use stoch_utilities::Timing;

use crate::Partition;
use crate::initial_partition;
use crate::lift_propositions;
use crate::quotient_markov_chain;
use crate::signature_refinement_naive;
use crate::valmari_refine;

/// The refinement strategy. Both strategies reach the same coarsest stable
/// partition; they differ in complexity and in how weights are compared, see
/// [crate::ACCURACY].
#[derive(Copy, Clone, Debug, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Strategy {
    /// Index based refinement over block ranges, amortized near-linear.
    #[default]
    Valmari,
    /// Signature recomputation per pass, quadratic in the worst case.
    SignatureNaive,
}

/// Errors surfaced by minimisation. All input errors are detected before
/// refinement begins, so no partial partition is ever observable.
#[derive(Debug, thiserror::Error)]
pub enum MinimisationError {
    /// Requested minimisation for a model category without an implemented
    /// refinement strategy.
    #[error("bisimulation minimisation is not yet supported for {0}s")]
    UnsupportedModelKind(ModelKind),

    /// A proposition is inconsistent with the state space of the model.
    #[error("proposition '{name}' is defined over {actual} states, expected {expected}")]
    PropositionSizeMismatch {
        name: String,
        actual: usize,
        expected: usize,
    },

    /// A transition points outside of the state space.
    #[error("the transition from state {state} to {target} points outside of the {num_of_states} states")]
    TargetOutOfBounds {
        state: StateIndex,
        target: StateIndex,
        num_of_states: usize,
    },

    /// A transition weight is negative or not finite.
    #[error("the transition from state {state} to {target} has invalid weight {weight}")]
    InvalidWeight {
        state: StateIndex,
        target: StateIndex,
        weight: f64,
    },

    /// A defensive check failed; indicates a bug rather than a runtime
    /// condition.
    #[error("internal invariant violation: {0}")]
    InternalInvariantViolation(&'static str),
}

/// The result of a minimisation.
#[derive(Debug)]
pub struct Minimised {
    /// The quotient model, of the same category as the input.
    pub model: Model,

    /// A representative original state per quotient state.
    pub representatives: Vec<StateIndex>,

    /// The input propositions imaged onto the quotient states.
    pub propositions: Vec<Proposition>,
}

/// Performs bisimulation minimisation on a model, preserving the given
/// propositions.
///
/// The quotient has one state per block of the coarsest stable partition,
/// together with a representative original state per block and the
/// propositions imaged onto the blocks. Only Markov chains are supported;
/// continuous time chains reuse the same partition machinery with rates in
/// place of probabilities.
pub fn minimise(
    model: &Model,
    propositions: &[Proposition],
    strategy: Strategy,
    timing: &mut Timing,
) -> Result<Minimised, MinimisationError> {
    match model {
        Model::Dtmc(chain) => {
            let (quotient, representatives, propositions) = minimise_chain(chain, propositions, strategy, timing)?;
            Ok(Minimised {
                model: Model::Dtmc(quotient),
                representatives,
                propositions,
            })
        }
        Model::Ctmc(chain) => {
            let (quotient, representatives, propositions) = minimise_chain(chain, propositions, strategy, timing)?;
            Ok(Minimised {
                model: Model::Ctmc(quotient),
                representatives,
                propositions,
            })
        }
        Model::Mdp(_) => Err(MinimisationError::UnsupportedModelKind(ModelKind::Mdp)),
    }
}

fn minimise_chain(
    chain: &MarkovChain,
    propositions: &[Proposition],
    strategy: Strategy,
    timing: &mut Timing,
) -> Result<(MarkovChain, Vec<StateIndex>, Vec<Proposition>), MinimisationError> {
    validate_input(chain, propositions)?;

    let mut time = timing.start("initial partition");
    let partition = initial_partition(chain.num_of_states(), propositions);
    time.finish();

    let mut time = timing.start("refinement");
    let partition = match strategy {
        Strategy::Valmari => valmari_refine(chain, partition),
        Strategy::SignatureNaive => signature_refinement_naive(chain, partition),
    };
    time.finish();

    let mut time = timing.start("quotient");
    let (quotient, representatives) = quotient_markov_chain(chain, &partition)?;
    let propositions = lift_propositions(propositions, &partition);
    time.finish();

    info!(
        "Minimisation: {} to {} states and {} transitions",
        chain.num_of_states(),
        partition.num_of_blocks(),
        quotient.num_of_transitions()
    );

    Ok((quotient, representatives, propositions))
}

/// Checks the input contract: every proposition covers the state space, every
/// transition stays within it, and every weight is finite and non-negative.
pub fn validate_input<T: TransitionSystem>(ts: &T, propositions: &[Proposition]) -> Result<(), MinimisationError> {
    let num_of_states = ts.num_of_states();

    for proposition in propositions {
        if proposition.states.len() != num_of_states {
            return Err(MinimisationError::PropositionSizeMismatch {
                name: proposition.name.clone(),
                actual: proposition.states.len(),
                expected: num_of_states,
            });
        }
    }

    for state in ts.iter_states() {
        for choice in ts.choices(state) {
            for (target, weight) in choice.distribution.iter() {
                if target.value() >= num_of_states {
                    return Err(MinimisationError::TargetOutOfBounds {
                        state,
                        target,
                        num_of_states,
                    });
                }

                if !weight.is_finite() || weight < 0.0 {
                    return Err(MinimisationError::InvalidWeight { state, target, weight });
                }
            }
        }
    }

    Ok(())
}

/// Computes the bisimilarity relation of a chain as a row-major
/// `num_of_states * num_of_states` boolean matrix: entry `s * num_of_states
/// + t` holds iff states `s` and `t` are probabilistic bisimilar with respect
/// to the given propositions.
pub fn bisimilar(chain: &MarkovChain, propositions: &[Proposition]) -> Result<Vec<bool>, MinimisationError> {
    validate_input(chain, propositions)?;

    let partition = signature_refinement_naive(chain, initial_partition(chain.num_of_states(), propositions));

    let num_of_states = chain.num_of_states();
    let mut result = vec![false; num_of_states * num_of_states];
    for left in 0..num_of_states {
        for right in 0..num_of_states {
            result[left * num_of_states + right] = partition.block_number(StateIndex::new(left))
                == partition.block_number(StateIndex::new(right));
        }
    }

    Ok(result)
}
