#![forbid(unsafe_code)]

use crate::ActionIndex;
use crate::Choice;
use crate::Distribution;
use crate::StateIndex;
use crate::TransitionSystem;

/// Simple explicit-state representation of a Markov decision process: every
/// state has a list of outgoing choices, each a distribution with an optional
/// action tag. Action names are interned in a table shared by all states.
#[derive(Clone, Debug, Default)]
pub struct Mdp {
    choices: Vec<Vec<MdpChoice>>,
    actions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
struct MdpChoice {
    action: Option<ActionIndex>,
    distribution: Distribution,
}

impl Mdp {
    /// Creates a new MDP with the given number of states and no choices.
    pub fn new(num_of_states: usize) -> Mdp {
        Mdp {
            choices: vec![Vec::new(); num_of_states],
            actions: Vec::new(),
        }
    }

    /// Interns the given action name and returns its index. Names are
    /// deduplicated, interning the same name twice yields the same index.
    pub fn add_action(&mut self, name: &str) -> ActionIndex {
        if let Some(index) = self.actions.iter().position(|action| action == name) {
            return ActionIndex::new(index);
        }

        self.actions.push(name.to_string());
        ActionIndex::new(self.actions.len() - 1)
    }

    /// Returns the name of the given action.
    pub fn action_name(&self, action: ActionIndex) -> &str {
        &self.actions[action]
    }

    /// Returns the action names interned in this MDP.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Adds a choice to the given state. The choice is only actually added
    /// when no identical (action, distribution) pair exists for the state yet;
    /// two choices that describe the same behaviour count once. Returns the
    /// index of the existing or newly added choice.
    pub fn add_choice(&mut self, state_index: StateIndex, action: Option<ActionIndex>, distribution: Distribution) -> usize {
        let choice = MdpChoice { action, distribution };

        let set = &mut self.choices[state_index];
        if let Some(index) = set.iter().position(|existing| *existing == choice) {
            return index;
        }

        set.push(choice);
        set.len() - 1
    }
}

impl TransitionSystem for Mdp {
    fn num_of_states(&self) -> usize {
        self.choices.len()
    }

    fn num_of_choices(&self, state_index: StateIndex) -> usize {
        self.choices[state_index].len()
    }

    fn choices(&self, state_index: StateIndex) -> impl Iterator<Item = Choice<'_>> + '_ {
        self.choices[state_index].iter().map(|choice| Choice {
            action: choice.action,
            distribution: &choice.distribution,
        })
    }

    fn num_of_transitions(&self) -> usize {
        self.choices
            .iter()
            .flatten()
            .map(|choice| choice.distribution.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mdp_duplicate_choices() {
        let mut mdp = Mdp::new(2);
        let alpha = mdp.add_action("alpha");
        assert_eq!(mdp.add_action("alpha"), alpha);

        let mut distribution = Distribution::new();
        distribution.add(StateIndex::new(1), 1.0);

        let first = mdp.add_choice(StateIndex::new(0), Some(alpha), distribution.clone());
        let second = mdp.add_choice(StateIndex::new(0), Some(alpha), distribution.clone());
        assert_eq!(first, second);
        assert_eq!(mdp.num_of_choices(StateIndex::new(0)), 1);

        // The same distribution without an action tag is a different choice.
        mdp.add_choice(StateIndex::new(0), None, distribution);
        assert_eq!(mdp.num_of_choices(StateIndex::new(0)), 2);
    }
}
