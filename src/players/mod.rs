// Policies choose actions for computer-controlled seats.
//
// A policy sees the same legal action list a human submission is checked
// against, and must return one of its members.

use crate::actions::Action;
use crate::enums::Seat;
use crate::state::MatchState;

pub mod greedy;
pub mod random;

pub use self::greedy::GreedyPolicy;
pub use self::random::RandomPolicy;

pub trait Policy: Send + Sync {
    fn name(&self) -> &str;

    /// Picks one of `legal`. Never called with an empty list.
    fn choose(&self, state: &MatchState, legal: &[Action], seat: Seat) -> Action;
}

/// Builds a policy from its command-line name.
pub fn policy_from_name(name: &str, seed: u64) -> Option<Box<dyn Policy>> {
    match name {
        "random" => Some(Box::new(RandomPolicy::seeded(seed))),
        "greedy" => Some(Box::new(GreedyPolicy::new())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_name() {
        assert_eq!(policy_from_name("random", 1).map(|p| p.name().to_string()), Some("random".into()));
        assert_eq!(policy_from_name("greedy", 1).map(|p| p.name().to_string()), Some("greedy".into()));
        assert!(policy_from_name("minimax", 1).is_none());
    }

    #[test]
    fn test_policies_always_pick_a_legal_action() {
        let policies: Vec<Box<dyn Policy>> =
            vec![Box::new(RandomPolicy::seeded(7)), Box::new(GreedyPolicy::new())];
        for policy in policies {
            let mut state = MatchState::new();
            for _ in 0..60 {
                if state.is_over() {
                    break;
                }
                let seat = state.current_seat;
                let legal = state.legal_actions(seat);
                let action = policy.choose(&state, &legal, seat);
                assert!(legal.contains(&action), "{} picked {action}", policy.name());
                state.apply_action(action).unwrap();
            }
        }
    }
}
