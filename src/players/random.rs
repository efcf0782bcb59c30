use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use std::sync::Mutex;

use crate::actions::Action;
use crate::enums::Seat;
use crate::state::MatchState;

use super::Policy;

/// Uniformly random choice over the legal actions.
pub struct RandomPolicy {
    rng: Mutex<XorShiftRng>,
}

impl RandomPolicy {
    pub fn new() -> Self {
        RandomPolicy {
            rng: Mutex::new(XorShiftRng::from_entropy()),
        }
    }

    /// Reproducible sequence of choices for a given seed
    pub fn seeded(seed: u64) -> Self {
        RandomPolicy {
            rng: Mutex::new(XorShiftRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for RandomPolicy {
    fn name(&self) -> &str {
        "random"
    }

    fn choose(&self, _state: &MatchState, legal: &[Action], _seat: Seat) -> Action {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        legal.choose(&mut *rng).copied().unwrap_or(Action::EndTurn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_choices() {
        let state = MatchState::new();
        let legal = state.legal_actions(Seat::First);
        let a = RandomPolicy::seeded(42);
        let b = RandomPolicy::seeded(42);
        for _ in 0..10 {
            assert_eq!(
                a.choose(&state, &legal, Seat::First),
                b.choose(&state, &legal, Seat::First)
            );
        }
    }

    #[test]
    fn test_empty_list_falls_back_to_end_turn() {
        let state = MatchState::new();
        assert_eq!(RandomPolicy::seeded(1).choose(&state, &[], Seat::First), Action::EndTurn);
    }
}
