use crate::actions::Action;
use crate::enums::{Outcome, Seat};
use crate::state::MatchState;

use super::Policy;

const WIN_SCORE: i32 = 10_000;
const CONTROL_POINT_WEIGHT: i32 = 6;
const UNIT_WEIGHT: i32 = 2;

/// One-ply lookahead: scores the successor of every legal action and takes
/// the best, keeping the earliest action on ties.
pub struct GreedyPolicy;

impl GreedyPolicy {
    pub fn new() -> Self {
        GreedyPolicy
    }

    fn evaluate(state: &MatchState, seat: Seat) -> i32 {
        match state.outcome() {
            Some(Outcome::Victory { winner, .. }) if winner == seat => return WIN_SCORE,
            Some(Outcome::Victory { .. }) => return -WIN_SCORE,
            Some(Outcome::Draw { .. }) => return 0,
            None => {}
        }
        let opponent = seat.opponent();
        let control = state.board.control_points_held(seat) as i32
            - state.board.control_points_held(opponent) as i32;
        let units = state.board.count_units(seat) as i32 - state.board.count_units(opponent) as i32;
        control * CONTROL_POINT_WEIGHT + units * UNIT_WEIGHT
    }
}

impl Default for GreedyPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl Policy for GreedyPolicy {
    fn name(&self) -> &str {
        "greedy"
    }

    fn choose(&self, state: &MatchState, legal: &[Action], seat: Seat) -> Action {
        let mut best: Option<(i32, Action)> = None;
        for action in legal {
            let Ok(next) = state.successor(*action) else {
                continue;
            };
            let score = Self::evaluate(&next, seat);
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, *action));
            }
        }
        best.map(|(_, a)| a).unwrap_or(Action::EndTurn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::enums::UnitKind;
    use crate::state::test_support::{exhaust_deployments, put};

    #[test]
    fn test_takes_the_winning_control_point() {
        let mut state = MatchState::new();
        put(&mut state, Seat::First, UnitKind::Shieldman, 3, 1);
        put(&mut state, Seat::First, UnitKind::Shieldman, 3, 5);
        let cav = put(&mut state, Seat::First, UnitKind::Cavalry, 2, 3);

        let legal = state.legal_actions(Seat::First);
        let action = GreedyPolicy::new().choose(&state, &legal, Seat::First);
        assert_eq!(
            action,
            Action::Move {
                unit_id: cav,
                target: Position::new(3, 3)
            }
        );
    }

    #[test]
    fn test_prefers_a_free_kill() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        let archer = put(&mut state, Seat::First, UnitKind::Archer, 2, 2);
        put(&mut state, Seat::Second, UnitKind::Cavalry, 4, 2);

        let legal = state.legal_actions(Seat::First);
        let action = GreedyPolicy::new().choose(&state, &legal, Seat::First);
        assert_eq!(
            action,
            Action::Attack {
                unit_id: archer,
                target: Position::new(4, 2)
            }
        );
    }
}
