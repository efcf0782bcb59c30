use crate::actions::Action;
use crate::board::{all_positions, Position, GRID_SIZE};
use crate::enums::Seat;

use super::MatchState;

impl MatchState {
    /// Every legal action for `seat`, in a stable order: deployments first,
    /// then move/rotate/attack per unit in board order, then `EndTurn`.
    /// Empty when it is not `seat`'s turn.
    pub fn legal_actions(&self, seat: Seat) -> Vec<Action> {
        if seat != self.current_seat {
            return vec![];
        }

        let mut actions = self.deploy_actions(seat);

        for (from, unit) in self.board.units_of(seat) {
            if unit.acted {
                continue;
            }
            let unit_id = unit.id;
            let targets: Vec<Position> = all_positions().filter(|p| *p != from).collect();
            actions.extend(
                targets
                    .iter()
                    .map(|&target| Action::Move { unit_id, target })
                    .filter(|a| self.is_legal(a)),
            );
            actions.extend(
                targets
                    .iter()
                    .map(|&target| Action::Rotate { unit_id, target })
                    .filter(|a| self.is_legal(a)),
            );
            actions.extend(
                targets
                    .iter()
                    .map(|&target| Action::Attack { unit_id, target })
                    .filter(|a| self.is_legal(a)),
            );
        }

        actions.push(Action::EndTurn);
        actions
    }

    fn deploy_actions(&self, seat: Seat) -> Vec<Action> {
        let row = seat.home_row();
        self.seat(seat)
            .deployable_kinds()
            .flat_map(|unit| {
                (1..=GRID_SIZE).map(move |col| Action::Deploy {
                    unit,
                    target: Position::new(row, col),
                })
            })
            .filter(|a| self.is_legal(a))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::UnitKind;
    use crate::state::test_support::{exhaust_deployments, put};

    #[test]
    fn test_opening_actions() {
        let state = MatchState::new();
        let actions = state.legal_actions(Seat::First);
        // 6 kinds on 5 home tiles, plus EndTurn.
        assert_eq!(actions.len(), 31);
        assert_eq!(actions.last(), Some(&Action::EndTurn));
        assert!(actions[..30]
            .iter()
            .all(|a| matches!(a, Action::Deploy { target, .. } if target.row == 1)));
    }

    #[test]
    fn test_off_turn_seat_has_no_actions() {
        let state = MatchState::new();
        assert!(state.legal_actions(Seat::Second).is_empty());
    }

    #[test]
    fn test_every_generated_action_applies() {
        let mut state = MatchState::new();
        put(&mut state, Seat::First, UnitKind::Cavalry, 2, 2);
        put(&mut state, Seat::First, UnitKind::Archer, 2, 3);
        put(&mut state, Seat::Second, UnitKind::Spearman, 3, 2);
        put(&mut state, Seat::Second, UnitKind::Archer, 4, 3);
        state.seats[0].actions_remaining = 2;

        let actions = state.legal_actions(Seat::First);
        assert!(actions.len() > 1);
        for action in actions {
            assert!(state.successor(action).is_ok(), "{action} should apply");
        }
    }

    #[test]
    fn test_order_is_stable_and_grouped_by_unit() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        let first = put(&mut state, Seat::First, UnitKind::Swordsman, 2, 1);
        let second = put(&mut state, Seat::First, UnitKind::Swordsman, 4, 5);

        let actions = state.legal_actions(Seat::First);
        assert_eq!(actions, state.legal_actions(Seat::First));

        let unit_of = |a: &Action| match a {
            Action::Move { unit_id, .. } => Some(*unit_id),
            _ => None,
        };
        let ids: Vec<_> = actions.iter().filter_map(unit_of).collect();
        let split = ids.iter().position(|id| *id == second).unwrap();
        assert!(ids[..split].iter().all(|id| *id == first));
        assert!(ids[split..].iter().all(|id| *id == second));
    }

    #[test]
    fn test_acted_units_are_skipped() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        put(&mut state, Seat::First, UnitKind::Shieldman, 2, 2);
        if let Some(unit) = state.board.get_mut(Position::new(2, 2)) {
            unit.acted = true;
        }
        assert_eq!(state.legal_actions(Seat::First), vec![Action::EndTurn]);
    }
}
