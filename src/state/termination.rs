use crate::board::CONTROL_POINTS;
use crate::combat;
use crate::enums::{DrawReason, Outcome, Seat, VictoryKind, SEATS};

use super::{MatchState, LOW_RESOURCE_THRESHOLD};

impl MatchState {
    /// The seat occupying all three control points, if any.
    pub fn check_victory(&self) -> Option<Seat> {
        SEATS
            .into_iter()
            .find(|seat| self.board.control_points_held(*seat) == CONTROL_POINTS.len())
    }

    pub fn is_eliminated(&self, seat: Seat) -> bool {
        self.board.count_units(seat) == 0 && self.seat(seat).deployments_remaining() == 0
    }

    /// The winner by elimination. Only counts when exactly one seat is out.
    pub fn check_elimination(&self) -> Option<Seat> {
        match (self.is_eliminated(Seat::First), self.is_eliminated(Seat::Second)) {
            (true, false) => Some(Seat::Second),
            (false, true) => Some(Seat::First),
            _ => None,
        }
    }

    pub fn check_draw(&self) -> Option<DrawReason> {
        if self.turn_number >= self.turn_limit {
            return Some(DrawReason::TurnLimit);
        }
        if SEATS
            .iter()
            .all(|seat| self.resources(*seat) < LOW_RESOURCE_THRESHOLD)
        {
            return Some(DrawReason::LowResources);
        }
        if self.is_stalemate() {
            return Some(DrawReason::Stalemate);
        }
        None
    }

    /// Neither seat can deploy and each holds a control point with a unit the
    /// opponent has no way to defeat.
    fn is_stalemate(&self) -> bool {
        SEATS.iter().all(|seat| {
            self.seat(*seat).deployments_remaining() == 0 && self.holds_invincible_point(*seat)
        })
    }

    fn holds_invincible_point(&self, seat: Seat) -> bool {
        let threats = self.fieldable_kinds(seat.opponent());
        CONTROL_POINTS.iter().any(|p| {
            self.board
                .get(*p)
                .filter(|u| u.owner == seat)
                .is_some_and(|u| combat::is_invincible_against(u.kind, &threats))
        })
    }

    /// Terminal result, if the match is over. Victory is checked before
    /// elimination, and both before draws.
    pub fn outcome(&self) -> Option<Outcome> {
        if let Some(winner) = self.check_victory() {
            return Some(Outcome::Victory {
                winner,
                kind: VictoryKind::ControlPoints,
            });
        }
        if let Some(winner) = self.check_elimination() {
            return Some(Outcome::Victory {
                winner,
                kind: VictoryKind::Elimination,
            });
        }
        self.check_draw().map(|reason| Outcome::Draw { reason })
    }

    pub fn is_over(&self) -> bool {
        self.outcome().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::UnitKind;
    use crate::state::test_support::{exhaust_deployments, put};

    #[test]
    fn test_fresh_match_is_not_over() {
        let state = MatchState::new();
        assert_eq!(state.outcome(), None);
    }

    #[test]
    fn test_control_point_victory() {
        let mut state = MatchState::new();
        put(&mut state, Seat::Second, UnitKind::Shieldman, 3, 1);
        put(&mut state, Seat::Second, UnitKind::Cavalry, 3, 3);
        assert_eq!(state.check_victory(), None);
        put(&mut state, Seat::Second, UnitKind::Archer, 3, 5);
        assert_eq!(state.check_victory(), Some(Seat::Second));
        assert_eq!(
            state.outcome(),
            Some(Outcome::Victory {
                winner: Seat::Second,
                kind: VictoryKind::ControlPoints
            })
        );
    }

    #[test]
    fn test_elimination() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        assert_eq!(state.check_elimination(), Some(Seat::Second));

        put(&mut state, Seat::First, UnitKind::Archer, 1, 1);
        assert_eq!(state.check_elimination(), None);
    }

    #[test]
    fn test_double_elimination_is_not_a_win() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        exhaust_deployments(&mut state, Seat::Second);
        assert_eq!(state.check_elimination(), None);
        assert_eq!(state.check_draw(), Some(DrawReason::LowResources));
    }

    #[test]
    fn test_low_resources_draw() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        exhaust_deployments(&mut state, Seat::Second);
        put(&mut state, Seat::First, UnitKind::Swordsman, 2, 2);
        put(&mut state, Seat::Second, UnitKind::Axeman, 4, 4);
        assert_eq!(state.check_draw(), Some(DrawReason::LowResources));
        assert_eq!(
            state.outcome(),
            Some(Outcome::Draw {
                reason: DrawReason::LowResources
            })
        );
    }

    #[test]
    fn test_turn_limit_draw() {
        let mut state = MatchState::with_turn_limit(10);
        state.turn_number = 9;
        assert_eq!(state.check_draw(), None);
        state.turn_number = 10;
        assert_eq!(state.check_draw(), Some(DrawReason::TurnLimit));
    }

    #[test]
    fn test_stalemate_draw() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        exhaust_deployments(&mut state, Seat::Second);
        // Neither side fields anything that beats a Shieldman.
        put(&mut state, Seat::First, UnitKind::Shieldman, 3, 1);
        put(&mut state, Seat::First, UnitKind::Archer, 1, 1);
        put(&mut state, Seat::First, UnitKind::Cavalry, 1, 2);
        put(&mut state, Seat::Second, UnitKind::Shieldman, 3, 5);
        put(&mut state, Seat::Second, UnitKind::Archer, 5, 1);
        put(&mut state, Seat::Second, UnitKind::Swordsman, 5, 2);
        assert_eq!(state.check_draw(), Some(DrawReason::Stalemate));

        // An Axeman on the other side breaks it.
        put(&mut state, Seat::Second, UnitKind::Axeman, 5, 5);
        assert_eq!(state.check_draw(), None);
    }

    #[test]
    fn test_no_stalemate_while_deployments_remain() {
        let mut state = MatchState::new();
        exhaust_deployments(&mut state, Seat::First);
        put(&mut state, Seat::First, UnitKind::Shieldman, 3, 1);
        put(&mut state, Seat::Second, UnitKind::Shieldman, 3, 5);
        assert_eq!(state.check_draw(), None);
    }
}
