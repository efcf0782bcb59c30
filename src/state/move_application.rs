use crate::actions::Action;
use crate::board::{Position, Unit, UnitId, CENTER_POINT, SIDE_POINTS};
use crate::combat::{self, Engagement};
use crate::enums::UnitKind;
use crate::errors::{RulesError, RulesResult};

use super::MatchState;

/// How a legal deployment is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payment {
    Free,
    Action,
}

struct AttackPlan {
    from: Position,
    attacker: Unit,
    defender: Unit,
    engagement: Engagement,
}

impl MatchState {
    /// Checks `action` for the current seat without touching the state.
    pub fn check(&self, action: &Action) -> RulesResult<()> {
        match *action {
            Action::Deploy { unit, target } => self.check_deploy(unit, target).map(|_| ()),
            Action::Move { unit_id, target } => self.check_move(unit_id, target).map(|_| ()),
            Action::Rotate { unit_id, target } => self.check_rotate(unit_id, target).map(|_| ()),
            Action::Attack { unit_id, target } => self.check_attack(unit_id, target).map(|_| ()),
            Action::EndTurn => Ok(()),
        }
    }

    pub fn is_legal(&self, action: &Action) -> bool {
        self.check(action).is_ok()
    }

    /// Pure transition: returns the successor state, leaving `self` as is.
    pub fn successor(&self, action: Action) -> RulesResult<MatchState> {
        let mut next = self.clone();
        next.apply_action(action)?;
        Ok(next)
    }

    /// Applies `action` for the current seat. Every check runs before the
    /// first mutation, so an error leaves the state untouched.
    pub fn apply_action(&mut self, action: Action) -> RulesResult<()> {
        let seat = self.current_seat;
        match action {
            Action::Deploy { unit, target } => {
                let payment = self.check_deploy(unit, target)?;
                self.deploy(unit, target, payment);
            }
            Action::Move { unit_id, target } => {
                let (from, _) = self.check_move(unit_id, target)?;
                if let Some(mut unit) = self.board.take(from) {
                    unit.acted = true;
                    let placed = self.board.place(target, unit);
                    debug_assert!(placed.is_ok(), "move target {} was checked empty", target);
                }
                self.spend_action();
            }
            Action::Rotate { unit_id, target } => {
                let (from, _) = self.check_rotate(unit_id, target)?;
                self.board.swap(from, target);
                // The passive partner keeps its own acted flag.
                if let Some(unit) = self.board.get_mut(target) {
                    unit.acted = true;
                }
                self.spend_action();
            }
            Action::Attack { unit_id, target } => {
                let plan = self.check_attack(unit_id, target)?;
                self.resolve_attack(plan, target);
                self.spend_action();
            }
            Action::EndTurn => {}
        }

        self.last_action = Some((seat, action));

        if action.is_end_turn() || self.seat(seat).actions_remaining == 0 {
            self.end_turn();
        }
        Ok(())
    }

    fn deploy(&mut self, kind: UnitKind, target: Position, payment: Payment) {
        let seat = self.current_seat;
        let unit = Unit {
            id: self.next_unit_id,
            owner: seat,
            kind,
            acted: true,
        };
        let placed = self.board.place(target, unit);
        debug_assert!(placed.is_ok(), "deploy target {} was checked empty", target);
        self.next_unit_id += 1;
        self.seat_mut(seat).record_deployment(kind);
        match payment {
            Payment::Free => {
                self.free_deployments_remaining -= 1;
                self.has_acted_this_turn = true;
            }
            Payment::Action => self.spend_action(),
        }
        log::debug!("Seat {} deployed {} at {} ({:?})", seat, kind, target, payment);
    }

    fn resolve_attack(&mut self, plan: AttackPlan, target: Position) {
        let outcome = combat::resolve(plan.attacker.kind, plan.defender.kind, plan.engagement);
        if outcome.defender_dies {
            self.board.take(target);
        }
        if outcome.attacker_dies {
            self.board.take(plan.from);
        } else if let Some(unit) = self.board.get_mut(plan.from) {
            unit.acted = true;
        }
        log::debug!(
            "{:?} {} -> {}: attacker_dies={}, defender_dies={}",
            plan.engagement,
            plan.attacker.kind,
            plan.defender.kind,
            outcome.attacker_dies,
            outcome.defender_dies
        );
    }

    fn spend_action(&mut self) {
        let seat = self.current_seat;
        let remaining = &mut self.seat_mut(seat).actions_remaining;
        *remaining = remaining.saturating_sub(1);
        self.has_acted_this_turn = true;
    }

    /// Hands the turn to the other seat and computes its control-point bonuses.
    pub(crate) fn end_turn(&mut self) {
        let previous = self.current_seat;
        let next = previous.opponent();

        self.board.clear_acted();

        let holds_center = self.board.controls(next, CENTER_POINT);
        let sides_held = SIDE_POINTS
            .iter()
            .filter(|p| self.board.controls(next, **p))
            .count();
        // Center and both sides do not stack.
        let bonus = u8::from(holds_center || sides_held == SIDE_POINTS.len());

        self.seat_mut(previous).actions_remaining = 0;
        self.seat_mut(next).actions_remaining = 1 + bonus;
        self.free_deployments_remaining = u8::from(sides_held > 0);
        self.current_seat = next;
        self.turn_number += 1;
        self.has_acted_this_turn = false;

        log::debug!(
            "Turn {}: seat {} to act with {} action(s), {} free deployment(s)",
            self.turn_number,
            next,
            1 + bonus,
            self.free_deployments_remaining
        );
    }

    fn require_on_board(target: Position) -> RulesResult<()> {
        if target.is_on_board() {
            Ok(())
        } else {
            Err(RulesError::OutOfBounds { position: target })
        }
    }

    fn require_action(&self) -> RulesResult<()> {
        if self.seat(self.current_seat).actions_remaining > 0 {
            Ok(())
        } else {
            Err(RulesError::NoActionsRemaining)
        }
    }

    /// Locates a unit of the current seat that has not acted yet.
    fn ready_unit(&self, unit_id: UnitId) -> RulesResult<(Position, Unit)> {
        let (position, unit) = self
            .board
            .find(unit_id)
            .ok_or(RulesError::UnitNotFound { unit_id })?;
        if unit.owner != self.current_seat {
            return Err(RulesError::NotOwnUnit {
                unit_id,
                seat: self.current_seat,
            });
        }
        if unit.acted {
            return Err(RulesError::AlreadyActed { unit_id });
        }
        Ok((position, unit))
    }

    fn check_deploy(&self, kind: UnitKind, target: Position) -> RulesResult<Payment> {
        Self::require_on_board(target)?;
        let seat = self.current_seat;
        if target.row != seat.home_row() {
            return Err(RulesError::NotHomeRow {
                seat,
                position: target,
            });
        }
        if !self.board.is_empty(target) {
            return Err(RulesError::TileOccupied { position: target });
        }
        if !self.seat(seat).can_deploy(kind) {
            return Err(RulesError::DeploymentCapReached { unit: kind });
        }
        if self.free_deployments_remaining > 0 && !self.has_acted_this_turn {
            return Ok(Payment::Free);
        }
        self.require_action()?;
        Ok(Payment::Action)
    }

    fn check_move(&self, unit_id: UnitId, target: Position) -> RulesResult<(Position, Unit)> {
        Self::require_on_board(target)?;
        let (from, unit) = self.ready_unit(unit_id)?;
        self.require_action()?;
        if !self.board.is_empty(target) {
            return Err(RulesError::TileOccupied { position: target });
        }
        if from.distance(&target) > unit.kind.move_range() {
            return Err(RulesError::OutOfRange { unit_id, target });
        }
        if let Some(middle) = from.straight_midpoint(&target) {
            if !self.board.is_empty(middle) {
                return Err(RulesError::PathBlocked { target });
            }
        }
        Ok((from, unit))
    }

    fn check_rotate(&self, unit_id: UnitId, target: Position) -> RulesResult<(Position, Unit)> {
        Self::require_on_board(target)?;
        let (from, unit) = self.ready_unit(unit_id)?;
        self.require_action()?;
        if from == target {
            return Err(RulesError::InvalidRotation { unit_id, target });
        }
        let partner = self
            .board
            .get(target)
            .filter(|p| p.owner == self.current_seat)
            .ok_or(RulesError::NoFriendlyUnit { target })?;
        if partner.kind == unit.kind {
            return Err(RulesError::SameKindRotation { unit: unit.kind });
        }

        let is_cavalry = unit.kind == UnitKind::Cavalry;
        if from.is_orthogonally_adjacent(&target) {
            return Ok((from, unit));
        }
        if is_cavalry && from.is_diagonally_adjacent(&target) {
            return Ok((from, unit));
        }
        if let (true, Some(middle)) = (is_cavalry, from.straight_midpoint(&target)) {
            if !self.board.is_empty(middle) {
                return Err(RulesError::PathBlocked { target });
            }
            return Ok((from, unit));
        }
        Err(RulesError::InvalidRotation { unit_id, target })
    }

    fn check_attack(&self, unit_id: UnitId, target: Position) -> RulesResult<AttackPlan> {
        Self::require_on_board(target)?;
        let (from, attacker) = self.ready_unit(unit_id)?;
        self.require_action()?;
        let defender = *self
            .board
            .get(target)
            .filter(|d| d.owner != self.current_seat)
            .ok_or(RulesError::NoEnemyUnit { target })?;

        if from.distance(&target) > attacker.kind.attack_range() {
            return Err(RulesError::OutOfRange { unit_id, target });
        }

        let engagement = if from.is_orthogonally_adjacent(&target) {
            Engagement::Melee
        } else {
            Engagement::Ranged
        };

        if engagement == Engagement::Ranged {
            if defender.kind == UnitKind::Shieldman {
                return Err(RulesError::RangedImmune {
                    defender: defender.kind,
                });
            }
            // Diagonal shots have no intermediate tile.
            if let Some(middle) = from.straight_midpoint(&target) {
                if !self.board.is_empty(middle) {
                    return Err(RulesError::NoLineOfSight { target });
                }
            }
        }

        if !combat::defeats(attacker.kind, defender.kind, engagement) {
            return Err(RulesError::CannotDefeat {
                attacker: attacker.kind,
                defender: defender.kind,
            });
        }

        Ok(AttackPlan {
            from,
            attacker,
            defender,
            engagement,
        })
    }
}
