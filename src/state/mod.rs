// Match state: the board plus per-seat counters and turn bookkeeping.
//
// Transitions live in `move_application`, the legal action list in
// `move_generation`, and end-of-match queries in `termination`.

use serde::{Deserialize, Serialize};

use crate::actions::Action;
use crate::board::{Board, UnitId};
use crate::enums::{Seat, UnitKind, UNIT_KINDS};

mod move_application;
mod move_generation;
mod termination;

/// Per-seat cap on deployments of each unit kind
pub const MAX_DEPLOYMENTS_PER_KIND: u8 = 3;

/// Turn number at which the match is drawn
pub const DEFAULT_TURN_LIMIT: u32 = 250;

/// Units on board plus remaining deployment slots below which a seat is
/// considered out of resources
pub const LOW_RESOURCE_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SeatState {
    pub actions_remaining: u8,
    deployed: [u8; UNIT_KINDS.len()],
}

impl SeatState {
    pub fn deployed(&self, kind: UnitKind) -> u8 {
        self.deployed[kind.index()]
    }

    pub fn can_deploy(&self, kind: UnitKind) -> bool {
        self.deployed(kind) < MAX_DEPLOYMENTS_PER_KIND
    }

    pub fn deployments_remaining(&self) -> usize {
        UNIT_KINDS
            .iter()
            .map(|k| (MAX_DEPLOYMENTS_PER_KIND - self.deployed(*k)) as usize)
            .sum()
    }

    pub fn deployable_kinds(&self) -> impl Iterator<Item = UnitKind> + '_ {
        UNIT_KINDS.into_iter().filter(|k| self.can_deploy(*k))
    }

    fn record_deployment(&mut self, kind: UnitKind) {
        self.deployed[kind.index()] += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchState {
    pub board: Board,
    pub seats: [SeatState; 2],
    pub current_seat: Seat,
    pub turn_number: u32,
    /// Usable only before any other action in the turn it was granted
    pub free_deployments_remaining: u8,
    pub has_acted_this_turn: bool,
    pub last_action: Option<(Seat, Action)>,
    pub turn_limit: u32,
    next_unit_id: UnitId,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self::with_turn_limit(DEFAULT_TURN_LIMIT)
    }

    pub fn with_turn_limit(turn_limit: u32) -> Self {
        let mut seats: [SeatState; 2] = Default::default();
        seats[Seat::First.index()].actions_remaining = 1;
        MatchState {
            board: Board::new(),
            seats,
            current_seat: Seat::First,
            turn_number: 1,
            free_deployments_remaining: 0,
            has_acted_this_turn: false,
            last_action: None,
            turn_limit,
            next_unit_id: 1,
        }
    }

    pub fn seat(&self, seat: Seat) -> &SeatState {
        &self.seats[seat.index()]
    }

    fn seat_mut(&mut self, seat: Seat) -> &mut SeatState {
        &mut self.seats[seat.index()]
    }

    /// Units on board plus deployment slots left
    pub fn resources(&self, seat: Seat) -> usize {
        self.board.count_units(seat) + self.seat(seat).deployments_remaining()
    }

    /// Unit kinds `seat` has on the board or may still deploy
    pub fn fieldable_kinds(&self, seat: Seat) -> Vec<UnitKind> {
        let mut kinds: Vec<UnitKind> = self
            .board
            .units_of(seat)
            .map(|(_, u)| u.kind)
            .chain(self.seat(seat).deployable_kinds())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}
