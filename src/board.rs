// Grid, units and control points.
//
// Positions are 1-indexed (row, col) pairs. The board is a fixed 5x5 array of
// `Option<Unit>` so a whole board is `Copy` and snapshots never reallocate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::{Seat, UnitKind};

pub const GRID_SIZE: u8 = 5;

pub type UnitId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Position { row, col }
    }

    pub fn is_on_board(&self) -> bool {
        (1..=GRID_SIZE).contains(&self.row) && (1..=GRID_SIZE).contains(&self.col)
    }

    fn deltas(&self, other: &Position) -> (u8, u8) {
        (self.row.abs_diff(other.row), self.col.abs_diff(other.col))
    }

    /// Movement metric: orthogonal steps cost 1, a single diagonal step costs 2.
    pub fn distance(&self, other: &Position) -> u8 {
        match self.deltas(other) {
            (1, 1) => 2,
            (dr, dc) => dr + dc,
        }
    }

    pub fn is_orthogonally_adjacent(&self, other: &Position) -> bool {
        let (dr, dc) = self.deltas(other);
        dr + dc == 1
    }

    pub fn is_diagonally_adjacent(&self, other: &Position) -> bool {
        self.deltas(other) == (1, 1)
    }

    /// The tile between two positions two steps apart on a row or column
    pub fn straight_midpoint(&self, other: &Position) -> Option<Position> {
        match self.deltas(other) {
            (2, 0) | (0, 2) => Some(Position::new(
                (self.row + other.row) / 2,
                (self.col + other.col) / 2,
            )),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// All 25 positions in row-major order
pub fn all_positions() -> impl Iterator<Item = Position> {
    (1..=GRID_SIZE).flat_map(|row| (1..=GRID_SIZE).map(move |col| Position::new(row, col)))
}

pub const CONTROL_POINTS: [Position; 3] = [
    Position::new(3, 1),
    Position::new(3, 3),
    Position::new(3, 5),
];
pub const CENTER_POINT: Position = Position::new(3, 3);
pub const SIDE_POINTS: [Position; 2] = [Position::new(3, 1), Position::new(3, 5)];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub owner: Seat,
    pub kind: UnitKind,
    pub acted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [[Option<Unit>; GRID_SIZE as usize]; GRID_SIZE as usize],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(position: Position) -> (usize, usize) {
        (position.row as usize - 1, position.col as usize - 1)
    }

    pub fn get(&self, position: Position) -> Option<&Unit> {
        if !position.is_on_board() {
            return None;
        }
        let (r, c) = Self::index(position);
        self.cells[r][c].as_ref()
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut Unit> {
        if !position.is_on_board() {
            return None;
        }
        let (r, c) = Self::index(position);
        self.cells[r][c].as_mut()
    }

    pub fn is_empty(&self, position: Position) -> bool {
        self.get(position).is_none()
    }

    /// Puts `unit` on an empty tile. Returns the unit back if the tile is taken.
    pub fn place(&mut self, position: Position, unit: Unit) -> Result<(), Unit> {
        if !position.is_on_board() || !self.is_empty(position) {
            return Err(unit);
        }
        let (r, c) = Self::index(position);
        self.cells[r][c] = Some(unit);
        Ok(())
    }

    pub fn take(&mut self, position: Position) -> Option<Unit> {
        if !position.is_on_board() {
            return None;
        }
        let (r, c) = Self::index(position);
        self.cells[r][c].take()
    }

    pub fn swap(&mut self, a: Position, b: Position) {
        let (ar, ac) = Self::index(a);
        let (br, bc) = Self::index(b);
        let tmp = self.cells[ar][ac];
        self.cells[ar][ac] = self.cells[br][bc];
        self.cells[br][bc] = tmp;
    }

    pub fn units(&self) -> impl Iterator<Item = (Position, &Unit)> + '_ {
        all_positions().filter_map(move |p| self.get(p).map(|u| (p, u)))
    }

    pub fn units_of(&self, seat: Seat) -> impl Iterator<Item = (Position, &Unit)> + '_ {
        self.units().filter(move |(_, u)| u.owner == seat)
    }

    pub fn find(&self, unit_id: UnitId) -> Option<(Position, Unit)> {
        self.units()
            .find(|(_, u)| u.id == unit_id)
            .map(|(p, u)| (p, *u))
    }

    pub fn count_units(&self, seat: Seat) -> usize {
        self.units_of(seat).count()
    }

    pub fn clear_acted(&mut self) {
        for unit in self.cells.iter_mut().flatten().flatten() {
            unit.acted = false;
        }
    }

    pub fn controls(&self, seat: Seat, position: Position) -> bool {
        self.get(position).is_some_and(|u| u.owner == seat)
    }

    pub fn control_points_held(&self, seat: Seat) -> usize {
        CONTROL_POINTS
            .iter()
            .filter(|p| self.controls(seat, **p))
            .count()
    }
}
