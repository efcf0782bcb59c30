use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two fixed player slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    First = 0,
    Second = 1,
}

pub const SEATS: [Seat; 2] = [Seat::First, Seat::Second];

impl Seat {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opponent(self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }

    /// Row on which this seat deploys new units
    pub fn home_row(self) -> u8 {
        match self {
            Seat::First => 1,
            Seat::Second => 5,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    Swordsman,
    Shieldman,
    Axeman,
    Cavalry,
    Archer,
    Spearman,
}

pub const UNIT_KINDS: [UnitKind; 6] = [
    UnitKind::Swordsman,
    UnitKind::Shieldman,
    UnitKind::Axeman,
    UnitKind::Cavalry,
    UnitKind::Archer,
    UnitKind::Spearman,
];

impl UnitKind {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn move_range(self) -> u8 {
        match self {
            UnitKind::Cavalry => 2,
            _ => 1,
        }
    }

    pub fn attack_range(self) -> u8 {
        match self {
            UnitKind::Archer | UnitKind::Spearman => 2,
            _ => 1,
        }
    }

    pub fn is_ranged(self) -> bool {
        self.attack_range() > 1
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnitKind::Swordsman => "Swordsman",
            UnitKind::Shieldman => "Shieldman",
            UnitKind::Axeman => "Axeman",
            UnitKind::Cavalry => "Cavalry",
            UnitKind::Archer => "Archer",
            UnitKind::Spearman => "Spearman",
        };
        f.write_str(name)
    }
}

/// Lifecycle status of a match session.
///
/// Only `Waiting -> InProgress -> {Completed | Abandoned}` edges exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Waiting,
    InProgress,
    Completed,
    Abandoned,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Abandoned)
    }

    pub fn can_transition_to(self, next: MatchStatus) -> bool {
        matches!(
            (self, next),
            (MatchStatus::Waiting, MatchStatus::InProgress)
                | (MatchStatus::InProgress, MatchStatus::Completed)
                | (MatchStatus::InProgress, MatchStatus::Abandoned)
        )
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStatus::Waiting => write!(f, "waiting"),
            MatchStatus::InProgress => write!(f, "in_progress"),
            MatchStatus::Completed => write!(f, "completed"),
            MatchStatus::Abandoned => write!(f, "abandoned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawReason {
    TurnLimit,
    LowResources,
    Stalemate,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrawReason::TurnLimit => write!(f, "turn limit reached"),
            DrawReason::LowResources => write!(f, "both seats below three resources"),
            DrawReason::Stalemate => write!(f, "invincible units hold control points"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VictoryKind {
    ControlPoints,
    Elimination,
}

/// Terminal result of the rules, as reported by `MatchState::outcome`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outcome {
    Victory { winner: Seat, kind: VictoryKind },
    Draw { reason: DrawReason },
}

impl Outcome {
    pub fn winner(&self) -> Option<Seat> {
        match self {
            Outcome::Victory { winner, .. } => Some(*winner),
            Outcome::Draw { .. } => None,
        }
    }
}
