use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::board::{Position, UnitId};
use crate::actions::{MatchId, ParticipantId};
use crate::enums::{MatchStatus, Seat, UnitKind};

/// Top-level error type for everything the match core reports to a caller
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchError {
    #[error("Illegal action: {0}")]
    IllegalAction(#[from] RulesError),

    #[error("Authority violation: {0}")]
    Authority(#[from] AuthorityViolation),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidStatusTransition { from: MatchStatus, to: MatchStatus },

    #[error("Match not found: {match_id}")]
    UnknownMatch { match_id: MatchId },

    #[error("Participant not found: {participant}")]
    UnknownParticipant { participant: ParticipantId },

    #[error("Reconnect authentication failed for seat {seat} in {match_id}")]
    AuthenticationFailed { match_id: MatchId, seat: Seat },

    #[error("Participant {participant} already has an active match: {match_id}")]
    AlreadyInMatch { participant: ParticipantId, match_id: MatchId },

    #[error("Match is full: {match_id}")]
    MatchFull { match_id: MatchId },

    #[error("Match session closed: {match_id}")]
    SessionClosed { match_id: MatchId },

    #[error("Configuration error: {details}")]
    Configuration { details: String },

    #[error("Failed to record match {match_id}: {details}")]
    Persistence { match_id: MatchId, details: String },
}

/// Failures of the authority pipeline, in the order they are checked
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorityViolation {
    #[error("Match is {status}, not in progress")]
    WrongStatus { status: MatchStatus },

    #[error("{participant} is not a participant of this match")]
    NotAParticipant { participant: ParticipantId },

    #[error("Not your turn: current={current}, attempted={attempted}")]
    NotYourTurn { current: Seat, attempted: Seat },
}

/// Legality failures raised by the rules engine. State is never touched
/// when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RulesError {
    #[error("Position {position} is off the board")]
    OutOfBounds { position: Position },

    #[error("{position} is not on the home row of seat {seat}")]
    NotHomeRow { seat: Seat, position: Position },

    #[error("Tile {position} is occupied")]
    TileOccupied { position: Position },

    #[error("Deployment cap reached for {unit}")]
    DeploymentCapReached { unit: UnitKind },

    #[error("No actions remaining this turn")]
    NoActionsRemaining,

    #[error("Unit {unit_id} is not on the board")]
    UnitNotFound { unit_id: UnitId },

    #[error("Unit {unit_id} does not belong to seat {seat}")]
    NotOwnUnit { unit_id: UnitId, seat: Seat },

    #[error("Unit {unit_id} has already acted this turn")]
    AlreadyActed { unit_id: UnitId },

    #[error("{target} is out of range for unit {unit_id}")]
    OutOfRange { unit_id: UnitId, target: Position },

    #[error("Path to {target} is blocked")]
    PathBlocked { target: Position },

    #[error("No friendly unit at {target}")]
    NoFriendlyUnit { target: Position },

    #[error("Cannot rotate two units of the same kind ({unit})")]
    SameKindRotation { unit: UnitKind },

    #[error("{target} is not a valid rotation partner for unit {unit_id}")]
    InvalidRotation { unit_id: UnitId, target: Position },

    #[error("No enemy unit at {target}")]
    NoEnemyUnit { target: Position },

    #[error("No line of sight to {target}")]
    NoLineOfSight { target: Position },

    #[error("{defender} is immune to ranged attacks")]
    RangedImmune { defender: UnitKind },

    #[error("{attacker} cannot defeat {defender}")]
    CannotDefeat { attacker: UnitKind, defender: UnitKind },
}

/// Result type aliases for convenience
pub type MatchResult<T> = Result<T, MatchError>;
pub type RulesResult<T> = Result<T, RulesError>;

impl MatchError {
    pub fn unknown_match(match_id: impl Into<MatchId>) -> Self {
        Self::UnknownMatch {
            match_id: match_id.into(),
        }
    }

    pub fn unknown_participant(participant: impl Into<ParticipantId>) -> Self {
        Self::UnknownParticipant {
            participant: participant.into(),
        }
    }

    pub fn configuration(details: impl Into<String>) -> Self {
        Self::Configuration {
            details: details.into(),
        }
    }

    pub fn persistence(match_id: impl Into<MatchId>, details: impl ToString) -> Self {
        Self::Persistence {
            match_id: match_id.into(),
            details: details.to_string(),
        }
    }

    /// True for the three authority-pipeline failures
    pub fn is_authority(&self) -> bool {
        matches!(self, Self::Authority(_))
    }
}

impl AuthorityViolation {
    pub fn not_a_participant(participant: impl Into<ParticipantId>) -> Self {
        Self::NotAParticipant {
            participant: participant.into(),
        }
    }
}
