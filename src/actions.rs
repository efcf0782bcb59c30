use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::board::{Position, UnitId};
use crate::enums::{DrawReason, MatchStatus, Seat, UnitKind};
use crate::state::MatchState;

/// Unique identifier for matches
pub type MatchId = String;

/// Verified participant identity, as supplied by the identity collaborator
pub type ParticipantId = String;

/// Transport-level connection handle
pub type ConnectionId = uuid::Uuid;

/// Secret handed to a seat so it can rebind after a dropped connection
pub type ReconnectToken = String;

/// Actions a seat can take on its turn. The acting seat is always the
/// match's current seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Deploy { unit: UnitKind, target: Position },
    Move { unit_id: UnitId, target: Position },
    Rotate { unit_id: UnitId, target: Position },
    Attack { unit_id: UnitId, target: Position },
    EndTurn,
}

impl Action {
    pub fn is_end_turn(&self) -> bool {
        matches!(self, Action::EndTurn)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Deploy { unit, target } => write!(f, "deploy {} at {}", unit, target),
            Action::Move { unit_id, target } => write!(f, "move #{} to {}", unit_id, target),
            Action::Rotate { unit_id, target } => {
                write!(f, "rotate #{} with {}", unit_id, target)
            }
            Action::Attack { unit_id, target } => write!(f, "#{} attacks {}", unit_id, target),
            Action::EndTurn => write!(f, "end turn"),
        }
    }
}

/// Events pushed to the transport collaborator, paired with the match id
/// on the broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEvent {
    MatchCreated {
        seat: Seat,
        participant: ParticipantId,
    },
    MatchJoined {
        seat: Seat,
        participant: ParticipantId,
    },
    StateUpdate {
        status: MatchStatus,
        state: Arc<MatchState>,
    },
    OpponentDisconnected {
        seat: Seat,
    },
    OpponentReconnected {
        seat: Seat,
    },
    MatchConcluded {
        winner: Option<Seat>,
    },
    MatchDraw {
        reason: DrawReason,
    },
    Error {
        message: String,
    },
}

/// What a participant receives when bound to a seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatTicket {
    pub match_id: MatchId,
    pub seat: Seat,
    pub reconnect_token: ReconnectToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format_is_tagged() {
        let action = Action::Deploy {
            unit: UnitKind::Archer,
            target: Position::new(1, 3),
        };
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["kind"], "deploy");
        assert_eq!(json["unit"], "Archer");
        assert_eq!(json["target"]["col"], 3);

        let end: Action = serde_json::from_str(r#"{"kind":"end_turn"}"#).unwrap();
        assert_eq!(end, Action::EndTurn);
    }

    #[test]
    fn test_action_display() {
        let action = Action::Attack {
            unit_id: 4,
            target: Position::new(3, 3),
        };
        assert_eq!(action.to_string(), "#4 attacks (3,3)");
    }

    #[test]
    fn test_event_wire_format() {
        let event = MatchEvent::MatchDraw {
            reason: DrawReason::LowResources,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MATCH_DRAW");
        assert_eq!(json["reason"], "low_resources");
    }
}
