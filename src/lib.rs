// Novus match core - module organization
//
// The rules engine (board, combat, state) is pure and synchronous. The
// lifecycle layer (manager, actor, registry) wraps it with seat bindings,
// authority checks and timers on top of tokio.

// Rules engine
pub mod actions;
pub mod board;
pub mod combat;
pub mod enums;
pub mod state;

// Match lifecycle
pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod recorder;
pub mod registry;

// Policies for computer-controlled seats
pub mod players;

pub use crate::actions::{Action, MatchEvent, MatchId, ParticipantId, SeatTicket};
pub use crate::config::MatchConfig;
pub use crate::enums::{DrawReason, MatchStatus, Outcome, Seat, UnitKind};
pub use crate::errors::{AuthorityViolation, MatchError, MatchResult, RulesError};
pub use crate::manager::{MatchSession, MatchSnapshot};
pub use crate::players::Policy;
pub use crate::recorder::{LogRecorder, MatchRecord, MatchRecorder};
pub use crate::registry::MatchRegistry;
pub use crate::state::MatchState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
