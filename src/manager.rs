// Match lifecycle: seat bindings, the status machine, authority checks and
// timer bookkeeping for a single match.
//
// `MatchSession` never sleeps or spawns. Every operation returns `Effects`
// describing the events to broadcast, the timers to (re)arm or cancel, and
// the final record once the match is over. The actor in `actor.rs` owns a
// session and carries those effects out.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::actions::{Action, ConnectionId, MatchEvent, MatchId, ParticipantId, ReconnectToken, SeatTicket};
use crate::config::MatchConfig;
use crate::enums::{MatchStatus, Outcome, Seat, SEATS};
use crate::errors::{AuthorityViolation, MatchError, MatchResult};
use crate::players::Policy;
use crate::recorder::{Conclusion, MatchRecord};
use crate::state::MatchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    DisconnectGrace(Seat),
    Inactivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    /// Replaces any running timer of the same kind
    Start {
        timer: TimerKind,
        generation: u64,
        after: Duration,
    },
    Cancel(TimerKind),
}

/// Side effects of one lifecycle operation, in the order they happened
#[derive(Debug, Default)]
pub struct Effects {
    pub events: Vec<MatchEvent>,
    pub timers: Vec<TimerOp>,
    pub record: Option<MatchRecord>,
    /// The session is finished and should leave the registry
    pub evict: bool,
}

impl Effects {
    fn event(&mut self, event: MatchEvent) {
        self.events.push(event);
    }

    fn timer(&mut self, op: TimerOp) {
        self.timers.push(op);
    }
}

/// Who occupies a seat
#[derive(Clone)]
pub struct SeatBinding {
    pub participant: ParticipantId,
    /// `None` while the transport is disconnected
    pub connection: Option<ConnectionId>,
    pub reconnect_token: ReconnectToken,
    pub policy: Option<Arc<dyn Policy>>,
}

impl SeatBinding {
    pub fn is_policy(&self) -> bool {
        self.policy.is_some()
    }
}

impl fmt::Debug for SeatBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeatBinding")
            .field("participant", &self.participant)
            .field("connection", &self.connection)
            .field("policy", &self.policy.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Read-only view of a session handed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: MatchId,
    pub status: MatchStatus,
    pub state: Arc<MatchState>,
    pub seats: [Option<ParticipantId>; 2],
}

pub struct MatchSession {
    match_id: MatchId,
    config: MatchConfig,
    status: MatchStatus,
    state: Arc<MatchState>,
    seats: [Option<SeatBinding>; 2],
    grace_generation: [u64; 2],
    inactivity_generation: u64,
    recorded: bool,
}

impl MatchSession {
    pub fn new(match_id: MatchId, config: MatchConfig) -> Self {
        MatchSession {
            match_id,
            config,
            status: MatchStatus::Waiting,
            state: Arc::new(MatchState::with_turn_limit(config.turn_limit)),
            seats: [None, None],
            grace_generation: [0; 2],
            inactivity_generation: 0,
            recorded: false,
        }
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn state(&self) -> Arc<MatchState> {
        Arc::clone(&self.state)
    }

    pub fn binding(&self, seat: Seat) -> Option<&SeatBinding> {
        self.seats[seat.index()].as_ref()
    }

    pub fn seat_of(&self, participant: &str) -> Option<Seat> {
        SEATS.into_iter().find(|seat| {
            self.binding(*seat)
                .is_some_and(|b| !b.is_policy() && b.participant == participant)
        })
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            match_id: self.match_id.clone(),
            status: self.status,
            state: self.state(),
            seats: SEATS.map(|seat| self.binding(seat).map(|b| b.participant.clone())),
        }
    }

    fn state_update(&self) -> MatchEvent {
        MatchEvent::StateUpdate {
            status: self.status,
            state: self.state(),
        }
    }

    /// Binds `participant` to the first free seat. A `policy` makes the seat
    /// computer-controlled. The match starts once both seats are bound.
    pub fn join(
        &mut self,
        participant: ParticipantId,
        connection: Option<ConnectionId>,
        policy: Option<Arc<dyn Policy>>,
    ) -> MatchResult<(SeatTicket, Effects)> {
        if policy.is_none() && self.seat_of(&participant).is_some() {
            return Err(MatchError::AlreadyInMatch {
                participant,
                match_id: self.match_id.clone(),
            });
        }
        if self.status != MatchStatus::Waiting {
            return Err(MatchError::MatchFull {
                match_id: self.match_id.clone(),
            });
        }
        let seat = SEATS
            .into_iter()
            .find(|seat| self.binding(*seat).is_none())
            .ok_or_else(|| MatchError::MatchFull {
                match_id: self.match_id.clone(),
            })?;

        let binding = SeatBinding {
            participant: participant.clone(),
            connection,
            reconnect_token: Uuid::new_v4().to_string(),
            policy,
        };
        let ticket = SeatTicket {
            match_id: self.match_id.clone(),
            seat,
            reconnect_token: binding.reconnect_token.clone(),
        };
        log::info!("Match {}: {} takes seat {}", self.match_id, participant, seat);
        self.seats[seat.index()] = Some(binding);

        let mut effects = Effects::default();
        effects.event(match seat {
            Seat::First => MatchEvent::MatchCreated { seat, participant },
            Seat::Second => MatchEvent::MatchJoined { seat, participant },
        });

        if self.seats.iter().all(Option::is_some) {
            self.start_into(&mut effects)?;
        }
        Ok((ticket, effects))
    }

    /// WAITING -> IN_PROGRESS. Fails unless both seats are bound.
    pub fn start(&mut self) -> MatchResult<Effects> {
        let mut effects = Effects::default();
        self.start_into(&mut effects)?;
        Ok(effects)
    }

    fn start_into(&mut self, effects: &mut Effects) -> MatchResult<()> {
        if self.seats.iter().any(Option::is_none) {
            return Err(MatchError::InvalidStatusTransition {
                from: self.status,
                to: MatchStatus::InProgress,
            });
        }
        self.transition(MatchStatus::InProgress)?;
        log::info!("🎮 Match {} started", self.match_id);
        // A seat that dropped while waiting gets its grace window now.
        for seat in SEATS {
            if self.binding(seat).is_some_and(|b| !b.is_policy() && b.connection.is_none()) {
                self.arm_grace(seat, effects);
            }
        }
        self.after_transition(effects);
        Ok(())
    }

    fn transition(&mut self, to: MatchStatus) -> MatchResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(MatchError::InvalidStatusTransition {
                from: self.status,
                to,
            });
        }
        log::debug!("Match {}: {} -> {}", self.match_id, self.status, to);
        self.status = to;
        Ok(())
    }

    /// Status, then participation, then turn ownership.
    pub fn authorize(&self, participant: &str) -> Result<Seat, AuthorityViolation> {
        if self.status != MatchStatus::InProgress {
            return Err(AuthorityViolation::WrongStatus {
                status: self.status,
            });
        }
        let seat = self
            .seat_of(participant)
            .ok_or_else(|| AuthorityViolation::not_a_participant(participant))?;
        if seat != self.state.current_seat {
            return Err(AuthorityViolation::NotYourTurn {
                current: self.state.current_seat,
                attempted: seat,
            });
        }
        Ok(seat)
    }

    /// Legal actions for `participant`'s seat, empty when off turn.
    pub fn legal_actions_for(&self, participant: &str) -> MatchResult<Vec<Action>> {
        let seat = self
            .seat_of(participant)
            .ok_or_else(|| AuthorityViolation::not_a_participant(participant))?;
        Ok(self.state.legal_actions(seat))
    }

    pub fn submit(&mut self, participant: &str, action: Action) -> MatchResult<Effects> {
        let seat = self.authorize(participant)?;
        let next = self.state.successor(action)?;
        log::debug!("Match {}: seat {} plays {}", self.match_id, seat, action);
        self.state = Arc::new(next);

        let mut effects = Effects::default();
        self.after_transition(&mut effects);
        Ok(effects)
    }

    /// Broadcasts the new state, then either concludes the match, lets policy
    /// seats play, or rearms the inactivity clock.
    fn after_transition(&mut self, effects: &mut Effects) {
        effects.event(self.state_update());
        if self.conclude_if_over(effects) {
            return;
        }
        self.run_policies(effects);
        if self.status == MatchStatus::InProgress {
            self.arm_inactivity(effects);
        }
    }

    fn conclude_if_over(&mut self, effects: &mut Effects) -> bool {
        match self.state.outcome() {
            Some(Outcome::Victory { winner, kind }) => {
                self.conclude(MatchStatus::Completed, Conclusion::Victory { kind }, Some(winner), effects);
                true
            }
            Some(Outcome::Draw { reason }) => {
                self.conclude(MatchStatus::Completed, Conclusion::Draw { reason }, None, effects);
                true
            }
            None => false,
        }
    }

    fn run_policies(&mut self, effects: &mut Effects) {
        while self.status == MatchStatus::InProgress {
            let seat = self.state.current_seat;
            let Some(policy) = self.binding(seat).and_then(|b| b.policy.clone()) else {
                return;
            };
            let legal = self.state.legal_actions(seat);
            let mut action = policy.choose(&self.state, &legal, seat);
            if !legal.contains(&action) {
                log::warn!(
                    "Match {}: policy {} picked illegal {}, ending turn instead",
                    self.match_id,
                    policy.name(),
                    action
                );
                action = Action::EndTurn;
            }
            match self.state.successor(action) {
                Ok(next) => self.state = Arc::new(next),
                Err(e) => {
                    log::warn!("Match {}: policy action {} rejected: {}", self.match_id, action, e);
                    match self.state.successor(Action::EndTurn) {
                        Ok(next) => self.state = Arc::new(next),
                        Err(_) => return,
                    }
                }
            }
            effects.event(self.state_update());
            if self.conclude_if_over(effects) {
                return;
            }
        }
    }

    fn arm_inactivity(&mut self, effects: &mut Effects) {
        self.inactivity_generation += 1;
        let human_turn = self
            .binding(self.state.current_seat)
            .is_some_and(|b| !b.is_policy());
        if human_turn {
            effects.timer(TimerOp::Start {
                timer: TimerKind::Inactivity,
                generation: self.inactivity_generation,
                after: self.config.inactivity_timeout,
            });
        } else {
            effects.timer(TimerOp::Cancel(TimerKind::Inactivity));
        }
    }

    fn arm_grace(&mut self, seat: Seat, effects: &mut Effects) {
        self.grace_generation[seat.index()] += 1;
        effects.timer(TimerOp::Start {
            timer: TimerKind::DisconnectGrace(seat),
            generation: self.grace_generation[seat.index()],
            after: self.config.disconnect_grace,
        });
    }

    /// The inactivity clock ran out: end the current seat's turn for it.
    pub fn inactivity_elapsed(&mut self, generation: u64) -> Effects {
        let mut effects = Effects::default();
        if self.status != MatchStatus::InProgress || generation != self.inactivity_generation {
            log::debug!("Match {}: stale inactivity timer {}", self.match_id, generation);
            return effects;
        }
        let seat = self.state.current_seat;
        match self.state.successor(Action::EndTurn) {
            Ok(next) => {
                log::warn!("⏰ Match {}: seat {} timed out, turn ended", self.match_id, seat);
                self.state = Arc::new(next);
                self.after_transition(&mut effects);
            }
            Err(e) => log::error!("Match {}: forced end turn failed: {}", self.match_id, e),
        }
        effects
    }

    /// Transport dropped. Unknown or superseded handles are ignored.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Effects {
        let mut effects = Effects::default();
        let Some(seat) = SEATS.into_iter().find(|seat| {
            self.binding(*seat)
                .is_some_and(|b| b.connection == Some(connection))
        }) else {
            log::debug!("Match {}: ignoring stale disconnect {}", self.match_id, connection);
            return effects;
        };
        if let Some(binding) = self.seats[seat.index()].as_mut() {
            binding.connection = None;
        }
        if self.status.is_terminal() {
            return effects;
        }
        log::info!("Match {}: seat {} disconnected", self.match_id, seat);
        self.arm_grace(seat, &mut effects);
        effects.event(MatchEvent::OpponentDisconnected { seat });
        effects
    }

    /// Grace window for `seat` ran out without a reconnect.
    pub fn grace_elapsed(&mut self, seat: Seat, generation: u64) -> Effects {
        let mut effects = Effects::default();
        let reconnected = self.binding(seat).map_or(true, |b| b.connection.is_some());
        if generation != self.grace_generation[seat.index()] || reconnected {
            log::debug!("Match {}: stale grace timer for seat {}", self.match_id, seat);
            return effects;
        }
        match self.status {
            MatchStatus::InProgress => {
                log::warn!("Match {}: seat {} did not return, abandoning", self.match_id, seat);
                self.conclude(MatchStatus::Abandoned, Conclusion::Abandoned, Some(seat.opponent()), &mut effects);
            }
            MatchStatus::Waiting => {
                log::info!("Match {}: creator left before anyone joined", self.match_id);
                effects.timer(TimerOp::Cancel(TimerKind::DisconnectGrace(seat)));
                effects.evict = true;
            }
            MatchStatus::Completed | MatchStatus::Abandoned => {}
        }
        effects
    }

    /// Rebinds `participant`'s seat to a fresh connection.
    pub fn reconnect(
        &mut self,
        participant: &str,
        connection: ConnectionId,
    ) -> MatchResult<(SeatTicket, Effects)> {
        let seat = self
            .seat_of(participant)
            .ok_or_else(|| AuthorityViolation::not_a_participant(participant))?;
        self.rebind(seat, connection)
    }

    /// Token handshake for a seat whose owner lost its connection.
    pub fn reconnect_with_token(
        &mut self,
        seat: Seat,
        token: &str,
        connection: ConnectionId,
    ) -> MatchResult<(SeatTicket, Effects)> {
        let valid = self
            .binding(seat)
            .is_some_and(|b| !b.is_policy() && b.reconnect_token == token);
        if !valid {
            log::warn!("Match {}: bad reconnect token for seat {}", self.match_id, seat);
            return Err(MatchError::AuthenticationFailed {
                match_id: self.match_id.clone(),
                seat,
            });
        }
        self.rebind(seat, connection)
    }

    fn rebind(&mut self, seat: Seat, connection: ConnectionId) -> MatchResult<(SeatTicket, Effects)> {
        if self.status.is_terminal() {
            return Err(MatchError::SessionClosed {
                match_id: self.match_id.clone(),
            });
        }
        let binding = self.seats[seat.index()]
            .as_mut()
            .ok_or_else(|| MatchError::unknown_participant(seat.to_string()))?;
        let was_disconnected = binding.connection.is_none();
        binding.connection = Some(connection);
        let ticket = SeatTicket {
            match_id: self.match_id.clone(),
            seat,
            reconnect_token: binding.reconnect_token.clone(),
        };

        // Bumping the generation makes an already-fired grace message stale.
        self.grace_generation[seat.index()] += 1;
        let mut effects = Effects::default();
        effects.timer(TimerOp::Cancel(TimerKind::DisconnectGrace(seat)));
        if was_disconnected {
            log::info!("Match {}: seat {} reconnected", self.match_id, seat);
            effects.event(MatchEvent::OpponentReconnected { seat });
        }
        effects.event(self.state_update());
        Ok((ticket, effects))
    }

    /// IN_PROGRESS -> COMPLETED with the opponent winning.
    pub fn surrender(&mut self, participant: &str) -> MatchResult<Effects> {
        if self.status != MatchStatus::InProgress {
            return Err(AuthorityViolation::WrongStatus {
                status: self.status,
            }
            .into());
        }
        let seat = self
            .seat_of(participant)
            .ok_or_else(|| AuthorityViolation::not_a_participant(participant))?;
        log::info!("Match {}: seat {} surrendered", self.match_id, seat);
        let mut effects = Effects::default();
        self.conclude(MatchStatus::Completed, Conclusion::Surrender, Some(seat.opponent()), &mut effects);
        Ok(effects)
    }

    /// IN_PROGRESS -> ABANDONED with the opponent of `seat` winning.
    pub fn forfeit(&mut self, seat: Seat) -> MatchResult<Effects> {
        if !self.status.can_transition_to(MatchStatus::Abandoned) {
            return Err(MatchError::InvalidStatusTransition {
                from: self.status,
                to: MatchStatus::Abandoned,
            });
        }
        let mut effects = Effects::default();
        self.conclude(MatchStatus::Abandoned, Conclusion::Abandoned, Some(seat.opponent()), &mut effects);
        Ok(effects)
    }

    fn conclude(
        &mut self,
        status: MatchStatus,
        conclusion: Conclusion,
        winner: Option<Seat>,
        effects: &mut Effects,
    ) {
        if let Err(e) = self.transition(status) {
            log::error!("Match {}: {}", self.match_id, e);
            return;
        }
        self.inactivity_generation += 1;
        effects.timer(TimerOp::Cancel(TimerKind::Inactivity));
        for seat in SEATS {
            self.grace_generation[seat.index()] += 1;
            effects.timer(TimerOp::Cancel(TimerKind::DisconnectGrace(seat)));
        }

        if let Conclusion::Draw { reason } = conclusion {
            effects.event(MatchEvent::MatchDraw { reason });
        }
        effects.event(MatchEvent::MatchConcluded { winner });
        log::info!(
            "🏆 Match {} {}: {:?}, winner seat {}",
            self.match_id,
            status,
            conclusion,
            winner.map_or("none".to_string(), |s| s.to_string())
        );

        if !self.recorded {
            self.recorded = true;
            effects.record = Some(self.record(status, conclusion, winner));
        }
        effects.evict = true;
    }

    fn record(&self, status: MatchStatus, conclusion: Conclusion, winner: Option<Seat>) -> MatchRecord {
        let participant = |seat: Seat| self.binding(seat).map(|b| b.participant.clone());
        MatchRecord {
            match_id: self.match_id.clone(),
            seat_a: participant(Seat::First),
            seat_b: participant(Seat::Second),
            status,
            conclusion,
            winner_seat: winner,
            winner: winner.and_then(participant),
            turn_count: self.state.turn_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Position;
    use crate::enums::{DrawReason, UnitKind};
    use crate::errors::RulesError;
    use crate::players::{GreedyPolicy, RandomPolicy};

    fn conn() -> ConnectionId {
        Uuid::new_v4()
    }

    fn started() -> (MatchSession, ConnectionId, ConnectionId) {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        let (a, b) = (conn(), conn());
        session.join("alice".into(), Some(a), None).unwrap();
        session.join("bob".into(), Some(b), None).unwrap();
        (session, a, b)
    }

    fn grace_generation(effects: &Effects, seat: Seat) -> u64 {
        effects
            .timers
            .iter()
            .find_map(|op| match op {
                TimerOp::Start {
                    timer: TimerKind::DisconnectGrace(s),
                    generation,
                    ..
                } if *s == seat => Some(*generation),
                _ => None,
            })
            .expect("grace timer should be armed")
    }

    fn inactivity_generation(effects: &Effects) -> Option<u64> {
        effects.timers.iter().rev().find_map(|op| match op {
            TimerOp::Start {
                timer: TimerKind::Inactivity,
                generation,
                ..
            } => Some(*generation),
            _ => None,
        })
    }

    #[test]
    fn test_join_binds_seats_in_order_and_starts() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        let (ticket, effects) = session.join("alice".into(), Some(conn()), None).unwrap();
        assert_eq!(ticket.seat, Seat::First);
        assert_eq!(session.status(), MatchStatus::Waiting);
        assert!(matches!(effects.events[0], MatchEvent::MatchCreated { seat: Seat::First, .. }));
        assert!(effects.timers.is_empty());

        let (ticket, effects) = session.join("bob".into(), Some(conn()), None).unwrap();
        assert_eq!(ticket.seat, Seat::Second);
        assert_eq!(session.status(), MatchStatus::InProgress);
        assert!(matches!(effects.events[0], MatchEvent::MatchJoined { seat: Seat::Second, .. }));
        assert!(matches!(
            effects.events[1],
            MatchEvent::StateUpdate {
                status: MatchStatus::InProgress,
                ..
            }
        ));
        assert!(inactivity_generation(&effects).is_some());
    }

    #[test]
    fn test_third_join_and_duplicate_join_fail() {
        let (mut session, _, _) = started();
        assert!(matches!(
            session.join("carol".into(), Some(conn()), None),
            Err(MatchError::MatchFull { .. })
        ));
        assert!(matches!(
            session.join("alice".into(), Some(conn()), None),
            Err(MatchError::AlreadyInMatch { .. })
        ));
    }

    #[test]
    fn test_start_requires_both_seats() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        session.join("alice".into(), Some(conn()), None).unwrap();
        assert_eq!(
            session.start().unwrap_err(),
            MatchError::InvalidStatusTransition {
                from: MatchStatus::Waiting,
                to: MatchStatus::InProgress
            }
        );
    }

    #[test]
    fn test_authority_pipeline_order() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        session.join("alice".into(), Some(conn()), None).unwrap();

        // Waiting: everyone gets the status error.
        let err = session.submit("mallory", Action::EndTurn).unwrap_err();
        assert_eq!(
            err,
            MatchError::Authority(AuthorityViolation::WrongStatus {
                status: MatchStatus::Waiting
            })
        );

        session.join("bob".into(), Some(conn()), None).unwrap();
        let err = session.submit("mallory", Action::EndTurn).unwrap_err();
        assert!(matches!(
            err,
            MatchError::Authority(AuthorityViolation::NotAParticipant { .. })
        ));
        let err = session.submit("bob", Action::EndTurn).unwrap_err();
        assert_eq!(
            err,
            MatchError::Authority(AuthorityViolation::NotYourTurn {
                current: Seat::First,
                attempted: Seat::Second
            })
        );
        assert!(session.submit("alice", Action::EndTurn).is_ok());
        assert_eq!(session.state().current_seat, Seat::Second);
    }

    #[test]
    fn test_illegal_action_leaves_state_unchanged() {
        let (mut session, _, _) = started();
        let before = session.state();
        let err = session
            .submit(
                "alice",
                Action::Deploy {
                    unit: UnitKind::Archer,
                    target: Position::new(3, 3),
                },
            )
            .unwrap_err();
        assert!(matches!(err, MatchError::IllegalAction(RulesError::NotHomeRow { .. })));
        assert!(Arc::ptr_eq(&before, &session.state()));
    }

    #[test]
    fn test_applied_action_restarts_inactivity() {
        let (mut session, _, _) = started();
        let effects = session
            .submit(
                "alice",
                Action::Deploy {
                    unit: UnitKind::Swordsman,
                    target: Position::new(1, 3),
                },
            )
            .unwrap();
        let state = session.state();
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.current_seat, Seat::Second);
        assert!(matches!(effects.events[0], MatchEvent::StateUpdate { .. }));
        assert_eq!(inactivity_generation(&effects), Some(session.inactivity_generation));
    }

    #[test]
    fn test_inactivity_forces_end_turn_and_ignores_stale_generations() {
        let (mut session, _, _) = started();
        let generation = session.inactivity_generation;

        let effects = session.inactivity_elapsed(generation - 1);
        assert!(effects.events.is_empty());
        assert_eq!(session.state().current_seat, Seat::First);

        let effects = session.inactivity_elapsed(generation);
        assert_eq!(session.state().current_seat, Seat::Second);
        assert_eq!(session.state().turn_number, 2);
        assert_eq!(inactivity_generation(&effects), Some(generation + 1));
    }

    #[test]
    fn test_grace_expiry_abandons_once() {
        let (mut session, a, _) = started();
        let effects = session.disconnect(a);
        assert!(matches!(effects.events[0], MatchEvent::OpponentDisconnected { seat: Seat::First }));
        let generation = grace_generation(&effects, Seat::First);

        let effects = session.grace_elapsed(Seat::First, generation);
        assert_eq!(session.status(), MatchStatus::Abandoned);
        assert!(effects.evict);
        let record = effects.record.expect("record on abandonment");
        assert_eq!(record.winner_seat, Some(Seat::Second));
        assert_eq!(record.winner.as_deref(), Some("bob"));
        assert_eq!(record.conclusion, Conclusion::Abandoned);
        assert!(effects
            .events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchConcluded { winner: Some(Seat::Second) })));

        // A second delivery changes nothing.
        let again = session.grace_elapsed(Seat::First, generation);
        assert!(again.record.is_none());
        assert!(again.events.is_empty());
        assert!(session.forfeit(Seat::First).is_err());
    }

    #[test]
    fn test_reconnect_wins_over_pending_grace() {
        let (mut session, a, _) = started();
        let effects = session.disconnect(a);
        let generation = grace_generation(&effects, Seat::First);

        let new_conn = conn();
        let (ticket, effects) = session.reconnect("alice", new_conn).unwrap();
        assert_eq!(ticket.seat, Seat::First);
        assert!(effects
            .timers
            .contains(&TimerOp::Cancel(TimerKind::DisconnectGrace(Seat::First))));
        assert!(matches!(effects.events[0], MatchEvent::OpponentReconnected { seat: Seat::First }));

        // The grace message was already in flight.
        let effects = session.grace_elapsed(Seat::First, generation);
        assert!(effects.events.is_empty());
        assert_eq!(session.status(), MatchStatus::InProgress);

        // The old handle is stale now.
        assert!(session.disconnect(a).events.is_empty());
        assert_eq!(session.binding(Seat::First).and_then(|b| b.connection), Some(new_conn));
    }

    #[test]
    fn test_reconnect_with_token() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        let a = conn();
        let (ticket, _) = session.join("alice".into(), Some(a), None).unwrap();
        session.join("bob".into(), Some(conn()), None).unwrap();
        session.disconnect(a);

        let err = session
            .reconnect_with_token(Seat::First, "not-the-token", conn())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::AuthenticationFailed {
                match_id: "m1".into(),
                seat: Seat::First
            }
        );
        assert_eq!(session.binding(Seat::First).and_then(|b| b.connection), None);

        let fresh = conn();
        let (rebound, _) = session
            .reconnect_with_token(Seat::First, &ticket.reconnect_token, fresh)
            .unwrap();
        assert_eq!(rebound, ticket);
        assert_eq!(session.binding(Seat::First).and_then(|b| b.connection), Some(fresh));
    }

    #[test]
    fn test_waiting_creator_leaves_and_session_is_evicted() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        let a = conn();
        session.join("alice".into(), Some(a), None).unwrap();
        let effects = session.disconnect(a);
        let generation = grace_generation(&effects, Seat::First);
        let effects = session.grace_elapsed(Seat::First, generation);
        assert!(effects.evict);
        assert!(effects.record.is_none());
        assert_eq!(session.status(), MatchStatus::Waiting);
    }

    #[test]
    fn test_surrender_completes_with_opponent_winning() {
        let (mut session, _, _) = started();
        // Off turn surrender is allowed.
        let effects = session.surrender("bob").unwrap();
        assert_eq!(session.status(), MatchStatus::Completed);
        let record = effects.record.unwrap();
        assert_eq!(record.winner_seat, Some(Seat::First));
        assert_eq!(record.conclusion, Conclusion::Surrender);
        assert!(effects
            .timers
            .contains(&TimerOp::Cancel(TimerKind::Inactivity)));

        assert_eq!(
            session.submit("alice", Action::EndTurn).unwrap_err(),
            MatchError::Authority(AuthorityViolation::WrongStatus {
                status: MatchStatus::Completed
            })
        );
        assert!(matches!(
            session.surrender("alice"),
            Err(MatchError::Authority(AuthorityViolation::WrongStatus { .. }))
        ));
    }

    #[test]
    fn test_turn_limit_draw_concludes() {
        let config = MatchConfig::default().with_turn_limit(3);
        let mut session = MatchSession::new("m1".into(), config);
        session.join("alice".into(), Some(conn()), None).unwrap();
        session.join("bob".into(), Some(conn()), None).unwrap();

        session.submit("alice", Action::EndTurn).unwrap();
        let effects = session.submit("bob", Action::EndTurn).unwrap();
        assert_eq!(session.status(), MatchStatus::Completed);
        assert!(effects.events.iter().any(|e| matches!(
            e,
            MatchEvent::MatchDraw {
                reason: DrawReason::TurnLimit
            }
        )));
        assert!(effects
            .events
            .iter()
            .any(|e| matches!(e, MatchEvent::MatchConcluded { winner: None })));
        assert_eq!(effects.record.map(|r| r.turn_count), Some(3));
    }

    #[test]
    fn test_policy_seat_plays_immediately() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        session.join("alice".into(), Some(conn()), None).unwrap();
        session
            .join("policy:greedy".into(), None, Some(Arc::new(GreedyPolicy::new())))
            .unwrap();

        let effects = session.submit("alice", Action::EndTurn).unwrap();
        // The policy took its turn inside the same call.
        assert_eq!(session.state().current_seat, Seat::First);
        assert_eq!(session.state().turn_number, 3);
        assert!(effects.events.len() >= 2);
        assert!(inactivity_generation(&effects).is_some());
        // The policy seat is not a participant for authority purposes.
        assert_eq!(session.seat_of("policy:greedy"), None);
    }

    #[test]
    fn test_policy_opening_seat_moves_on_start() {
        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        session
            .join("policy:random".into(), None, Some(Arc::new(RandomPolicy::seeded(3))))
            .unwrap();
        session.join("bob".into(), Some(conn()), None).unwrap();
        assert_eq!(session.status(), MatchStatus::InProgress);
        assert_eq!(session.state().current_seat, Seat::Second);
    }

    #[test]
    fn test_illegal_policy_choice_falls_back_to_end_turn() {
        struct Cheater;
        impl Policy for Cheater {
            fn name(&self) -> &str {
                "cheater"
            }
            fn choose(&self, _: &MatchState, _: &[Action], _: Seat) -> Action {
                Action::Move {
                    unit_id: 999,
                    target: Position::new(3, 3),
                }
            }
        }

        let mut session = MatchSession::new("m1".into(), MatchConfig::default());
        session.join("alice".into(), Some(conn()), None).unwrap();
        session.join("policy:cheater".into(), None, Some(Arc::new(Cheater))).unwrap();
        session.submit("alice", Action::EndTurn).unwrap();
        assert_eq!(session.state().current_seat, Seat::First);
        assert_eq!(
            session.state().last_action,
            Some((Seat::Second, Action::EndTurn))
        );
    }
}
