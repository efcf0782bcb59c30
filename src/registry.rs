use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::actions::{Action, ConnectionId, MatchEvent, MatchId, ParticipantId, SeatTicket};
use crate::actor::{spawn_match, EvictHook, MatchHandle};
use crate::config::MatchConfig;
use crate::enums::Seat;
use crate::errors::{MatchError, MatchResult};
use crate::manager::{MatchSession, MatchSnapshot};
use crate::players::Policy;
use crate::recorder::MatchRecorder;

const EVENT_CAPACITY: usize = 1000;

type MatchMap = Arc<RwLock<HashMap<MatchId, MatchHandle>>>;
type ParticipantMap = Arc<RwLock<HashMap<ParticipantId, MatchId>>>;

/// Routes participants to their running matches and keeps each identity in
/// at most one active match. Locks are never held while waiting on a match.
#[derive(Clone)]
pub struct MatchRegistry {
    config: MatchConfig,
    matches: MatchMap,
    participants: ParticipantMap,
    events: broadcast::Sender<(MatchId, MatchEvent)>,
    recorder: Arc<dyn MatchRecorder>,
}

impl MatchRegistry {
    pub fn new(config: MatchConfig, recorder: Arc<dyn MatchRecorder>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            matches: Arc::new(RwLock::new(HashMap::new())),
            participants: Arc::new(RwLock::new(HashMap::new())),
            events,
            recorder,
        }
    }

    /// Every event of every match, tagged with its match id
    pub fn subscribe(&self) -> broadcast::Receiver<(MatchId, MatchEvent)> {
        self.events.subscribe()
    }

    pub async fn active_match_for(&self, participant: &str) -> Option<MatchId> {
        self.participants.read().await.get(participant).cloned()
    }

    pub async fn match_count(&self) -> usize {
        self.matches.read().await.len()
    }

    fn evict_hook(&self) -> EvictHook {
        let matches = self.matches.clone();
        let participants = self.participants.clone();
        Arc::new(move |match_id: MatchId| {
            let matches = matches.clone();
            let participants = participants.clone();
            async move {
                matches.write().await.remove(&match_id);
                participants.write().await.retain(|_, m| *m != match_id);
                log::info!("🧹 Match {} evicted", match_id);
            }
            .boxed()
        })
    }

    /// Claims `participant` for `match_id`, failing if it already plays elsewhere.
    async fn reserve(&self, participant: &str, match_id: &MatchId) -> MatchResult<()> {
        let mut participants = self.participants.write().await;
        if let Some(existing) = participants.get(participant) {
            return Err(MatchError::AlreadyInMatch {
                participant: participant.to_string(),
                match_id: existing.clone(),
            });
        }
        participants.insert(participant.to_string(), match_id.clone());
        Ok(())
    }

    async fn release(&self, participant: &str, match_id: &MatchId) {
        let mut participants = self.participants.write().await;
        if participants.get(participant) == Some(match_id) {
            participants.remove(participant);
        }
    }

    async fn handle(&self, match_id: &str) -> MatchResult<MatchHandle> {
        self.matches
            .read()
            .await
            .get(match_id)
            .cloned()
            .ok_or_else(|| MatchError::unknown_match(match_id))
    }

    async fn handle_for(&self, participant: &str) -> MatchResult<MatchHandle> {
        let match_id = self
            .active_match_for(participant)
            .await
            .ok_or_else(|| MatchError::unknown_participant(participant))?;
        self.handle(&match_id).await
    }

    /// Opens a new match with `participant` in seat 0.
    pub async fn create_match(
        &self,
        participant: ParticipantId,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        let handle = self.open(&participant).await?;
        let ticket = self.bind(&handle, participant, connection).await?;
        self.publish(&handle).await;
        Ok(ticket)
    }

    /// Opens a new match against a computer-controlled second seat.
    pub async fn create_match_against_policy(
        &self,
        participant: ParticipantId,
        connection: ConnectionId,
        policy: Arc<dyn Policy>,
    ) -> MatchResult<SeatTicket> {
        let handle = self.open(&participant).await?;
        let ticket = self.bind(&handle, participant.clone(), connection).await?;
        let policy_name = format!("policy:{}", policy.name());
        if let Err(e) = handle.join(policy_name, None, Some(policy)).await {
            self.release(&participant, handle.match_id()).await;
            return Err(e);
        }
        self.publish(&handle).await;
        Ok(ticket)
    }

    /// Spawns an unpublished match reserved for `participant`. Dropping the
    /// handle before `publish` stops the actor.
    async fn open(&self, participant: &str) -> MatchResult<MatchHandle> {
        let match_id = Uuid::new_v4().to_string();
        self.reserve(participant, &match_id).await?;

        let session = MatchSession::new(match_id, self.config);
        Ok(spawn_match(
            session,
            self.events.clone(),
            self.recorder.clone(),
            Some(self.evict_hook()),
        ))
    }

    /// Makes a match with a bound first seat reachable by id.
    async fn publish(&self, handle: &MatchHandle) {
        let match_id = handle.match_id().clone();
        self.matches.write().await.insert(match_id.clone(), handle.clone());
        log::info!("Created match {}", match_id);
    }

    async fn bind(
        &self,
        handle: &MatchHandle,
        participant: ParticipantId,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        let match_id = handle.match_id().clone();
        match handle.join(participant.clone(), Some(connection), None).await {
            Ok(ticket) => Ok(ticket),
            Err(e) => {
                self.release(&participant, &match_id).await;
                Err(e)
            }
        }
    }

    /// Takes the free seat of an existing match.
    pub async fn join_match(
        &self,
        match_id: &str,
        participant: ParticipantId,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        let handle = self.handle(match_id).await?;
        self.reserve(&participant, handle.match_id()).await?;
        self.bind(&handle, participant, connection).await
    }

    /// Routes an action to the match `participant` is playing.
    pub async fn submit_action(&self, participant: &str, action: Action) -> MatchResult<()> {
        let handle = self.handle_for(participant).await?;
        handle.submit(participant.to_string(), action).await
    }

    /// Routes an action to a specific match, for callers that address matches
    /// directly. Non-participants are rejected by the match itself.
    pub async fn submit_to_match(
        &self,
        match_id: &str,
        participant: &str,
        action: Action,
    ) -> MatchResult<()> {
        let handle = self.handle(match_id).await?;
        handle.submit(participant.to_string(), action).await
    }

    pub async fn legal_actions(&self, participant: &str) -> MatchResult<Vec<Action>> {
        let handle = self.handle_for(participant).await?;
        handle.legal_actions(participant.to_string()).await
    }

    /// Stale or unknown disconnects are ignored.
    pub async fn disconnect(&self, participant: &str, connection: ConnectionId) {
        match self.handle_for(participant).await {
            Ok(handle) => handle.disconnect(connection),
            Err(_) => log::debug!("Disconnect from {} with no active match", participant),
        }
    }

    pub async fn reconnect(
        &self,
        participant: &str,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        let handle = self.handle_for(participant).await?;
        handle.reconnect(participant.to_string(), connection).await
    }

    pub async fn reconnect_with_token(
        &self,
        match_id: &str,
        seat: Seat,
        token: &str,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        let handle = self.handle(match_id).await?;
        handle
            .reconnect_with_token(seat, token.to_string(), connection)
            .await
    }

    pub async fn surrender(&self, participant: &str) -> MatchResult<()> {
        let handle = self.handle_for(participant).await?;
        handle.surrender(participant.to_string()).await
    }

    /// Administrative forfeit of `seat`.
    pub async fn forfeit(&self, match_id: &str, seat: Seat) -> MatchResult<()> {
        let handle = self.handle(match_id).await?;
        handle.forfeit(seat).await
    }

    pub async fn snapshot(&self, match_id: &str) -> MatchResult<MatchSnapshot> {
        self.handle(match_id).await?.snapshot().await
    }
}
