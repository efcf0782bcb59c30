// One task per match. Every command for a match goes through its queue, so
// session mutations never interleave. Timers are sleeping tasks that post
// `TimerElapsed` back into the same queue.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::actions::{Action, ConnectionId, MatchEvent, MatchId, ParticipantId, SeatTicket};
use crate::enums::Seat;
use crate::errors::{MatchError, MatchResult};
use crate::manager::{Effects, MatchSession, MatchSnapshot, TimerKind, TimerOp};
use crate::players::Policy;
use crate::recorder::MatchRecorder;

/// Called once when the actor stops, with the id of the finished match
pub type EvictHook = Arc<dyn Fn(MatchId) -> BoxFuture<'static, ()> + Send + Sync>;

type Reply<T> = oneshot::Sender<MatchResult<T>>;

enum MatchCommand {
    Join {
        participant: ParticipantId,
        connection: Option<ConnectionId>,
        policy: Option<Arc<dyn Policy>>,
        reply: Reply<SeatTicket>,
    },
    Submit {
        participant: ParticipantId,
        action: Action,
        reply: Reply<()>,
    },
    LegalActions {
        participant: ParticipantId,
        reply: Reply<Vec<Action>>,
    },
    Surrender {
        participant: ParticipantId,
        reply: Reply<()>,
    },
    Forfeit {
        seat: Seat,
        reply: Reply<()>,
    },
    Disconnect {
        connection: ConnectionId,
    },
    Reconnect {
        participant: ParticipantId,
        connection: ConnectionId,
        reply: Reply<SeatTicket>,
    },
    ReconnectWithToken {
        seat: Seat,
        token: String,
        connection: ConnectionId,
        reply: Reply<SeatTicket>,
    },
    Snapshot {
        reply: Reply<MatchSnapshot>,
    },
    TimerElapsed {
        timer: TimerKind,
        generation: u64,
    },
}

/// Cheap, cloneable address of a running match
#[derive(Clone)]
pub struct MatchHandle {
    match_id: MatchId,
    commands: mpsc::UnboundedSender<MatchCommand>,
}

impl MatchHandle {
    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    fn closed(&self) -> MatchError {
        MatchError::SessionClosed {
            match_id: self.match_id.clone(),
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> MatchCommand) -> MatchResult<T> {
        let (reply, response) = oneshot::channel();
        self.commands.send(build(reply)).map_err(|_| self.closed())?;
        response.await.map_err(|_| self.closed())?
    }

    pub async fn join(
        &self,
        participant: ParticipantId,
        connection: Option<ConnectionId>,
        policy: Option<Arc<dyn Policy>>,
    ) -> MatchResult<SeatTicket> {
        self.request(|reply| MatchCommand::Join {
            participant,
            connection,
            policy,
            reply,
        })
        .await
    }

    pub async fn submit(&self, participant: ParticipantId, action: Action) -> MatchResult<()> {
        self.request(|reply| MatchCommand::Submit {
            participant,
            action,
            reply,
        })
        .await
    }

    pub async fn legal_actions(&self, participant: ParticipantId) -> MatchResult<Vec<Action>> {
        self.request(|reply| MatchCommand::LegalActions { participant, reply })
            .await
    }

    pub async fn surrender(&self, participant: ParticipantId) -> MatchResult<()> {
        self.request(|reply| MatchCommand::Surrender { participant, reply })
            .await
    }

    pub async fn forfeit(&self, seat: Seat) -> MatchResult<()> {
        self.request(|reply| MatchCommand::Forfeit { seat, reply }).await
    }

    /// Fire and forget. A closed session has nothing left to disconnect.
    pub fn disconnect(&self, connection: ConnectionId) {
        if self.commands.send(MatchCommand::Disconnect { connection }).is_err() {
            log::debug!("Match {}: disconnect after close", self.match_id);
        }
    }

    pub async fn reconnect(
        &self,
        participant: ParticipantId,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        self.request(|reply| MatchCommand::Reconnect {
            participant,
            connection,
            reply,
        })
        .await
    }

    pub async fn reconnect_with_token(
        &self,
        seat: Seat,
        token: String,
        connection: ConnectionId,
    ) -> MatchResult<SeatTicket> {
        self.request(|reply| MatchCommand::ReconnectWithToken {
            seat,
            token,
            connection,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> MatchResult<MatchSnapshot> {
        self.request(|reply| MatchCommand::Snapshot { reply }).await
    }
}

struct MatchActor {
    session: MatchSession,
    commands: mpsc::UnboundedReceiver<MatchCommand>,
    timer_tx: mpsc::WeakUnboundedSender<MatchCommand>,
    timers: HashMap<TimerKind, (u64, JoinHandle<()>)>,
    events: broadcast::Sender<(MatchId, MatchEvent)>,
    recorder: Arc<dyn MatchRecorder>,
    on_evict: Option<EvictHook>,
    evicted: bool,
}

/// Starts the task that owns `session` and returns its address.
pub fn spawn_match(
    session: MatchSession,
    events: broadcast::Sender<(MatchId, MatchEvent)>,
    recorder: Arc<dyn MatchRecorder>,
    on_evict: Option<EvictHook>,
) -> MatchHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = MatchHandle {
        match_id: session.match_id().clone(),
        commands: tx.clone(),
    };
    let actor = MatchActor {
        session,
        commands: rx,
        timer_tx: tx.downgrade(),
        timers: HashMap::new(),
        events,
        recorder,
        on_evict,
        evicted: false,
    };
    tokio::spawn(actor.run());
    handle
}

fn split<T>(result: MatchResult<(T, Effects)>) -> (MatchResult<T>, Effects) {
    match result {
        Ok((value, effects)) => (Ok(value), effects),
        Err(e) => (Err(e), Effects::default()),
    }
}

fn split_unit(result: MatchResult<Effects>) -> (MatchResult<()>, Effects) {
    split(result.map(|effects| ((), effects)))
}

impl MatchActor {
    async fn run(mut self) {
        let match_id = self.session.match_id().clone();
        log::debug!("Match {} actor started", match_id);

        while !self.evicted {
            let Some(command) = self.commands.recv().await else {
                break;
            };
            self.handle(command);
        }

        for (_, (_, timer)) in self.timers.drain() {
            timer.abort();
        }
        self.commands.close();
        if let Some(hook) = &self.on_evict {
            hook(match_id.clone()).await;
        }
        log::info!("Match {} closed ({})", match_id, self.session.status());
    }

    fn handle(&mut self, command: MatchCommand) {
        match command {
            MatchCommand::Join {
                participant,
                connection,
                policy,
                reply,
            } => {
                let (result, effects) = split(self.session.join(participant, connection, policy));
                self.apply(effects);
                let _ = reply.send(result);
            }
            MatchCommand::Submit {
                participant,
                action,
                reply,
            } => {
                let (result, effects) = split_unit(self.session.submit(&participant, action));
                if let Err(e) = &result {
                    log::debug!("Match {}: rejected {} from {}: {}", self.session.match_id(), action, participant, e);
                }
                self.apply(effects);
                self.respond(reply, result);
            }
            MatchCommand::LegalActions { participant, reply } => {
                let _ = reply.send(self.session.legal_actions_for(&participant));
            }
            MatchCommand::Surrender { participant, reply } => {
                let (result, effects) = split_unit(self.session.surrender(&participant));
                self.apply(effects);
                self.respond(reply, result);
            }
            MatchCommand::Forfeit { seat, reply } => {
                let (result, effects) = split_unit(self.session.forfeit(seat));
                self.apply(effects);
                self.respond(reply, result);
            }
            MatchCommand::Disconnect { connection } => {
                let effects = self.session.disconnect(connection);
                self.apply(effects);
            }
            MatchCommand::Reconnect {
                participant,
                connection,
                reply,
            } => {
                let (result, effects) = split(self.session.reconnect(&participant, connection));
                self.apply(effects);
                self.respond(reply, result);
            }
            MatchCommand::ReconnectWithToken {
                seat,
                token,
                connection,
                reply,
            } => {
                let (result, effects) =
                    split(self.session.reconnect_with_token(seat, &token, connection));
                self.apply(effects);
                self.respond(reply, result);
            }
            MatchCommand::Snapshot { reply } => {
                let _ = reply.send(Ok(self.session.snapshot()));
            }
            MatchCommand::TimerElapsed { timer, generation } => {
                if self.timers.get(&timer).is_some_and(|(g, _)| *g == generation) {
                    self.timers.remove(&timer);
                }
                let effects = match timer {
                    TimerKind::Inactivity => self.session.inactivity_elapsed(generation),
                    TimerKind::DisconnectGrace(seat) => self.session.grace_elapsed(seat, generation),
                };
                self.apply(effects);
            }
        }
    }

    /// Replies to the caller and broadcasts a rejection as `MatchEvent::Error`.
    fn respond<T>(&self, reply: Reply<T>, result: MatchResult<T>) {
        if let Err(e) = &result {
            let event = MatchEvent::Error {
                message: e.to_string(),
            };
            let _ = self.events.send((self.session.match_id().clone(), event));
        }
        let _ = reply.send(result);
    }

    fn apply(&mut self, effects: Effects) {
        for op in effects.timers {
            match op {
                TimerOp::Start {
                    timer,
                    generation,
                    after,
                } => {
                    let tx = self.timer_tx.clone();
                    let task = tokio::spawn(async move {
                        tokio::time::sleep(after).await;
                        if let Some(tx) = tx.upgrade() {
                            let _ = tx.send(MatchCommand::TimerElapsed { timer, generation });
                        }
                    });
                    if let Some((_, old)) = self.timers.insert(timer, (generation, task)) {
                        old.abort();
                    }
                }
                TimerOp::Cancel(timer) => {
                    if let Some((_, old)) = self.timers.remove(&timer) {
                        old.abort();
                    }
                }
            }
        }

        let match_id = self.session.match_id();
        for event in effects.events {
            // No subscribers is fine.
            let _ = self.events.send((match_id.clone(), event));
        }

        if let Some(record) = effects.record {
            let recorder = Arc::clone(&self.recorder);
            tokio::spawn(async move {
                let match_id = record.match_id.clone();
                if let Err(e) = recorder.record(record).await {
                    log::error!("Match {}: failed to record result: {}", match_id, e);
                }
            });
        }

        if effects.evict {
            self.evicted = true;
        }
    }
}
