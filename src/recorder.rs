// Persistence collaborator: receives one summary per finished match.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::actions::{MatchId, ParticipantId};
use crate::enums::{DrawReason, MatchStatus, Seat, VictoryKind};
use crate::errors::{MatchError, MatchResult};

/// How a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Conclusion {
    Victory { kind: VictoryKind },
    Draw { reason: DrawReason },
    Surrender,
    Abandoned,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub seat_a: Option<ParticipantId>,
    pub seat_b: Option<ParticipantId>,
    pub status: MatchStatus,
    pub conclusion: Conclusion,
    pub winner_seat: Option<Seat>,
    pub winner: Option<ParticipantId>,
    pub turn_count: u32,
}

/// Receives the final record of every match exactly once, after the status
/// has become terminal. Failures are logged by the caller and never affect
/// the match itself.
#[async_trait]
pub trait MatchRecorder: Send + Sync {
    async fn record(&self, record: MatchRecord) -> MatchResult<()>;
}

/// Writes each record to the log as one JSON line
pub struct LogRecorder;

#[async_trait]
impl MatchRecorder for LogRecorder {
    async fn record(&self, record: MatchRecord) -> MatchResult<()> {
        let json = serde_json::to_string(&record)
            .map_err(|e| MatchError::persistence(record.match_id.clone(), e))?;
        log::info!(
            "🏁 Match {} {:?} after {} turns, winner: {}",
            record.match_id,
            record.conclusion,
            record.turn_count,
            record.winner.as_deref().unwrap_or("none")
        );
        log::info!("{}", json);
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl MatchRecorder for MemoryRecorder {
    async fn record(&self, record: MatchRecord) -> MatchResult<()> {
        self.records.lock().await.push(record);
        Ok(())
    }
}
