//! External collaborators the controller drives: clue sources, operatives,
//! and report sinks.
//!
//! Clue and proposal generation are asynchronous and may be slow or fail;
//! the controller bounds every call with a timeout. Sinks are synchronous
//! and best-effort.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{CardView, Team};
use crate::consensus::Proposal;
use crate::transcript::GameEvent;
use crate::turn::Clue;

/// Errors from clue or proposal collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    #[error("agent timed out after {0} ms")]
    Timeout(u64),

    #[error("agent failed: {0}")]
    Failed(String),

    #[error("agent call cancelled")]
    Cancelled,
}

/// What a spymaster sees when asked for a clue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClueRequest {
    pub team: Team,
    pub turn: u32,
    /// Spymaster view: every owner visible.
    pub board: Vec<CardView>,
}

/// What an operative sees in one debate round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRequest {
    pub team: Team,
    pub turn: u32,
    /// 1-indexed.
    pub round: u32,
    pub clue: Clue,
    /// Operative view: owners of hidden cards withheld.
    pub board: Vec<CardView>,
    /// Proposals from earlier rounds of this debate, oldest first.
    pub previous_rounds: Vec<Vec<Proposal>>,
}

/// Supplies one clue per turn.
#[async_trait]
pub trait ClueSource: Send + Sync {
    async fn give_clue(&self, request: &ClueRequest) -> Result<Clue, AgentError>;
}

/// A teammate that proposes a ranked guess list for a clue.
#[async_trait]
pub trait Operative: Send + Sync {
    /// Stable identifier, used as the proposal's `agent_id`.
    fn id(&self) -> &str;

    async fn propose(&self, request: &DebateRequest) -> Result<Proposal, AgentError>;
}

/// Errors from report sinks.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives every game event as it happens.
pub trait ReportSink: Send {
    fn record(&mut self, event: &GameEvent) -> Result<(), ReportError>;

    fn flush(&mut self) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ReportSink for NullSink {
    fn record(&mut self, _event: &GameEvent) -> Result<(), ReportError> {
        Ok(())
    }
}

/// Keeps events in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub events: Vec<GameEvent>,
}

impl ReportSink for MemorySink {
    fn record(&mut self, event: &GameEvent) -> Result<(), ReportError> {
        self.events.push(event.clone());
        Ok(())
    }
}

/// One team's players.
#[derive(Clone)]
pub struct TeamRoster {
    pub spymaster: Arc<dyn ClueSource>,
    pub operatives: Vec<Arc<dyn Operative>>,
}

impl TeamRoster {
    pub fn new(spymaster: Arc<dyn ClueSource>, operatives: Vec<Arc<dyn Operative>>) -> Self {
        Self {
            spymaster,
            operatives,
        }
    }

    pub fn operative_ids(&self) -> Vec<String> {
        self.operatives.iter().map(|o| o.id().to_string()).collect()
    }
}

impl std::fmt::Debug for TeamRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeamRoster")
            .field("operatives", &self.operative_ids())
            .finish_non_exhaustive()
    }
}
