//! Game transcript: the append-only event log a controller keeps.
//!
//! Every event is also forwarded to the configured [`ReportSink`], so a
//! transcript and a JSONL file written by a sink hold the same lines.
//!
//! [`ReportSink`]: crate::collaborators::ReportSink

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::board::{CardOwner, CardView, Team};
use crate::consensus::{OrderingPolicy, Proposal, ScoredWord};
use crate::resolver::GuessOutcome;
use crate::turn::{Clue, ForfeitReason, GameOutcome, GuessBudget};

/// A collaborator that did not contribute to a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    pub agent_id: String,
    pub timed_out: bool,
    pub reason: String,
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnEndReason {
    /// A neutral or opponent card was revealed.
    WrongGuess,
    /// The clue's guess budget was used up.
    BudgetExhausted,
    /// The consensus queue ran out after at least one guess.
    QueueExhausted,
    /// No guess was made.
    Forfeited { reason: ForfeitReason },
    /// The last guess ended the game.
    GameOver,
}

impl std::fmt::Display for TurnEndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WrongGuess => write!(f, "wrong guess"),
            Self::BudgetExhausted => write!(f, "guess budget exhausted"),
            Self::QueueExhausted => write!(f, "no more agreed guesses"),
            Self::Forfeited { reason } => write!(f, "forfeited ({})", reason),
            Self::GameOver => write!(f, "game over"),
        }
    }
}

/// Everything that happens in a game, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    GameStarted {
        game_id: String,
        seed: u64,
        starting_team: Team,
        max_turns: u32,
        red_operatives: usize,
        blue_operatives: usize,
        /// Full layout, owners included.
        board: Vec<CardView>,
        timestamp: DateTime<Utc>,
    },

    ClueGiven {
        turn: u32,
        team: Team,
        clue: Clue,
        budget: GuessBudget,
        timestamp: DateTime<Utc>,
    },

    /// One fan-out to the acting team's operatives.
    DebateRound {
        turn: u32,
        team: Team,
        round: u32,
        proposals: Vec<Proposal>,
        failures: Vec<AgentFailure>,
        timestamp: DateTime<Utc>,
    },

    ConsensusReached {
        turn: u32,
        team: Team,
        agreed: Vec<ScoredWord>,
        disputed: Vec<ScoredWord>,
        discarded: Vec<String>,
        ordering: OrderingPolicy,
        queue: Vec<String>,
        proposals_considered: usize,
        timestamp: DateTime<Utc>,
    },

    GuessResolved {
        turn: u32,
        team: Team,
        word: String,
        owner: CardOwner,
        outcome: GuessOutcome,
        guesses_used: u32,
        timestamp: DateTime<Utc>,
    },

    /// A queued word the board refused. Nothing was mutated.
    GuessRejected {
        turn: u32,
        team: Team,
        word: String,
        error: String,
        timestamp: DateTime<Utc>,
    },

    TurnEnded {
        turn: u32,
        team: Team,
        reason: TurnEndReason,
        guesses_used: u32,
        red_remaining: usize,
        blue_remaining: usize,
        timestamp: DateTime<Utc>,
    },

    GameEnded {
        outcome: GameOutcome,
        turns_played: u32,
        timestamp: DateTime<Utc>,
    },
}

impl GameEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            GameEvent::GameStarted { timestamp, .. } => *timestamp,
            GameEvent::ClueGiven { timestamp, .. } => *timestamp,
            GameEvent::DebateRound { timestamp, .. } => *timestamp,
            GameEvent::ConsensusReached { timestamp, .. } => *timestamp,
            GameEvent::GuessResolved { timestamp, .. } => *timestamp,
            GameEvent::GuessRejected { timestamp, .. } => *timestamp,
            GameEvent::TurnEnded { timestamp, .. } => *timestamp,
            GameEvent::GameEnded { timestamp, .. } => *timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::GameStarted { .. } => "game_started",
            GameEvent::ClueGiven { .. } => "clue_given",
            GameEvent::DebateRound { .. } => "debate_round",
            GameEvent::ConsensusReached { .. } => "consensus_reached",
            GameEvent::GuessResolved { .. } => "guess_resolved",
            GameEvent::GuessRejected { .. } => "guess_rejected",
            GameEvent::TurnEnded { .. } => "turn_ended",
            GameEvent::GameEnded { .. } => "game_ended",
        }
    }

    /// Turn number for turn-scoped events.
    pub fn turn(&self) -> Option<u32> {
        match self {
            GameEvent::ClueGiven { turn, .. }
            | GameEvent::DebateRound { turn, .. }
            | GameEvent::ConsensusReached { turn, .. }
            | GameEvent::GuessResolved { turn, .. }
            | GameEvent::GuessRejected { turn, .. }
            | GameEvent::TurnEnded { turn, .. } => Some(*turn),
            GameEvent::GameStarted { .. } | GameEvent::GameEnded { .. } => None,
        }
    }
}

/// Ordered, append-only record of a game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    events: Vec<GameEvent>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn last(&self) -> Option<&GameEvent> {
        self.events.last()
    }

    pub fn events_for_turn(&self, turn: u32) -> impl Iterator<Item = &GameEvent> {
        self.events.iter().filter(move |e| e.turn() == Some(turn))
    }

    /// One JSON object per line.
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        let mut out = String::new();
        for event in &self.events {
            out.push_str(&serde_json::to_string(event)?);
            out.push('\n');
        }
        Ok(out)
    }
}
