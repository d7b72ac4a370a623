//! Codenames Engine
//!
//! Deterministic game core for Codenames played by teams of agents:
//! - Board model: the 25-card grid, dealt from a seed
//! - Consensus engine: Borda voting over ranked operative proposals
//! - Turn state machine: clue intake, guess budgets, win and abort rules
//! - Guess resolver: one reveal, classified for the acting team
//! - Game controller: drives clue, debate, consensus, and guesses per turn
//!
//! # Flow
//!
//! ```text
//!   ClueSource ──clue──▶ ┌──────────────────┐ ──events──▶ ReportSink
//!                        │  GameController  │
//!   Operative ×K ─props─▶└────────┬─────────┘
//!                                 │ build_consensus → queue
//!                                 ▼
//!                        TurnStateMachine ──resolve──▶ Board
//! ```
//!
//! Everything below the controller is synchronous and owned by a single
//! game. Collaborators are async traits so any agent backend can plug in.

#![allow(clippy::uninlined_format_args)]

pub mod board;
pub mod collaborators;
pub mod config;
pub mod consensus;
pub mod controller;
pub mod error;
pub mod resolver;
pub mod transcript;
pub mod turn;

pub use board::{Board, BoardError, Card, CardOwner, CardView, Team};
pub use collaborators::{
    AgentError, ClueRequest, ClueSource, DebateRequest, MemorySink, NullSink, Operative,
    ReportError, ReportSink, TeamRoster,
};
pub use config::GameConfig;
pub use consensus::{
    build_consensus, ConsensusConfig, ConsensusError, ConsensusResult, OrderingPolicy, Proposal,
    ScoredWord,
};
pub use controller::{GameController, GameReport};
pub use error::{GameError, GameResult};
pub use resolver::{resolve, GuessOutcome, Resolution};
pub use transcript::{AgentFailure, GameEvent, Transcript, TurnEndReason};
pub use turn::{
    AbortReason, Clue, ClueNumber, ForfeitReason, GameOutcome, GuessBudget, GuessReport,
    TurnAction, TurnError, TurnPhase, TurnState, TurnStateMachine, WinReason,
};
