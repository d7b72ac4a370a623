//! Game-level error aggregation.

use crate::board::BoardError;
use crate::consensus::ConsensusError;
use crate::turn::TurnError;

/// Any error a game can raise.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("board: {0}")]
    Board(#[from] BoardError),

    #[error("consensus: {0}")]
    Consensus(#[from] ConsensusError),

    #[error("turn: {0}")]
    Turn(#[from] TurnError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GameError {
    /// Whether the controller can skip past this error and keep playing.
    ///
    /// Rejected guesses and empty debates are expected game flow. Setup,
    /// configuration, and state machine errors mean a broken invariant.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Board(BoardError::UnknownWord(_) | BoardError::AlreadyRevealed(_)) => true,
            Self::Turn(TurnError::Board(
                BoardError::UnknownWord(_) | BoardError::AlreadyRevealed(_),
            )) => true,
            Self::Consensus(ConsensusError::NoProposals) => true,
            Self::Board(BoardError::InvalidSetup(_))
            | Self::Turn(_)
            | Self::Config(_) => false,
        }
    }
}

/// Result alias for game operations.
pub type GameResult<T> = Result<T, GameError>;
