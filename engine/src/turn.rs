//! Turn state machine: clue intake, guess budget, termination.
//!
//! ```text
//! AwaitingClue ──submit_clue──▶ AwaitingGuess ──correct, budget left──┐
//!      │                          │    ▲                              │
//!      │ forfeit                  │    └──────────────────────────────┘
//!      ▼                          ├─ wrong / budget spent / end_turn ─▶ TurnOver
//!   TurnOver ◀────────────────────┘                                     │
//!      │                          └─ assassin / last card ────────────▶ GameOver
//!      └─ handoff ─▶ next team's AwaitingClue, or GameOver past max_turns
//! ```
//!
//! The machine never owns the board; guesses borrow it mutably so the
//! controller keeps sole ownership.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::{Board, BoardError, Team};
use crate::resolver::{resolve, GuessOutcome, Resolution};

/// Number attached to a clue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClueNumber {
    /// A concrete count. Zero means "none of ours relate, guess freely".
    Count(u32),
    /// Guess without limit.
    Unlimited,
}

impl ClueNumber {
    /// Guesses allowed for this clue.
    pub fn budget(self) -> GuessBudget {
        match self {
            Self::Count(0) | Self::Unlimited => GuessBudget::Unbounded,
            Self::Count(n) => GuessBudget::Bounded(n.saturating_add(1)),
        }
    }
}

impl std::fmt::Display for ClueNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{}", n),
            Self::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Maximum guesses in a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessBudget {
    Bounded(u32),
    Unbounded,
}

impl GuessBudget {
    /// Whether another guess is allowed after `used` guesses.
    pub fn allows(self, used: u32) -> bool {
        match self {
            Self::Bounded(max) => used < max,
            Self::Unbounded => true,
        }
    }

    /// Guesses left after `used`, `None` when unbounded.
    pub fn remaining(self, used: u32) -> Option<u32> {
        match self {
            Self::Bounded(max) => Some(max.saturating_sub(used)),
            Self::Unbounded => None,
        }
    }
}

impl std::fmt::Display for GuessBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounded(n) => write!(f, "{}", n),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// A spymaster's clue. The word is informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clue {
    pub word: String,
    pub number: ClueNumber,
}

impl Clue {
    pub fn new(word: impl Into<String>, number: ClueNumber) -> Self {
        Self {
            word: word.into(),
            number,
        }
    }

    pub fn budget(&self) -> GuessBudget {
        self.number.budget()
    }
}

impl std::fmt::Display for Clue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' {}", self.word, self.number)
    }
}

/// Phase of the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    AwaitingClue,
    AwaitingGuess,
    TurnOver,
    GameOver,
}

impl TurnPhase {
    /// Actions legal in this phase (before per-action guards).
    pub fn allowed_actions(self) -> &'static [TurnAction] {
        match self {
            Self::AwaitingClue => &[TurnAction::SubmitClue, TurnAction::ForfeitTurn],
            Self::AwaitingGuess => &[
                TurnAction::SubmitGuess,
                TurnAction::EndTurn,
                TurnAction::ForfeitTurn,
            ],
            Self::TurnOver => &[TurnAction::Handoff],
            Self::GameOver => &[],
        }
    }
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingClue => write!(f, "awaiting_clue"),
            Self::AwaitingGuess => write!(f, "awaiting_guess"),
            Self::TurnOver => write!(f, "turn_over"),
            Self::GameOver => write!(f, "game_over"),
        }
    }
}

/// Inputs the machine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    SubmitClue,
    SubmitGuess,
    EndTurn,
    ForfeitTurn,
    Handoff,
}

impl std::fmt::Display for TurnAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubmitClue => write!(f, "submit_clue"),
            Self::SubmitGuess => write!(f, "submit_guess"),
            Self::EndTurn => write!(f, "end_turn"),
            Self::ForfeitTurn => write!(f, "forfeit_turn"),
            Self::Handoff => write!(f, "handoff"),
        }
    }
}

/// Errors from the turn state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    #[error("illegal transition: cannot {action} while {phase} ({reason})")]
    IllegalTransition {
        phase: TurnPhase,
        action: TurnAction,
        reason: String,
    },

    #[error("turn limit of {max_turns} exceeded")]
    MaxTurnsExceeded { max_turns: u32 },

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Why a turn was given up without a guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForfeitReason {
    /// The clue source timed out or failed.
    ClueUnavailable,
    /// No operative answered the debate.
    NoProposals,
    /// The consensus queue held nothing guessable.
    NothingToGuess,
}

impl std::fmt::Display for ForfeitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClueUnavailable => write!(f, "clue_unavailable"),
            Self::NoProposals => write!(f, "no_proposals"),
            Self::NothingToGuess => write!(f, "nothing_to_guess"),
        }
    }
}

/// Why a team won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinReason {
    AllCardsRevealed,
    OpponentRevealedAssassin,
}

/// Why a game ended without a winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    MaxTurnsExceeded { max_turns: u32 },
    Cancelled,
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum GameOutcome {
    Won { winner: Team, reason: WinReason },
    Aborted { reason: AbortReason },
}

impl GameOutcome {
    pub fn winner(&self) -> Option<Team> {
        match self {
            Self::Won { winner, .. } => Some(*winner),
            Self::Aborted { .. } => None,
        }
    }
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won {
                winner,
                reason: WinReason::AllCardsRevealed,
            } => write!(f, "{} wins: all of its cards were revealed", winner),
            Self::Won {
                winner,
                reason: WinReason::OpponentRevealedAssassin,
            } => write!(
                f,
                "{} wins: {} revealed the assassin",
                winner,
                winner.opponent()
            ),
            Self::Aborted {
                reason: AbortReason::MaxTurnsExceeded { max_turns },
            } => write!(f, "aborted: no winner after {} turns", max_turns),
            Self::Aborted {
                reason: AbortReason::Cancelled,
            } => write!(f, "aborted: cancelled"),
        }
    }
}

/// State of one team's turn. Replaced, not mutated, on handoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    pub team: Team,
    /// 1-indexed.
    pub turn_number: u32,
    pub clue: Option<Clue>,
    pub guesses_used: u32,
    pub budget: Option<GuessBudget>,
    pub phase: TurnPhase,
}

impl TurnState {
    fn new(team: Team, turn_number: u32) -> Self {
        Self {
            team,
            turn_number,
            clue: None,
            guesses_used: 0,
            budget: None,
            phase: TurnPhase::AwaitingClue,
        }
    }

    /// Guesses left this turn; `None` when unbounded or no clue yet.
    pub fn guesses_remaining(&self) -> Option<u32> {
        self.budget.and_then(|b| b.remaining(self.guesses_used))
    }
}

/// Result of one accepted guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessReport {
    pub resolution: Resolution,
    /// Phase after the guess was applied.
    pub phase: TurnPhase,
    pub guesses_used: u32,
    pub guesses_remaining: Option<u32>,
    /// Set when this guess ended the game.
    pub outcome: Option<GameOutcome>,
}

/// Owns whose turn it is and enforces the reveal/turn rules.
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    state: TurnState,
    max_turns: u32,
    outcome: Option<GameOutcome>,
}

impl TurnStateMachine {
    pub fn new(starting_team: Team, max_turns: u32) -> Self {
        Self {
            state: TurnState::new(starting_team, 1),
            max_turns,
            outcome: None,
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn phase(&self) -> TurnPhase {
        self.state.phase
    }

    pub fn team(&self) -> Team {
        self.state.team
    }

    pub fn turn_number(&self) -> u32 {
        self.state.turn_number
    }

    pub fn max_turns(&self) -> u32 {
        self.max_turns
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn is_game_over(&self) -> bool {
        self.state.phase == TurnPhase::GameOver
    }

    fn illegal(&self, action: TurnAction, reason: impl Into<String>) -> TurnError {
        TurnError::IllegalTransition {
            phase: self.state.phase,
            action,
            reason: reason.into(),
        }
    }

    fn require(&self, action: TurnAction) -> Result<(), TurnError> {
        if self.state.phase.allowed_actions().contains(&action) {
            Ok(())
        } else {
            Err(self.illegal(action, "not allowed in this phase"))
        }
    }

    fn finish(&mut self, outcome: GameOutcome) {
        debug!(outcome = %outcome, turn = self.state.turn_number, "Game over");
        self.outcome = Some(outcome);
        self.state.phase = TurnPhase::GameOver;
    }

    /// Accept the clue for this turn and compute the guess budget.
    pub fn submit_clue(&mut self, clue: Clue) -> Result<GuessBudget, TurnError> {
        self.require(TurnAction::SubmitClue)?;
        let budget = clue.budget();
        self.state.clue = Some(clue);
        self.state.budget = Some(budget);
        self.state.phase = TurnPhase::AwaitingGuess;
        Ok(budget)
    }

    /// Apply one guess. Board errors are returned before any mutation and
    /// leave the turn untouched.
    pub fn submit_guess(&mut self, board: &mut Board, word: &str) -> Result<GuessReport, TurnError> {
        self.require(TurnAction::SubmitGuess)?;
        let team = self.state.team;
        let resolution: Resolution = resolve(board, team, word)?;
        self.state.guesses_used += 1;

        let budget = self.state.budget.unwrap_or(GuessBudget::Unbounded);
        if resolution.outcome == GuessOutcome::Assassin {
            self.finish(GameOutcome::Won {
                winner: team.opponent(),
                reason: WinReason::OpponentRevealedAssassin,
            });
        } else if board.is_fully_revealed(team) {
            self.finish(GameOutcome::Won {
                winner: team,
                reason: WinReason::AllCardsRevealed,
            });
        } else if board.is_fully_revealed(team.opponent()) {
            self.finish(GameOutcome::Won {
                winner: team.opponent(),
                reason: WinReason::AllCardsRevealed,
            });
        } else if resolution.outcome.is_correct() && budget.allows(self.state.guesses_used) {
            self.state.phase = TurnPhase::AwaitingGuess;
        } else {
            self.state.phase = TurnPhase::TurnOver;
        }

        Ok(GuessReport {
            resolution,
            phase: self.state.phase,
            guesses_used: self.state.guesses_used,
            guesses_remaining: self.state.guesses_remaining(),
            outcome: self.outcome,
        })
    }

    /// Voluntarily stop guessing. Needs at least one guess this turn.
    pub fn end_turn(&mut self) -> Result<(), TurnError> {
        self.require(TurnAction::EndTurn)?;
        if self.state.guesses_used == 0 {
            return Err(self.illegal(TurnAction::EndTurn, "at least one guess is required"));
        }
        self.state.phase = TurnPhase::TurnOver;
        Ok(())
    }

    /// Give up the turn without guessing.
    pub fn forfeit_turn(&mut self, reason: ForfeitReason) -> Result<(), TurnError> {
        self.require(TurnAction::ForfeitTurn)?;
        if self.state.guesses_used > 0 {
            return Err(self.illegal(
                TurnAction::ForfeitTurn,
                "guesses were already made; use end_turn",
            ));
        }
        debug!(team = %self.state.team, turn = self.state.turn_number, %reason, "Turn forfeited");
        self.state.phase = TurnPhase::TurnOver;
        Ok(())
    }

    /// Pass control to the other team. Past `max_turns` the game is aborted
    /// with no winner and `MaxTurnsExceeded` is returned.
    pub fn handoff(&mut self) -> Result<&TurnState, TurnError> {
        self.require(TurnAction::Handoff)?;
        let next = self.state.turn_number + 1;
        if next > self.max_turns {
            self.finish(GameOutcome::Aborted {
                reason: AbortReason::MaxTurnsExceeded {
                    max_turns: self.max_turns,
                },
            });
            return Err(TurnError::MaxTurnsExceeded {
                max_turns: self.max_turns,
            });
        }
        self.state = TurnState::new(self.state.team.opponent(), next);
        Ok(&self.state)
    }

    /// End the game with no winner. No-op if it is already over.
    pub fn abort(&mut self, reason: AbortReason) {
        if !self.is_game_over() {
            self.finish(GameOutcome::Aborted { reason });
        }
    }
}
