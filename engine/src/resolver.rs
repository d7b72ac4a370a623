//! Guess resolution: applies one guess to the board.

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardError, CardOwner, Team};

/// What a revealed card meant for the guessing team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuessOutcome {
    CorrectOwnCard,
    WrongNeutral,
    WrongOpponentCard,
    Assassin,
}

impl GuessOutcome {
    pub fn is_correct(self) -> bool {
        self == Self::CorrectOwnCard
    }
}

impl std::fmt::Display for GuessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CorrectOwnCard => write!(f, "correct_own_card"),
            Self::WrongNeutral => write!(f, "wrong_neutral"),
            Self::WrongOpponentCard => write!(f, "wrong_opponent_card"),
            Self::Assassin => write!(f, "assassin"),
        }
    }
}

/// A resolved guess: the card that flipped and what it meant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub word: String,
    pub owner: CardOwner,
    pub outcome: GuessOutcome,
}

/// Reveal `word` on behalf of `team` and classify the result.
///
/// Unknown or already-revealed words fail before the board is touched.
pub fn resolve(board: &mut Board, team: Team, word: &str) -> Result<Resolution, BoardError> {
    let card = board.reveal(word)?;
    let outcome = match card.owner() {
        CardOwner::Assassin => GuessOutcome::Assassin,
        CardOwner::Neutral => GuessOutcome::WrongNeutral,
        owner if owner == team.owner() => GuessOutcome::CorrectOwnCard,
        _ => GuessOutcome::WrongOpponentCard,
    };

    Ok(Resolution {
        word: card.word().to_string(),
        owner: card.owner(),
        outcome,
    })
}
