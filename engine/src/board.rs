//! Board model: the 25-card grid and per-team bookkeeping.
//!
//! Cards are created once per game and only ever flip from hidden to
//! revealed. Words are normalised (trimmed, lowercased) on the way in and on
//! every lookup, so matching is case-insensitive.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Number of cards on a board.
pub const BOARD_SIZE: usize = 25;
/// Cards owned by the team that plays first.
pub const STARTING_TEAM_CARDS: usize = 9;
/// Cards owned by the team that plays second.
pub const SECOND_TEAM_CARDS: usize = 8;
/// Cards owned by nobody.
pub const NEUTRAL_CARDS: usize = 7;

/// One of the two competing teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    /// The other team.
    pub fn opponent(self) -> Self {
        match self {
            Self::Red => Self::Blue,
            Self::Blue => Self::Red,
        }
    }

    /// The card owner corresponding to this team.
    pub fn owner(self) -> CardOwner {
        match self {
            Self::Red => CardOwner::Red,
            Self::Blue => CardOwner::Blue,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
        }
    }
}

/// Who a card belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardOwner {
    Red,
    Blue,
    Neutral,
    Assassin,
}

impl CardOwner {
    /// The team owning this card, if any.
    pub fn team(self) -> Option<Team> {
        match self {
            Self::Red => Some(Team::Red),
            Self::Blue => Some(Team::Blue),
            Self::Neutral | Self::Assassin => None,
        }
    }
}

impl std::fmt::Display for CardOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "red"),
            Self::Blue => write!(f, "blue"),
            Self::Neutral => write!(f, "neutral"),
            Self::Assassin => write!(f, "assassin"),
        }
    }
}

/// Errors raised by board construction and reveals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("invalid board setup: {0}")]
    InvalidSetup(String),

    #[error("'{0}' is not on the board")]
    UnknownWord(String),

    #[error("'{0}' has already been revealed")]
    AlreadyRevealed(String),
}

/// A single card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    word: String,
    owner: CardOwner,
    revealed: bool,
}

impl Card {
    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn owner(&self) -> CardOwner {
        self.owner
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }
}

/// A card as shown to a player. `owner` is `None` when hidden from the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub word: String,
    pub owner: Option<CardOwner>,
    pub revealed: bool,
}

/// Canonical form used for every word comparison.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// The 25-card grid plus remaining-card counters.
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    cards: Vec<Card>,
    starting_team: Team,
    red_remaining: usize,
    blue_remaining: usize,
}

impl Board {
    /// Draw 25 distinct words from `word_pool` and deal them out.
    ///
    /// The starting team gets 9 cards, the other team 8, plus 7 neutral and
    /// one assassin. The same pool, team, and seed always produce the same
    /// board.
    pub fn initialize<S: AsRef<str>>(
        word_pool: &[S],
        starting_team: Team,
        seed: u64,
    ) -> Result<Self, BoardError> {
        let mut distinct: Vec<String> = Vec::with_capacity(word_pool.len());
        for raw in word_pool {
            let word = normalize_word(raw.as_ref());
            if !word.is_empty() && !distinct.contains(&word) {
                distinct.push(word);
            }
        }

        if distinct.len() < BOARD_SIZE {
            return Err(BoardError::InvalidSetup(format!(
                "word pool has {} distinct words, need at least {}",
                distinct.len(),
                BOARD_SIZE
            )));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let words: Vec<String> = distinct
            .choose_multiple(&mut rng, BOARD_SIZE)
            .cloned()
            .collect();

        let mut owners = Vec::with_capacity(BOARD_SIZE);
        owners.extend(std::iter::repeat(starting_team.owner()).take(STARTING_TEAM_CARDS));
        owners.extend(std::iter::repeat(starting_team.opponent().owner()).take(SECOND_TEAM_CARDS));
        owners.extend(std::iter::repeat(CardOwner::Neutral).take(NEUTRAL_CARDS));
        owners.push(CardOwner::Assassin);
        owners.shuffle(&mut rng);

        let cards = words
            .into_iter()
            .zip(owners)
            .map(|(word, owner)| Card {
                word,
                owner,
                revealed: false,
            })
            .collect();

        Ok(Self::from_valid_cards(cards, starting_team))
    }

    /// Build a board from an explicit layout, enforcing the card-count
    /// invariants. The team holding 9 cards is the starting team.
    pub fn from_layout<S: AsRef<str>>(layout: &[(S, CardOwner)]) -> Result<Self, BoardError> {
        if layout.len() != BOARD_SIZE {
            return Err(BoardError::InvalidSetup(format!(
                "layout has {} cards, expected {}",
                layout.len(),
                BOARD_SIZE
            )));
        }

        let mut cards: Vec<Card> = Vec::with_capacity(BOARD_SIZE);
        for (raw, owner) in layout {
            let word = normalize_word(raw.as_ref());
            if word.is_empty() {
                return Err(BoardError::InvalidSetup("layout contains an empty word".into()));
            }
            if cards.iter().any(|c| c.word == word) {
                return Err(BoardError::InvalidSetup(format!(
                    "duplicate word '{}' in layout",
                    word
                )));
            }
            cards.push(Card {
                word,
                owner: *owner,
                revealed: false,
            });
        }

        let count = |owner: CardOwner| cards.iter().filter(|c| c.owner == owner).count();
        let (red, blue) = (count(CardOwner::Red), count(CardOwner::Blue));
        if count(CardOwner::Assassin) != 1 {
            return Err(BoardError::InvalidSetup(
                "layout must contain exactly one assassin".into(),
            ));
        }
        if count(CardOwner::Neutral) != NEUTRAL_CARDS {
            return Err(BoardError::InvalidSetup(format!(
                "layout must contain exactly {} neutral cards",
                NEUTRAL_CARDS
            )));
        }
        let starting_team = match (red, blue) {
            (STARTING_TEAM_CARDS, SECOND_TEAM_CARDS) => Team::Red,
            (SECOND_TEAM_CARDS, STARTING_TEAM_CARDS) => Team::Blue,
            _ => {
                return Err(BoardError::InvalidSetup(format!(
                    "team cards must split 9/8, got red={} blue={}",
                    red, blue
                )))
            }
        };

        Ok(Self::from_valid_cards(cards, starting_team))
    }

    fn from_valid_cards(cards: Vec<Card>, starting_team: Team) -> Self {
        let (red_remaining, blue_remaining) = match starting_team {
            Team::Red => (STARTING_TEAM_CARDS, SECOND_TEAM_CARDS),
            Team::Blue => (SECOND_TEAM_CARDS, STARTING_TEAM_CARDS),
        };
        Self {
            cards,
            starting_team,
            red_remaining,
            blue_remaining,
        }
    }

    /// Reveal a card. Fails without mutating anything if the word is not on
    /// the board or was already revealed.
    pub fn reveal(&mut self, word: &str) -> Result<Card, BoardError> {
        let needle = normalize_word(word);
        let card = self
            .cards
            .iter_mut()
            .find(|c| c.word == needle)
            .ok_or_else(|| BoardError::UnknownWord(needle.clone()))?;

        if card.revealed {
            return Err(BoardError::AlreadyRevealed(needle));
        }
        card.revealed = true;
        let revealed = card.clone();

        match revealed.owner {
            CardOwner::Red => self.red_remaining = self.red_remaining.saturating_sub(1),
            CardOwner::Blue => self.blue_remaining = self.blue_remaining.saturating_sub(1),
            CardOwner::Neutral | CardOwner::Assassin => {}
        }

        Ok(revealed)
    }

    /// Unrevealed cards owned by `team`.
    pub fn remaining(&self, team: Team) -> usize {
        match team {
            Team::Red => self.red_remaining,
            Team::Blue => self.blue_remaining,
        }
    }

    /// Whether every card of `team` has been revealed (a win for that team).
    pub fn is_fully_revealed(&self, team: Team) -> bool {
        self.remaining(team) == 0
    }

    /// The team holding 9 cards.
    pub fn starting_team(&self) -> Team {
        self.starting_team
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Look up a card by word.
    pub fn card(&self, word: &str) -> Option<&Card> {
        let needle = normalize_word(word);
        self.cards.iter().find(|c| c.word == needle)
    }

    /// Whether `word` is on the board and still hidden.
    pub fn is_guessable(&self, word: &str) -> bool {
        self.card(word).is_some_and(|c| !c.revealed)
    }

    pub fn unrevealed_words(&self) -> Vec<&str> {
        self.cards
            .iter()
            .filter(|c| !c.revealed)
            .map(|c| c.word.as_str())
            .collect()
    }

    pub fn assassin_revealed(&self) -> bool {
        self.cards
            .iter()
            .any(|c| c.owner == CardOwner::Assassin && c.revealed)
    }

    /// Board as operatives see it: owners only for revealed cards.
    pub fn operative_view(&self) -> Vec<CardView> {
        self.cards
            .iter()
            .map(|c| CardView {
                word: c.word.clone(),
                owner: c.revealed.then_some(c.owner),
                revealed: c.revealed,
            })
            .collect()
    }

    /// Board as spymasters see it: every owner visible.
    pub fn spymaster_view(&self) -> Vec<CardView> {
        self.cards
            .iter()
            .map(|c| CardView {
                word: c.word.clone(),
                owner: Some(c.owner),
                revealed: c.revealed,
            })
            .collect()
    }
}
