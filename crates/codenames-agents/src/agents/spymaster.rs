use async_trait::async_trait;
use codenames_engine::board::normalize_word;
use codenames_engine::{AgentError, Clue, ClueNumber, ClueRequest, ClueSource, Team};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;

use super::IntentChannel;
use crate::words::CLUE_WORDS;

/// Picks a few of its own unrevealed cards and clues them with a made-up word.
#[derive(Debug)]
pub struct SimulatedSpymaster {
    team: Team,
    max_clue_number: u32,
    intents: IntentChannel,
    rng: Mutex<StdRng>,
}

impl SimulatedSpymaster {
    pub fn new(team: Team, max_clue_number: u32, intents: IntentChannel, seed: u64) -> Self {
        Self {
            team,
            max_clue_number: max_clue_number.max(1),
            intents,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn team(&self) -> Team {
        self.team
    }
}

#[async_trait]
impl ClueSource for SimulatedSpymaster {
    async fn give_clue(&self, request: &ClueRequest) -> Result<Clue, AgentError> {
        let own = self.team.owner();
        let mut candidates: Vec<String> = request
            .board
            .iter()
            .filter(|card| !card.revealed && card.owner == Some(own))
            .map(|card| card.word.clone())
            .collect();
        if candidates.is_empty() {
            return Err(AgentError::Failed(format!(
                "{} has no unrevealed cards to clue",
                self.team
            )));
        }
        let on_board: Vec<String> = request
            .board
            .iter()
            .map(|card| normalize_word(&card.word))
            .collect();

        let (targets, word) = {
            let mut rng = self.rng.lock().await;
            candidates.shuffle(&mut *rng);
            let max = (self.max_clue_number as usize).min(candidates.len());
            let count = rng.gen_range(1..=max);
            candidates.truncate(count);

            let mut words: Vec<&str> = CLUE_WORDS
                .iter()
                .copied()
                .filter(|w| !on_board.iter().any(|b| b == w))
                .collect();
            words.shuffle(&mut *rng);
            let word = words.first().copied().unwrap_or("pass").to_string();
            (candidates, word)
        };

        debug!(team = %self.team, turn = request.turn, clue = %word, targets = ?targets, "Spymaster chose targets");
        let number = ClueNumber::Count(targets.len() as u32);
        self.intents.publish(request.turn, targets).await;
        Ok(Clue::new(word, number))
    }
}
