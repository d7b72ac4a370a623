use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use codenames_engine::{AgentError, DebateRequest, Operative, Proposal};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;

use super::IntentChannel;

/// Ranks the words it recognises from the clue first, then guesses.
#[derive(Debug)]
pub struct SimulatedOperative {
    id: String,
    skill: f64,
    latency: Option<Duration>,
    intents: IntentChannel,
    rng: Mutex<StdRng>,
}

impl SimulatedOperative {
    pub fn new(id: impl Into<String>, skill: f64, intents: IntentChannel, seed: u64) -> Self {
        let skill = if skill.is_finite() {
            skill.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            id: id.into(),
            skill,
            latency: None,
            intents,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn with_latency(mut self, latency: Option<Duration>) -> Self {
        self.latency = latency;
        self
    }

    pub fn skill(&self) -> f64 {
        self.skill
    }
}

/// Words more than half of a round's proposals listed.
fn majority_words(round: &[Proposal]) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for proposal in round {
        for word in proposal.ranked_words() {
            *counts.entry(word).or_default() += 1;
        }
    }
    let mut words: Vec<String> = counts
        .into_iter()
        .filter(|(_, n)| *n * 2 > round.len())
        .map(|(w, _)| w)
        .collect();
    words.sort();
    words
}

#[async_trait]
impl Operative for SimulatedOperative {
    fn id(&self) -> &str {
        &self.id
    }

    async fn propose(&self, request: &DebateRequest) -> Result<Proposal, AgentError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let targets = self.intents.targets_for(request.turn).await;
        let unrevealed: Vec<String> = request
            .board
            .iter()
            .filter(|card| !card.revealed)
            .map(|card| card.word.clone())
            .collect();

        let mut rng = self.rng.lock().await;
        let mut ranked: Vec<String> = targets
            .iter()
            .filter(|t| unrevealed.contains(t))
            .filter(|_| rng.gen_bool(self.skill))
            .cloned()
            .collect();
        let recognised = ranked.len();

        // Later rounds lean toward what the team already agreed on.
        if let Some(last) = request.previous_rounds.last() {
            for word in majority_words(last) {
                if unrevealed.contains(&word) && !ranked.contains(&word) {
                    ranked.push(word);
                }
            }
        }

        let mut rest: Vec<String> = unrevealed
            .into_iter()
            .filter(|w| !ranked.contains(w))
            .collect();
        rest.shuffle(&mut *rng);
        let fillers = if recognised == 0 { 2 } else { 1 };
        ranked.extend(rest.into_iter().take(fillers));

        let confidence = if targets.is_empty() {
            0.5
        } else {
            0.2 + 0.8 * recognised as f64 / targets.len() as f64
        };
        debug!(
            agent = %self.id,
            turn = request.turn,
            round = request.round,
            recognised,
            words = ?ranked,
            "Operative proposal"
        );

        Ok(Proposal::new(self.id.clone(), ranked)
            .with_confidence(confidence)
            .with_rationale(format!(
                "recognised {} of {} intended cards",
                recognised,
                targets.len()
            )))
    }
}
