//! Per-game configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::board::Team;
use crate::consensus::{ConsensusConfig, OrderingPolicy};
use crate::error::GameError;

/// Options recognised by the game controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Agreement ratio a word must exceed to be agreed.
    pub majority_threshold: f64,
    /// Turns played before the game is aborted as a draw.
    pub max_turns: u32,
    /// Bound on every clue and proposal request, in milliseconds.
    pub per_agent_timeout_ms: u64,
    /// Seed for board generation. Random when absent.
    pub random_seed: Option<u64>,
    /// Debate rounds per clue. Consensus runs on the last one.
    pub debate_rounds: u32,
    pub ordering: OrderingPolicy,
    pub max_rank_spread: Option<usize>,
    /// Team holding 9 cards. Derived from the seed when absent.
    pub starting_team: Option<Team>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            majority_threshold: 0.5,
            max_turns: 20,
            per_agent_timeout_ms: 30_000,
            random_seed: None,
            debate_rounds: 1,
            ordering: OrderingPolicy::AgreedFirst,
            max_rank_spread: None,
            starting_team: None,
        }
    }
}

impl GameConfig {
    pub fn per_agent_timeout(&self) -> Duration {
        Duration::from_millis(self.per_agent_timeout_ms)
    }

    /// Consensus settings derived from this config.
    pub fn consensus(&self) -> ConsensusConfig {
        ConsensusConfig {
            majority_threshold: self.majority_threshold,
            max_rank_spread: self.max_rank_spread,
            ordering: self.ordering,
        }
    }

    /// Starting team for a game played with `seed`.
    pub fn starting_team_for(&self, seed: u64) -> Team {
        self.starting_team.unwrap_or(if seed % 2 == 0 {
            Team::Red
        } else {
            Team::Blue
        })
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if !(0.0..1.0).contains(&self.majority_threshold) {
            return Err(GameError::Config(format!(
                "majority_threshold must be in [0, 1), got {}",
                self.majority_threshold
            )));
        }
        if self.max_turns == 0 {
            return Err(GameError::Config("max_turns must be at least 1".into()));
        }
        if self.debate_rounds == 0 {
            return Err(GameError::Config("debate_rounds must be at least 1".into()));
        }
        if self.per_agent_timeout_ms == 0 {
            return Err(GameError::Config(
                "per_agent_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
