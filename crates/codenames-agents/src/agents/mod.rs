//! Simulated players standing in for language-model agents.
//!
//! A spymaster picks target cards and publishes them on its team's
//! [`IntentChannel`]; operatives "understand" the clue by recognising each
//! target with probability `skill`. Every random choice comes from an RNG
//! seeded off the game seed, so a game replays exactly.

pub mod operative;
pub mod spymaster;

use std::sync::Arc;
use std::time::Duration;

use codenames_engine::{Team, TeamRoster};
use tokio::sync::RwLock;

use crate::config::AgentsConfig;

pub use operative::SimulatedOperative;
pub use spymaster::SimulatedSpymaster;

/// Targets a spymaster meant by its clue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub turn: u32,
    pub targets: Vec<String>,
}

/// Shared between one team's spymaster and its operatives.
#[derive(Debug, Clone, Default)]
pub struct IntentChannel {
    inner: Arc<RwLock<Option<Intent>>>,
}

impl IntentChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, turn: u32, targets: Vec<String>) {
        *self.inner.write().await = Some(Intent { turn, targets });
    }

    /// Targets for `turn`, empty if the spymaster hasn't published for it.
    pub async fn targets_for(&self, turn: u32) -> Vec<String> {
        match &*self.inner.read().await {
            Some(intent) if intent.turn == turn => intent.targets.clone(),
            _ => Vec::new(),
        }
    }
}

fn team_salt(team: Team) -> u64 {
    match team {
        Team::Red => 0x5eed_0001,
        Team::Blue => 0x5eed_0002,
    }
}

/// Build one team of simulated players.
pub fn build_roster(config: &AgentsConfig, team: Team, seed: u64) -> TeamRoster {
    let intents = IntentChannel::new();
    let salt = team_salt(team);
    let skill = config.skill(team);
    let latency = (config.latency_ms > 0).then(|| Duration::from_millis(config.latency_ms));

    let spymaster = Arc::new(SimulatedSpymaster::new(
        team,
        config.max_clue_number,
        intents.clone(),
        seed ^ salt,
    ));
    let operatives = (0..config.operatives(team))
        .map(|i| {
            let operative = SimulatedOperative::new(
                format!("{}-operative-{}", team, i + 1),
                skill,
                intents.clone(),
                seed.wrapping_add(salt).wrapping_add(i as u64 + 1),
            )
            .with_latency(latency);
            Arc::new(operative) as Arc<dyn codenames_engine::Operative>
        })
        .collect();

    TeamRoster::new(spymaster, operatives)
}

/// Red and blue rosters for a game played with `seed`.
pub fn build_rosters(config: &AgentsConfig, seed: u64) -> (TeamRoster, TeamRoster) {
    (
        build_roster(config, Team::Red, seed),
        build_roster(config, Team::Blue, seed),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_intent_channel_is_turn_scoped() {
        let channel = IntentChannel::new();
        assert!(channel.targets_for(1).await.is_empty());

        channel.publish(3, vec!["spine".into(), "soul".into()]).await;
        let reader = channel.clone();
        assert_eq!(reader.targets_for(3).await, vec!["spine", "soul"]);
        assert!(reader.targets_for(4).await.is_empty());
    }

    #[test]
    fn test_rosters_follow_config() {
        let config = AgentsConfig {
            red_operatives: 2,
            blue_operatives: 4,
            ..Default::default()
        };
        let (red, blue) = build_rosters(&config, 7);
        assert_eq!(red.operative_ids(), vec!["red-operative-1", "red-operative-2"]);
        assert_eq!(blue.operatives.len(), 4);
        assert_eq!(blue.operative_ids()[3], "blue-operative-4");
    }
}
