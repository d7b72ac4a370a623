//! Independent games in parallel, summarised per team-size pairing.

use std::sync::Arc;

use codenames_engine::{GameReport, Team};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::AgentsConfig;
use crate::runner::run_game;

/// Aggregate results of a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub red_operatives: usize,
    pub blue_operatives: usize,
    pub games: usize,
    pub red_wins: usize,
    pub blue_wins: usize,
    /// Wins handed over by an assassin reveal.
    pub assassin_endings: usize,
    pub aborted: usize,
    /// Games that errored and produced no report.
    pub failed: usize,
    pub mean_turns: f64,
}

impl BatchSummary {
    /// Summarise one batch played with `red_operatives` vs `blue_operatives`.
    pub fn from_reports(
        red_operatives: usize,
        blue_operatives: usize,
        reports: &[GameReport],
        failed: usize,
    ) -> Self {
        let mut summary = Self {
            red_operatives,
            blue_operatives,
            games: reports.len() + failed,
            failed,
            ..Default::default()
        };
        let mut total_turns = 0u64;
        for report in reports {
            match report.winner() {
                Some(Team::Red) => summary.red_wins += 1,
                Some(Team::Blue) => summary.blue_wins += 1,
                None => summary.aborted += 1,
            }
            if report.ended_by_assassin() {
                summary.assassin_endings += 1;
            }
            total_turns += u64::from(report.turns_played);
        }
        if !reports.is_empty() {
            summary.mean_turns = total_turns as f64 / reports.len() as f64;
        }
        summary
    }
}

/// Reports from a batch, ordered by seed, plus how many games failed.
#[derive(Debug)]
pub struct BatchResult {
    pub red_operatives: usize,
    pub blue_operatives: usize,
    pub reports: Vec<GameReport>,
    pub failed: usize,
}

impl BatchResult {
    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_reports(
            self.red_operatives,
            self.blue_operatives,
            &self.reports,
            self.failed,
        )
    }
}

/// Inclusive range of team sizes to sweep, stepping by `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: usize,
    pub max: usize,
    pub step: usize,
}

impl SizeRange {
    pub fn fixed(size: usize) -> Self {
        Self {
            min: size,
            max: size,
            step: 1,
        }
    }

    pub fn sizes(&self) -> Vec<usize> {
        if self.min == 0 || self.step == 0 || self.min > self.max {
            return Vec::new();
        }
        (self.min..=self.max).step_by(self.step).collect()
    }
}

/// Play `games` games with seeds `base_seed..base_seed + games`.
///
/// Each game gets a child of `cancel`, so cancelling it aborts every game
/// still running.
pub async fn run_batch(
    config: &AgentsConfig,
    games: u32,
    base_seed: u64,
    words: Arc<Vec<String>>,
    cancel: CancellationToken,
) -> BatchResult {
    let mut set = JoinSet::new();
    for i in 0..games {
        let seed = base_seed.wrapping_add(u64::from(i));
        let config = config.clone();
        let words = Arc::clone(&words);
        let token = cancel.child_token();
        set.spawn(async move {
            let result = run_game(&config, seed, &words, token).await;
            (seed, result)
        });
    }

    let mut reports = Vec::new();
    let mut failed = 0;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((seed, Ok(report))) => {
                info!(seed, game_id = %report.game_id, outcome = %report.outcome, "Batch game finished");
                reports.push(report);
            }
            Ok((seed, Err(e))) => {
                warn!(seed, error = %e, "Batch game failed");
                failed += 1;
            }
            Err(e) => {
                warn!(error = %e, "Batch game task panicked");
                failed += 1;
            }
        }
    }
    reports.sort_by_key(|r| r.seed);
    BatchResult {
        red_operatives: config.red_operatives,
        blue_operatives: config.blue_operatives,
        reports,
        failed,
    }
}

/// Seed of the `game`th game (zero-based) of the `red` vs `blue` pairing.
pub fn sweep_seed(base_seed: u64, red: usize, blue: usize, game: u32) -> u64 {
    base_seed
        .wrapping_add(red as u64 * 10_000)
        .wrapping_add(blue as u64 * 1_000)
        .wrapping_add(u64::from(game))
}

/// Play a batch for every red/blue team-size pairing, one summary each.
///
/// Pairings run one after another; games within a pairing run in parallel.
pub async fn run_sweep(
    config: &AgentsConfig,
    red: SizeRange,
    blue: SizeRange,
    games: u32,
    base_seed: u64,
    words: Arc<Vec<String>>,
    cancel: CancellationToken,
) -> Vec<BatchSummary> {
    let mut summaries = Vec::new();
    for red_operatives in red.sizes() {
        for blue_operatives in blue.sizes() {
            if cancel.is_cancelled() {
                return summaries;
            }
            let config = AgentsConfig {
                red_operatives,
                blue_operatives,
                ..config.clone()
            };
            let seed = sweep_seed(base_seed, red_operatives, blue_operatives, 0);
            info!(red_operatives, blue_operatives, games, seed, "Sweep pairing starting");
            let result = run_batch(&config, games, seed, Arc::clone(&words), cancel.clone()).await;
            summaries.push(result.summary());
        }
    }
    summaries
}
