use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use codenames_agents::batch::{run_sweep, SizeRange};
use codenames_agents::config::AgentsConfig;
use codenames_agents::words::{default_word_pool, load_word_pool};
use codenames_agents::{run_batch, run_game};
use codenames_engine::OrderingPolicy;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "codenames-agents", about = "Run Codenames games between simulated agent teams")]
struct Cli {
    /// TOML config file; `CODENAMES_*` env vars override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Play a single game.
    Play(RunArgs),
    /// Play several independent games in parallel and print a summary.
    Batch {
        #[command(flatten)]
        run: RunArgs,
        /// Number of games.
        #[arg(long)]
        games: Option<u32>,
    },
    /// Batch every red/blue team-size pairing and print one summary per pairing.
    Sweep {
        #[command(flatten)]
        run: RunArgs,
        /// Games per pairing.
        #[arg(long)]
        games: Option<u32>,
        #[arg(long, default_value_t = 1)]
        red_min: usize,
        #[arg(long, default_value_t = 4)]
        red_max: usize,
        #[arg(long, default_value_t = 1)]
        blue_min: usize,
        #[arg(long, default_value_t = 4)]
        blue_max: usize,
        #[arg(long, default_value_t = 1)]
        step: usize,
    },
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Game seed (batch: seed of the first game).
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    max_turns: Option<u32>,
    /// Operatives on both teams; the per-team flags take precedence.
    #[arg(long)]
    operatives: Option<usize>,
    #[arg(long)]
    red_operatives: Option<usize>,
    #[arg(long)]
    blue_operatives: Option<usize>,
    /// Operative skill for both teams, in [0, 1].
    #[arg(long)]
    skill: Option<f64>,
    #[arg(long)]
    timeout_ms: Option<u64>,
    #[arg(long)]
    debate_rounds: Option<u32>,
    /// agreed_first, score_only or agreed_only.
    #[arg(long)]
    ordering: Option<OrderingPolicy>,
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Word list file, one word per line.
    #[arg(long)]
    words: Option<PathBuf>,
    /// Don't write JSONL or Markdown logs.
    #[arg(long)]
    no_log: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut AgentsConfig) {
        if let Some(max_turns) = self.max_turns {
            config.game.max_turns = max_turns;
        }
        if let Some(operatives) = self.operatives {
            config.red_operatives = operatives;
            config.blue_operatives = operatives;
        }
        if let Some(red) = self.red_operatives {
            config.red_operatives = red;
        }
        if let Some(blue) = self.blue_operatives {
            config.blue_operatives = blue;
        }
        if let Some(skill) = self.skill {
            config.red_skill = skill;
            config.blue_skill = skill;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.game.per_agent_timeout_ms = timeout_ms;
        }
        if let Some(rounds) = self.debate_rounds {
            config.game.debate_rounds = rounds;
        }
        if let Some(ordering) = self.ordering {
            config.game.ordering = ordering;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        if let Some(words) = &self.words {
            config.word_list = Some(words.clone());
        }
        if self.no_log {
            config.log_dir = None;
        }
    }
}

fn word_pool(config: &AgentsConfig) -> Result<Vec<String>> {
    match &config.word_list {
        Some(path) => load_word_pool(path).context("loading word list"),
        None => Ok(default_word_pool()),
    }
}

fn shutdown_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, aborting running games");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AgentsConfig::load(cli.config.as_deref()).context("loading configuration")?;

    let run = match &cli.command {
        Command::Play(run) => run,
        Command::Batch { run, .. } | Command::Sweep { run, .. } => run,
    };
    run.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let words = word_pool(&config)?;
    let seed = run
        .seed
        .or(config.game.random_seed)
        .unwrap_or_else(rand::random);

    let cancel = CancellationToken::new();
    shutdown_on_ctrl_c(cancel.clone());

    info!(
        seed,
        red_operatives = config.red_operatives,
        blue_operatives = config.blue_operatives,
        max_turns = config.game.max_turns,
        ordering = %config.game.ordering,
        "Codenames runner starting"
    );

    match &cli.command {
        Command::Play(_) => {
            let report = run_game(&config, seed, &words, cancel)
                .await
                .context("game failed")?;
            println!(
                "{} after {} turns (game {}, seed {})",
                report.outcome, report.turns_played, report.game_id, report.seed
            );
        }
        Command::Batch { games, .. } => {
            let games = games.unwrap_or(config.batch_games);
            let result = run_batch(&config, games, seed, Arc::new(words), cancel).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&result.summary())
                    .context("serialising batch summary")?
            );
        }
        Command::Sweep {
            games,
            red_min,
            red_max,
            blue_min,
            blue_max,
            step,
            ..
        } => {
            let red = SizeRange {
                min: *red_min,
                max: *red_max,
                step: *step,
            };
            let blue = SizeRange {
                min: *blue_min,
                max: *blue_max,
                step: *step,
            };
            if red.sizes().is_empty() || blue.sizes().is_empty() {
                anyhow::bail!("team-size ranges need 1 <= min <= max and step >= 1");
            }
            let games = games.unwrap_or(config.batch_games);
            let summaries = run_sweep(&config, red, blue, games, seed, Arc::new(words), cancel).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&summaries).context("serialising sweep summaries")?
            );
        }
    }
    Ok(())
}
