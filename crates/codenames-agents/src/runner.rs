//! One simulated game, end to end.

use codenames_engine::{GameController, GameError, GameReport, ReportError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agents::build_rosters;
use crate::config::AgentsConfig;
use crate::report::{save_markdown_report, JsonlSink};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Game(#[from] GameError),

    #[error("failed to open game log: {0}")]
    Report(#[from] ReportError),
}

/// Play one game with simulated agents and seed `seed`.
///
/// With a log directory configured, events stream to
/// `game_<id>.jsonl` and a Markdown summary is written at the end; a
/// failure to write the summary is logged, not returned.
pub async fn run_game(
    config: &AgentsConfig,
    seed: u64,
    words: &[String],
    cancel: CancellationToken,
) -> Result<GameReport, RunError> {
    let mut game_config = config.game.clone();
    game_config.random_seed = Some(seed);

    let (red, blue) = build_rosters(config, seed);
    let mut controller =
        GameController::new(game_config, red, blue).with_cancellation(cancel);

    if let Some(log_dir) = &config.log_dir {
        let sink = JsonlSink::create(log_dir, controller.game_id())?;
        info!(game_id = %controller.game_id(), path = %sink.path().display(), "Logging game events");
        controller = controller.with_sink(Box::new(sink));
    }

    let report = controller.play(words).await?;

    if let Some(log_dir) = &config.log_dir {
        match save_markdown_report(log_dir, &report) {
            Ok(path) => info!(game_id = %report.game_id, path = %path.display(), "Report written"),
            Err(e) => warn!(game_id = %report.game_id, error = %e, "Failed to write report"),
        }
    }
    Ok(report)
}
