//! Full games between simulated teams.

use std::sync::Arc;

use codenames_agents::batch::{run_sweep, SizeRange};
use codenames_agents::config::AgentsConfig;
use codenames_agents::report::{jsonl_path, markdown_path};
use codenames_agents::words::default_word_pool;
use codenames_agents::{run_batch, run_game};
use codenames_engine::{AbortReason, GameEvent, GameOutcome, GameReport, Team};
use tokio_util::sync::CancellationToken;

fn config() -> AgentsConfig {
    AgentsConfig {
        log_dir: None,
        ..AgentsConfig::default()
    }
}

fn guessed_words(report: &GameReport) -> Vec<String> {
    report
        .transcript
        .events()
        .iter()
        .filter_map(|event| match event {
            GameEvent::GuessResolved { word, .. } => Some(word.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_same_seed_replays_the_same_game() {
    let words = default_word_pool();
    let config = config();

    let a = run_game(&config, 2024, &words, CancellationToken::new())
        .await
        .unwrap();
    let b = run_game(&config, 2024, &words, CancellationToken::new())
        .await
        .unwrap();

    assert_ne!(a.game_id, b.game_id);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(a.turns_played, b.turns_played);
    assert_eq!(guessed_words(&a), guessed_words(&b));
    assert_eq!(a.final_board, b.final_board);
}

#[tokio::test]
async fn test_game_ends_with_a_final_event() {
    let words = default_word_pool();
    let report = run_game(&config(), 7, &words, CancellationToken::new())
        .await
        .unwrap();

    assert!(report.turns_played >= 1);
    assert!(report.turns_played <= config().game.max_turns);
    assert!(matches!(
        report.transcript.events().first(),
        Some(GameEvent::GameStarted { .. })
    ));
    assert!(matches!(
        report.transcript.last(),
        Some(GameEvent::GameEnded { .. })
    ));
    if report.ended_by_assassin() {
        assert!(report.winner().is_some());
    }
}

#[tokio::test]
async fn test_cancelled_game_is_aborted() {
    let words = default_word_pool();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = run_game(&config(), 3, &words, cancel).await.unwrap();
    assert_eq!(
        report.outcome,
        GameOutcome::Aborted {
            reason: AbortReason::Cancelled
        }
    );
    assert_eq!(report.turns_played, 0);
}

#[tokio::test]
async fn test_logs_written_to_log_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = AgentsConfig {
        log_dir: Some(dir.path().to_path_buf()),
        ..AgentsConfig::default()
    };
    let words = default_word_pool();

    let report = run_game(&config, 11, &words, CancellationToken::new())
        .await
        .unwrap();

    let jsonl = std::fs::read_to_string(jsonl_path(dir.path(), &report.game_id)).unwrap();
    let lines: Vec<&str> = jsonl.lines().collect();
    assert_eq!(lines.len(), report.transcript.len());
    for (line, event) in lines.iter().zip(report.transcript.events()) {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["type"], event.event_type());
    }

    let markdown = std::fs::read_to_string(markdown_path(dir.path(), &report.game_id)).unwrap();
    assert!(markdown.contains(&format!("# Game {}", report.game_id)));
    assert!(markdown.contains(&report.outcome.to_string()));
}

#[tokio::test]
async fn test_batch_counts_every_game() {
    let words = Arc::new(default_word_pool());
    let result = run_batch(&config(), 5, 100, words, CancellationToken::new()).await;

    assert_eq!(result.failed, 0);
    let seeds: Vec<u64> = result.reports.iter().map(|r| r.seed).collect();
    assert_eq!(seeds, vec![100, 101, 102, 103, 104]);

    let summary = result.summary();
    assert_eq!((summary.red_operatives, summary.blue_operatives), (3, 3));
    assert_eq!(summary.games, 5);
    assert_eq!(summary.red_wins + summary.blue_wins + summary.aborted, 5);
    assert!(summary.assassin_endings <= summary.red_wins + summary.blue_wins);
    assert!(summary.mean_turns >= 1.0);
}

#[tokio::test]
async fn test_uneven_teams_debate_with_their_own_size() {
    let config = AgentsConfig {
        red_operatives: 2,
        blue_operatives: 4,
        ..config()
    };
    let words = default_word_pool();
    let report = run_game(&config, 31, &words, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!((report.red_operatives, report.blue_operatives), (2, 4));
    match report.transcript.events().first() {
        Some(GameEvent::GameStarted {
            red_operatives,
            blue_operatives,
            ..
        }) => assert_eq!((*red_operatives, *blue_operatives), (2, 4)),
        other => panic!("expected game_started, got {:?}", other),
    }

    let mut rounds_seen = 0;
    for event in report.transcript.events() {
        match event {
            GameEvent::DebateRound {
                team,
                proposals,
                failures,
                ..
            } => {
                let size = config.operatives(*team);
                assert!(failures.is_empty());
                assert_eq!(proposals.len(), size, "{} debate K", team);
                rounds_seen += 1;
            }
            GameEvent::ConsensusReached {
                team,
                proposals_considered,
                ..
            } => {
                assert_eq!(*proposals_considered, config.operatives(*team));
            }
            _ => {}
        }
    }
    assert!(rounds_seen > 0);
}

#[tokio::test]
async fn test_sweep_summarises_each_pairing() {
    let words = Arc::new(default_word_pool());
    let summaries = run_sweep(
        &config(),
        SizeRange { min: 1, max: 2, step: 1 },
        SizeRange::fixed(3),
        2,
        500,
        words,
        CancellationToken::new(),
    )
    .await;

    let pairings: Vec<(usize, usize)> = summaries
        .iter()
        .map(|s| (s.red_operatives, s.blue_operatives))
        .collect();
    assert_eq!(pairings, vec![(1, 3), (2, 3)]);
    for summary in &summaries {
        assert_eq!(summary.games, 2);
        assert_eq!(summary.failed, 0);
    }
}

#[test]
fn test_team_lookup_follows_config() {
    let config = AgentsConfig {
        red_operatives: 2,
        blue_operatives: 5,
        ..AgentsConfig::default()
    };
    assert_eq!(config.operatives(Team::Red), 2);
    assert_eq!(config.operatives(Team::Blue), 5);
}
