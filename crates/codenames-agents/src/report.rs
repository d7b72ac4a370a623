//! On-disk game records: a JSONL event stream and a Markdown summary.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use codenames_engine::{GameEvent, GameReport, ReportError, ReportSink, ScoredWord, Team};

/// `<log_dir>/game_<id>.jsonl`
pub fn jsonl_path(log_dir: &Path, game_id: &str) -> PathBuf {
    log_dir.join(format!("game_{}.jsonl", game_id))
}

/// `<log_dir>/game_<id>.md`
pub fn markdown_path(log_dir: &Path, game_id: &str) -> PathBuf {
    log_dir.join(format!("game_{}.md", game_id))
}

/// Writes each event as one JSON line, as it happens.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(log_dir: &Path, game_id: &str) -> Result<Self, ReportError> {
        std::fs::create_dir_all(log_dir)?;
        let path = jsonl_path(log_dir, game_id);
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonlSink {
    fn record(&mut self, event: &GameEvent) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ReportError> {
        self.writer.flush()?;
        Ok(())
    }
}

fn word_list(words: &[ScoredWord]) -> String {
    if words.is_empty() {
        return "none".to_string();
    }
    words
        .iter()
        .map(|w| format!("{} (score {:.2}, {} agree)", w.word, w.score, agreement_pct(w)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn agreement_pct(word: &ScoredWord) -> String {
    format!("{:.0}%", word.agreement * 100.0)
}

/// Human-readable summary: outcome, then per turn the clue, the vote, and
/// every guess.
pub struct MarkdownReport<'a>(pub &'a GameReport);

impl fmt::Display for MarkdownReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "# Game {}", report.game_id)?;
        writeln!(f)?;
        writeln!(f, "- **Outcome:** {}", report.outcome)?;
        writeln!(f, "- **Seed:** {}", report.seed)?;
        writeln!(
            f,
            "- **Teams:** red {} operatives, blue {} operatives",
            report.red_operatives, report.blue_operatives
        )?;
        writeln!(f, "- **Turns played:** {}", report.turns_played)?;
        writeln!(f, "- **Duration:** {} ms", report.duration_ms)?;

        for event in report.transcript.events() {
            match event {
                GameEvent::GameStarted { starting_team, .. } => {
                    writeln!(f, "- **Starting team:** {}", starting_team)?;
                }
                GameEvent::ClueGiven {
                    turn,
                    team,
                    clue,
                    budget,
                    ..
                } => {
                    turn_heading(f, *turn, *team)?;
                    writeln!(f, "Clue: {} (guess budget {})", clue, budget)?;
                    writeln!(f)?;
                }
                GameEvent::DebateRound {
                    round,
                    proposals,
                    failures,
                    ..
                } => {
                    writeln!(
                        f,
                        "- Debate round {}: {} proposals, {} missing",
                        round,
                        proposals.len(),
                        failures.len()
                    )?;
                    for failure in failures {
                        writeln!(f, "  - {}: {}", failure.agent_id, failure.reason)?;
                    }
                }
                GameEvent::ConsensusReached {
                    agreed,
                    disputed,
                    discarded,
                    ..
                } => {
                    writeln!(f, "- Agreed: {}", word_list(agreed))?;
                    writeln!(f, "- Disputed: {}", word_list(disputed))?;
                    if !discarded.is_empty() {
                        writeln!(f, "- Discarded: {}", discarded.join(", "))?;
                    }
                }
                GameEvent::GuessResolved {
                    word,
                    owner,
                    outcome,
                    guesses_used,
                    ..
                } => {
                    writeln!(
                        f,
                        "- Guess {}: **{}** was {} ({})",
                        guesses_used, word, owner, outcome
                    )?;
                }
                GameEvent::GuessRejected { word, error, .. } => {
                    writeln!(f, "- Rejected `{}`: {}", word, error)?;
                }
                GameEvent::TurnEnded {
                    turn,
                    team,
                    reason,
                    red_remaining,
                    blue_remaining,
                    ..
                } => {
                    // Forfeited before a clue: no heading was written yet.
                    if !matches!(
                        report.transcript.events_for_turn(*turn).next(),
                        Some(GameEvent::ClueGiven { .. })
                    ) {
                        turn_heading(f, *turn, *team)?;
                    }
                    writeln!(
                        f,
                        "- Turn ended: {} (red {} left, blue {} left)",
                        reason, red_remaining, blue_remaining
                    )?;
                }
                GameEvent::GameEnded { .. } => {}
            }
        }
        Ok(())
    }
}

fn turn_heading(f: &mut fmt::Formatter<'_>, turn: u32, team: Team) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "## Turn {} ({})", turn, team)?;
    writeln!(f)
}

pub fn render_markdown_report(report: &GameReport) -> String {
    MarkdownReport(report).to_string()
}

/// Write the Markdown summary next to the JSONL stream.
pub fn save_markdown_report(log_dir: &Path, report: &GameReport) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(log_dir)?;
    let path = markdown_path(log_dir, &report.game_id);
    std::fs::write(&path, render_markdown_report(report))?;
    Ok(path)
}
