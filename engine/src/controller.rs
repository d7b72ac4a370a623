//! Game controller: drives one game from deal to outcome.
//!
//! Per turn: clue → debate rounds (fan-out to operatives) → consensus →
//! guess loop → handoff. All suspension happens here, at collaborator
//! calls; board and turn updates are synchronous so cancellation can never
//! leave a guess half-applied.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::{Board, CardView, Team};
use crate::collaborators::{
    AgentError, ClueRequest, DebateRequest, NullSink, ReportSink, TeamRoster,
};
use crate::config::GameConfig;
use crate::consensus::{build_consensus, ConsensusError, Proposal};
use crate::error::GameError;
use crate::resolver::GuessOutcome;
use crate::transcript::{AgentFailure, GameEvent, Transcript, TurnEndReason};
use crate::turn::{
    AbortReason, ForfeitReason, GameOutcome, TurnError, TurnPhase, TurnStateMachine, WinReason,
};

/// Everything known about a finished game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameReport {
    pub game_id: String,
    /// Seed the board was dealt from. Replaying with it reproduces the deal.
    pub seed: u64,
    pub outcome: GameOutcome,
    pub turns_played: u32,
    /// Operatives on each team's roster.
    pub red_operatives: usize,
    pub blue_operatives: usize,
    pub duration_ms: u64,
    pub transcript: Transcript,
    /// Spymaster view at the end of the game.
    pub final_board: Vec<CardView>,
}

impl GameReport {
    pub fn winner(&self) -> Option<Team> {
        self.outcome.winner()
    }

    pub fn ended_by_assassin(&self) -> bool {
        matches!(
            self.outcome,
            GameOutcome::Won {
                reason: WinReason::OpponentRevealedAssassin,
                ..
            }
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, GameOutcome::Aborted { .. })
    }
}

/// Await `fut` unless it outlives `timeout` or the game is cancelled.
async fn bounded<T, F>(cancel: &CancellationToken, timeout: Duration, fut: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        res = tokio::time::timeout(timeout, fut) => match res {
            Ok(inner) => inner,
            Err(_) => Err(AgentError::Timeout(timeout.as_millis() as u64)),
        },
    }
}

/// Plays one game between two rosters. Consumed by [`GameController::play`].
pub struct GameController {
    config: GameConfig,
    red: TeamRoster,
    blue: TeamRoster,
    sink: Box<dyn ReportSink>,
    cancel: CancellationToken,
    game_id: String,
    transcript: Transcript,
}

impl GameController {
    pub fn new(config: GameConfig, red: TeamRoster, blue: TeamRoster) -> Self {
        Self {
            config,
            red,
            blue,
            sink: Box::new(NullSink),
            cancel: CancellationToken::new(),
            game_id: Uuid::new_v4().to_string(),
            transcript: Transcript::new(),
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use an externally owned token, e.g. a child of a batch-wide one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Deal a board from `word_pool` and play it out.
    ///
    /// The seed is `random_seed` from the config, or fresh randomness
    /// recorded in the report.
    pub async fn play<S>(self, word_pool: &[S]) -> Result<GameReport, GameError>
    where
        S: AsRef<str> + Sync,
    {
        self.config.validate()?;
        let seed = self.config.random_seed.unwrap_or_else(rand::random);
        let starting_team = self.config.starting_team_for(seed);
        let board = Board::initialize(word_pool, starting_team, seed)?;
        self.play_board(board, seed).await
    }

    /// Play out an already dealt board.
    pub async fn play_board(mut self, mut board: Board, seed: u64) -> Result<GameReport, GameError> {
        self.config.validate()?;
        let started = Instant::now();
        let mut machine = TurnStateMachine::new(board.starting_team(), self.config.max_turns);

        info!(
            game_id = %self.game_id,
            seed,
            starting_team = %board.starting_team(),
            max_turns = self.config.max_turns,
            red_operatives = self.red.operatives.len(),
            blue_operatives = self.blue.operatives.len(),
            "Game started"
        );
        self.emit(GameEvent::GameStarted {
            game_id: self.game_id.clone(),
            seed,
            starting_team: board.starting_team(),
            max_turns: self.config.max_turns,
            red_operatives: self.red.operatives.len(),
            blue_operatives: self.blue.operatives.len(),
            board: board.spymaster_view(),
            timestamp: Utc::now(),
        });

        let mut turns_played = 0;
        let outcome = loop {
            if self.cancel.is_cancelled() {
                machine.abort(AbortReason::Cancelled);
            } else {
                turns_played += 1;
                self.play_turn(&mut board, &mut machine).await?;
                if !machine.is_game_over() {
                    match machine.handoff() {
                        Ok(_) => {}
                        Err(TurnError::MaxTurnsExceeded { max_turns }) => {
                            warn!(game_id = %self.game_id, max_turns, "Turn limit reached without a winner");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            }
            if let Some(outcome) = machine.outcome() {
                break outcome;
            }
        };

        info!(game_id = %self.game_id, outcome = %outcome, turns_played, "Game ended");
        self.emit(GameEvent::GameEnded {
            outcome,
            turns_played,
            timestamp: Utc::now(),
        });
        if let Err(e) = self.sink.flush() {
            warn!(game_id = %self.game_id, error = %e, "Failed to flush report sink");
        }

        Ok(GameReport {
            game_id: self.game_id.clone(),
            seed,
            outcome,
            turns_played,
            red_operatives: self.red.operatives.len(),
            blue_operatives: self.blue.operatives.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            transcript: std::mem::take(&mut self.transcript),
            final_board: board.spymaster_view(),
        })
    }

    fn roster(&self, team: Team) -> TeamRoster {
        match team {
            Team::Red => self.red.clone(),
            Team::Blue => self.blue.clone(),
        }
    }

    /// Append to the transcript and forward to the sink. Sink failures are
    /// logged only.
    fn emit(&mut self, event: GameEvent) {
        if let Err(e) = self.sink.record(&event) {
            warn!(
                game_id = %self.game_id,
                event = event.event_type(),
                error = %e,
                "Report sink rejected event"
            );
        }
        self.transcript.push(event);
    }

    fn end_turn_event(&mut self, board: &Board, machine: &TurnStateMachine, reason: TurnEndReason) {
        self.emit(GameEvent::TurnEnded {
            turn: machine.turn_number(),
            team: machine.team(),
            reason,
            guesses_used: machine.state().guesses_used,
            red_remaining: board.remaining(Team::Red),
            blue_remaining: board.remaining(Team::Blue),
            timestamp: Utc::now(),
        });
    }

    fn forfeit(
        &mut self,
        board: &Board,
        machine: &mut TurnStateMachine,
        reason: ForfeitReason,
    ) -> Result<(), GameError> {
        warn!(
            game_id = %self.game_id,
            team = %machine.team(),
            turn = machine.turn_number(),
            %reason,
            "Turn forfeited"
        );
        machine.forfeit_turn(reason)?;
        self.end_turn_event(board, machine, TurnEndReason::Forfeited { reason });
        Ok(())
    }

    async fn play_turn(
        &mut self,
        board: &mut Board,
        machine: &mut TurnStateMachine,
    ) -> Result<(), GameError> {
        let team = machine.team();
        let turn = machine.turn_number();
        let roster = self.roster(team);
        let timeout = self.config.per_agent_timeout();

        // Clue
        let request = ClueRequest {
            team,
            turn,
            board: board.spymaster_view(),
        };
        let clue = bounded(&self.cancel, timeout, roster.spymaster.give_clue(&request)).await;
        let clue = match clue {
            Ok(clue) => clue,
            Err(AgentError::Cancelled) => {
                machine.abort(AbortReason::Cancelled);
                return Ok(());
            }
            Err(e) => {
                warn!(game_id = %self.game_id, %team, turn, error = %e, "Clue source failed");
                return self.forfeit(board, machine, ForfeitReason::ClueUnavailable);
            }
        };
        let budget = machine.submit_clue(clue.clone())?;
        info!(game_id = %self.game_id, %team, turn, clue = %clue, %budget, "Clue given");
        self.emit(GameEvent::ClueGiven {
            turn,
            team,
            clue: clue.clone(),
            budget,
            timestamp: Utc::now(),
        });

        // Debate
        let mut rounds: Vec<Vec<Proposal>> = Vec::new();
        for round in 1..=self.config.debate_rounds {
            let request = DebateRequest {
                team,
                turn,
                round,
                clue: clue.clone(),
                board: board.operative_view(),
                previous_rounds: rounds.clone(),
            };
            let (proposals, failures) =
                run_debate(&self.cancel, timeout, &self.game_id, &roster, &request).await;
            if self.cancel.is_cancelled() {
                machine.abort(AbortReason::Cancelled);
                return Ok(());
            }
            self.emit(GameEvent::DebateRound {
                turn,
                team,
                round,
                proposals: proposals.clone(),
                failures,
                timestamp: Utc::now(),
            });
            rounds.push(proposals);
        }
        let final_round = rounds.pop().unwrap_or_default();

        // Consensus
        let consensus = match build_consensus(
            &final_round,
            |w| board.is_guessable(w),
            &self.config.consensus(),
        ) {
            Ok(result) => result,
            Err(ConsensusError::NoProposals) => {
                return self.forfeit(board, machine, ForfeitReason::NoProposals);
            }
        };
        let queue = consensus.queue();
        debug!(
            game_id = %self.game_id,
            %team,
            turn,
            agreed = ?consensus.agreed_words(),
            disputed = ?consensus.disputed_words(),
            "Consensus reached"
        );
        self.emit(GameEvent::ConsensusReached {
            turn,
            team,
            agreed: consensus.agreed.clone(),
            disputed: consensus.disputed.clone(),
            discarded: consensus.discarded.clone(),
            ordering: consensus.ordering,
            queue: queue.clone(),
            proposals_considered: consensus.proposals_considered,
            timestamp: Utc::now(),
        });

        // Guesses
        let mut end_reason = None;
        for word in &queue {
            let report = match machine.submit_guess(board, word) {
                Ok(report) => report,
                // Guard only: the queue was filtered against this board and
                // holds distinct words, so no entry can be unknown or revealed.
                Err(TurnError::Board(e)) => {
                    warn!(game_id = %self.game_id, %team, turn, word = %word, error = %e, "Guess rejected");
                    self.emit(GameEvent::GuessRejected {
                        turn,
                        team,
                        word: word.clone(),
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let outcome = report.resolution.outcome;
            info!(game_id = %self.game_id, %team, turn, word = %report.resolution.word, %outcome, "Guess resolved");
            self.emit(GameEvent::GuessResolved {
                turn,
                team,
                word: report.resolution.word.clone(),
                owner: report.resolution.owner,
                outcome,
                guesses_used: report.guesses_used,
                timestamp: Utc::now(),
            });

            match report.phase {
                TurnPhase::AwaitingGuess => {}
                TurnPhase::GameOver => {
                    end_reason = Some(TurnEndReason::GameOver);
                    break;
                }
                _ if outcome == GuessOutcome::CorrectOwnCard => {
                    end_reason = Some(TurnEndReason::BudgetExhausted);
                    break;
                }
                _ => {
                    end_reason = Some(TurnEndReason::WrongGuess);
                    break;
                }
            }
        }

        let reason = match end_reason {
            Some(reason) => reason,
            None if machine.state().guesses_used > 0 => {
                machine.end_turn()?;
                TurnEndReason::QueueExhausted
            }
            None => {
                return self.forfeit(board, machine, ForfeitReason::NothingToGuess);
            }
        };
        self.end_turn_event(board, machine, reason);
        Ok(())
    }
}

/// Ask every operative at once and wait for all of them, each bounded by
/// the per-agent timeout. Agents that time out or fail are left out of
/// the returned proposals and listed as failures.
async fn run_debate(
    cancel: &CancellationToken,
    timeout: Duration,
    game_id: &str,
    roster: &TeamRoster,
    request: &DebateRequest,
) -> (Vec<Proposal>, Vec<AgentFailure>) {
    let calls = roster.operatives.iter().map(|operative| {
        let operative = Arc::clone(operative);
        async move {
            let result = bounded(cancel, timeout, operative.propose(request)).await;
            (operative.id().to_string(), result)
        }
    });

    let mut proposals = Vec::new();
    let mut failures = Vec::new();
    for (agent_id, result) in join_all(calls).await {
        match result {
            Ok(mut proposal) => {
                proposal.agent_id = agent_id;
                proposals.push(proposal);
            }
            Err(e) => {
                warn!(
                    %game_id,
                    team = %request.team,
                    turn = request.turn,
                    round = request.round,
                    agent = %agent_id,
                    error = %e,
                    "Operative did not contribute"
                );
                failures.push(AgentFailure {
                    agent_id,
                    timed_out: matches!(e, AgentError::Timeout(_)),
                    reason: e.to_string(),
                });
            }
        }
    }
    (proposals, failures)
}
