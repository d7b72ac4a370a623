//! Consensus engine: reduces ranked operative proposals to one guess queue.
//!
//! Borda-style weighted voting with confidence scaling:
//!
//! 1. A word at rank `i` in a list of length `L` scores `L - i`, multiplied by
//!    the proposal's confidence (1.0 when absent).
//! 2. Scores are summed per word across proposals.
//! 3. Agreement ratio = proposals listing the word / proposals received.
//! 4. Words whose ratio is strictly above the majority threshold are
//!    *agreed*; the rest are *disputed*. A word only one proposal lists is
//!    always disputed unless there is a single proposal. With
//!    `max_rank_spread` set, a word some proposal ranks below that index is
//!    disputed too.
//! 5. Each group is ordered by score (desc), mean rank (asc), then word.
//! 6. Words that are unknown or already revealed are dropped last, which
//!    never reorders what remains.
//!
//! The reducer is a pure function of its inputs: proposals, a validity
//! predicate, and a [`ConsensusConfig`].

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::normalize_word;

/// Confidence used when a proposal doesn't state one.
pub const DEFAULT_CONFIDENCE: f64 = 1.0;

/// One operative's ranked guess list for the current clue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub agent_id: String,
    /// Most preferred first.
    pub words: Vec<String>,
    /// Scalar in [0, 1].
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Free-text reasoning, carried for reporting only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

impl Proposal {
    pub fn new<I, S>(agent_id: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            agent_id: agent_id.into(),
            words: words.into_iter().map(Into::into).collect(),
            confidence: None,
            rationale: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Confidence clamped to [0, 1]; non-finite values fall back to the default.
    pub fn effective_confidence(&self) -> f64 {
        match self.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => DEFAULT_CONFIDENCE,
        }
    }

    /// Normalised words with duplicates removed, first occurrence kept.
    pub fn ranked_words(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.words.len());
        for raw in &self.words {
            let word = normalize_word(raw);
            if !word.is_empty() && !out.contains(&word) {
                out.push(word);
            }
        }
        out
    }
}

/// How the agreed and disputed groups become a single queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// All agreed words, then all disputed words.
    #[default]
    AgreedFirst,
    /// One list ordered by score, ignoring the split.
    ScoreOnly,
    /// Disputed words are never attempted.
    AgreedOnly,
}

impl std::fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AgreedFirst => write!(f, "agreed_first"),
            Self::ScoreOnly => write!(f, "score_only"),
            Self::AgreedOnly => write!(f, "agreed_only"),
        }
    }
}

impl std::str::FromStr for OrderingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "agreed_first" => Ok(Self::AgreedFirst),
            "score_only" => Ok(Self::ScoreOnly),
            "agreed_only" => Ok(Self::AgreedOnly),
            other => Err(format!(
                "unknown ordering '{}' (expected agreed_first, score_only or agreed_only)",
                other
            )),
        }
    }
}

/// Consensus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// A word is agreed when its agreement ratio is strictly above this.
    pub majority_threshold: f64,
    /// A word some proposal ranks deeper than this index is disputed.
    pub max_rank_spread: Option<usize>,
    pub ordering: OrderingPolicy,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            majority_threshold: 0.5,
            max_rank_spread: None,
            ordering: OrderingPolicy::AgreedFirst,
        }
    }
}

/// A word with its aggregate priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredWord {
    pub word: String,
    /// Confidence-weighted Borda score.
    pub score: f64,
    /// Proposals listing the word / proposals considered.
    pub agreement: f64,
    /// Proposals listing the word.
    pub mentions: usize,
    /// Average rank index among proposals listing the word.
    pub mean_rank: f64,
}

fn priority_order(a: &ScoredWord, b: &ScoredWord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.mean_rank.total_cmp(&b.mean_rank))
        .then_with(|| a.word.cmp(&b.word))
}

/// Output of one consensus pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusResult {
    pub agreed: Vec<ScoredWord>,
    pub disputed: Vec<ScoredWord>,
    /// Words dropped because they were unknown or already revealed.
    pub discarded: Vec<String>,
    /// K, the number of proposals actually received.
    pub proposals_considered: usize,
    pub ordering: OrderingPolicy,
}

impl ConsensusResult {
    /// Guess queue under the configured ordering policy.
    pub fn queue(&self) -> Vec<String> {
        match self.ordering {
            OrderingPolicy::AgreedFirst => self
                .agreed
                .iter()
                .chain(self.disputed.iter())
                .map(|w| w.word.clone())
                .collect(),
            OrderingPolicy::AgreedOnly => self.agreed.iter().map(|w| w.word.clone()).collect(),
            OrderingPolicy::ScoreOnly => {
                let mut all: Vec<&ScoredWord> =
                    self.agreed.iter().chain(self.disputed.iter()).collect();
                all.sort_by(|a, b| priority_order(a, b));
                all.into_iter().map(|w| w.word.clone()).collect()
            }
        }
    }

    pub fn agreed_words(&self) -> Vec<&str> {
        self.agreed.iter().map(|w| w.word.as_str()).collect()
    }

    pub fn disputed_words(&self) -> Vec<&str> {
        self.disputed.iter().map(|w| w.word.as_str()).collect()
    }

    /// Scoring details for a word, agreed or disputed.
    pub fn get(&self, word: &str) -> Option<&ScoredWord> {
        let needle = normalize_word(word);
        self.agreed
            .iter()
            .chain(self.disputed.iter())
            .find(|w| w.word == needle)
    }

    pub fn is_empty(&self) -> bool {
        self.agreed.is_empty() && self.disputed.is_empty()
    }
}

/// Errors raised by the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("no proposals were received for this debate round")]
    NoProposals,
}

#[derive(Default)]
struct Tally {
    score: f64,
    mentions: usize,
    rank_sum: usize,
    worst_rank: usize,
}

/// Reduce `proposals` to an ordered [`ConsensusResult`].
///
/// `is_guessable` decides which words survive the final filter; pass the
/// board's unrevealed-word check.
pub fn build_consensus<F>(
    proposals: &[Proposal],
    is_guessable: F,
    config: &ConsensusConfig,
) -> Result<ConsensusResult, ConsensusError>
where
    F: Fn(&str) -> bool,
{
    if proposals.is_empty() {
        return Err(ConsensusError::NoProposals);
    }
    let k = proposals.len();

    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for proposal in proposals {
        let words = proposal.ranked_words();
        let weight = proposal.effective_confidence();
        let len = words.len();

        for (rank, word) in words.into_iter().enumerate() {
            let tally = tallies.entry(word).or_default();
            tally.worst_rank = tally.worst_rank.max(rank);
            tally.score += (len - rank) as f64 * weight;
            tally.mentions += 1;
            tally.rank_sum += rank;
        }
    }

    let mut agreed = Vec::new();
    let mut disputed = Vec::new();
    for (word, tally) in tallies {
        let agreement = tally.mentions as f64 / k as f64;
        let lone_voice = tally.mentions == 1 && k > 1;
        // Spread is measured from the top of the list, so a listing at rank 0
        // can never widen it.
        let spread_too_wide = config
            .max_rank_spread
            .is_some_and(|limit| tally.worst_rank > limit);

        let scored = ScoredWord {
            word,
            score: tally.score,
            agreement,
            mentions: tally.mentions,
            mean_rank: tally.rank_sum as f64 / tally.mentions as f64,
        };

        if agreement > config.majority_threshold && !lone_voice && !spread_too_wide {
            agreed.push(scored);
        } else {
            disputed.push(scored);
        }
    }

    agreed.sort_by(priority_order);
    disputed.sort_by(priority_order);

    let mut discarded = Vec::new();
    let mut keep = |w: &ScoredWord| {
        let ok = is_guessable(&w.word);
        if !ok {
            discarded.push(w.word.clone());
        }
        ok
    };
    agreed.retain(&mut keep);
    disputed.retain(&mut keep);

    debug!(
        proposals = k,
        agreed = agreed.len(),
        disputed = disputed.len(),
        discarded = discarded.len(),
        "Consensus computed"
    );

    Ok(ConsensusResult {
        agreed,
        disputed,
        discarded,
        proposals_considered: k,
        ordering: config.ordering,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_word(_: &str) -> bool {
        true
    }

    #[test]
    fn test_ordering_policy_parses_display_form() {
        for policy in [
            OrderingPolicy::AgreedFirst,
            OrderingPolicy::ScoreOnly,
            OrderingPolicy::AgreedOnly,
        ] {
            assert_eq!(policy.to_string().parse::<OrderingPolicy>(), Ok(policy));
        }
        assert_eq!("Score-Only".parse::<OrderingPolicy>(), Ok(OrderingPolicy::ScoreOnly));
        assert!("loudest".parse::<OrderingPolicy>().is_err());
    }

    fn run(proposals: &[Proposal]) -> ConsensusResult {
        build_consensus(proposals, any_word, &ConsensusConfig::default()).unwrap()
    }

    #[test]
    fn test_no_proposals() {
        let err = build_consensus(&[], any_word, &ConsensusConfig::default()).unwrap_err();
        assert_eq!(err, ConsensusError::NoProposals);
    }

    #[test]
    fn test_all_empty_proposals_give_empty_queue() {
        let result = run(&[
            Proposal::new("a", Vec::<String>::new()),
            Proposal::new("b", Vec::<String>::new()),
        ]);
        assert!(result.is_empty());
        assert!(result.queue().is_empty());
        assert_eq!(result.proposals_considered, 2);
    }

    #[test]
    fn test_shared_top_word_agreed_and_others_disputed() {
        let result = run(&[
            Proposal::new("a", ["spy", "telescope"]).with_confidence(1.0),
            Proposal::new("b", ["spy", "microscope"]).with_confidence(1.0),
        ]);

        assert_eq!(result.agreed_words(), vec!["spy"]);
        let spy = result.get("spy").unwrap();
        assert!((spy.agreement - 1.0).abs() < f64::EPSILON);
        assert!((spy.score - 4.0).abs() < f64::EPSILON);

        assert_eq!(result.disputed_words(), vec!["microscope", "telescope"]);
        assert!((result.get("telescope").unwrap().agreement - 0.5).abs() < f64::EPSILON);
        assert_eq!(result.queue(), vec!["spy", "microscope", "telescope"]);
    }

    #[test]
    fn test_single_proposal_everything_agreed() {
        let result = run(&[Proposal::new("solo", ["a", "b", "c"])]);
        assert_eq!(result.agreed_words(), vec!["a", "b", "c"]);
        assert!(result.disputed.is_empty());
    }

    #[test]
    fn test_lone_voice_disputed_even_with_low_threshold() {
        let config = ConsensusConfig {
            majority_threshold: 0.2,
            ..Default::default()
        };
        let result = build_consensus(
            &[
                Proposal::new("a", ["alpha"]),
                Proposal::new("b", ["beta"]),
                Proposal::new("c", ["beta"]),
            ],
            any_word,
            &config,
        )
        .unwrap();
        assert_eq!(result.agreed_words(), vec!["beta"]);
        assert_eq!(result.disputed_words(), vec!["alpha"]);
    }

    #[test]
    fn test_confidence_scales_scores() {
        let result = run(&[
            Proposal::new("a", ["x", "y"]).with_confidence(0.25),
            Proposal::new("b", ["y", "x"]).with_confidence(1.0),
        ]);
        // x: 2*0.25 + 1*1.0 = 1.5, y: 1*0.25 + 2*1.0 = 2.25
        assert_eq!(result.agreed_words(), vec!["y", "x"]);
        assert!((result.get("x").unwrap().score - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_clamped() {
        let high = Proposal::new("a", ["x"]).with_confidence(7.0);
        assert!((high.effective_confidence() - 1.0).abs() < f64::EPSILON);
        let low = Proposal::new("a", ["x"]).with_confidence(-1.0);
        assert!(low.effective_confidence().abs() < f64::EPSILON);
        let nan = Proposal::new("a", ["x"]).with_confidence(f64::NAN);
        assert!((nan.effective_confidence() - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_tie_falls_back_to_word() {
        let result = run(&[
            Proposal::new("a", ["p", "z", "q"]),
            Proposal::new("b", ["q", "z", "p"]),
            Proposal::new("c", ["z"]),
        ]);
        // z = 5; p and q both score 4 with mean rank 1.0.
        assert_eq!(result.agreed_words(), vec!["z", "p", "q"]);

        let result = run(&[Proposal::new("a", ["m", "n"]), Proposal::new("b", ["n", "k", "m"])]);
        // n = 4, m = 3, k is a lone voice.
        assert_eq!(result.agreed_words(), vec!["n", "m"]);
        assert_eq!(result.disputed_words(), vec!["k"]);
    }

    #[test]
    fn test_mean_rank_breaks_score_tie() {
        let result = run(&[
            Proposal::new("p1", ["a", "f1", "f2", "f3"]),
            Proposal::new("p2", ["b", "a"]),
            Proposal::new("p3", ["b", "g1", "g2"]),
        ]);
        // a = 4 + 1 (mean rank 0.5), b = 2 + 3 (mean rank 0.0).
        let a = result.get("a").unwrap();
        let b = result.get("b").unwrap();
        assert!((a.score - b.score).abs() < f64::EPSILON);
        assert_eq!(result.agreed_words(), vec!["b", "a"]);
    }

    #[test]
    fn test_duplicates_within_proposal_keep_first() {
        let result = run(&[Proposal::new("a", ["Apple", "pear", "apple", " PEAR "])]);
        let apple = result.get("apple").unwrap();
        assert!((apple.score - 2.0).abs() < f64::EPSILON);
        assert_eq!(apple.mentions, 1);
        assert_eq!(result.queue(), vec!["apple", "pear"]);
    }

    #[test]
    fn test_filter_preserves_order_and_reports_discards() {
        let result = build_consensus(
            &[
                Proposal::new("a", ["one", "two", "three", "four"]),
                Proposal::new("b", ["one", "two", "three", "four"]),
            ],
            |w| w != "two",
            &ConsensusConfig::default(),
        )
        .unwrap();
        assert_eq!(result.queue(), vec!["one", "three", "four"]);
        assert_eq!(result.discarded, vec!["two"]);
    }

    #[test]
    fn test_rank_spread_marks_disputed() {
        let config = ConsensusConfig {
            max_rank_spread: Some(2),
            ..Default::default()
        };
        let result = build_consensus(
            &[
                Proposal::new("a", ["far", "b", "c", "d"]),
                Proposal::new("b", ["b", "c", "d", "far"]),
            ],
            any_word,
            &config,
        )
        .unwrap();
        assert!(result.disputed_words().contains(&"far"));
        assert!(!result.agreed_words().contains(&"far"));
    }

    #[test]
    fn test_ordering_policies() {
        let proposals = [
            Proposal::new("a", ["shared", "solo_a", "x", "y", "z"]),
            Proposal::new("b", ["late"]),
            Proposal::new("c", ["late", "shared"]),
        ];
        // shared: 5 + 1 = 6 agreed (2/3); late: 1 + 2 = 3 agreed; solo_a: 4 disputed.
        let mut config = ConsensusConfig::default();
        let first = build_consensus(&proposals, any_word, &config).unwrap();
        assert_eq!(&first.queue()[..3], &["shared", "late", "solo_a"]);

        config.ordering = OrderingPolicy::ScoreOnly;
        let by_score = build_consensus(&proposals, any_word, &config).unwrap();
        assert_eq!(&by_score.queue()[..3], &["shared", "solo_a", "late"]);

        config.ordering = OrderingPolicy::AgreedOnly;
        let only = build_consensus(&proposals, any_word, &config).unwrap();
        assert_eq!(only.queue(), vec!["shared", "late"]);
    }

    #[test]
    fn test_unanimous_top_word_always_first() {
        for k in 1..8 {
            let proposals: Vec<Proposal> = (0..k)
                .map(|i| {
                    let mut words = vec!["target".to_string()];
                    words.extend((0..(i % 4)).map(|j| format!("filler{}_{}", i, j)));
                    Proposal::new(format!("agent{}", i), words)
                        .with_confidence(0.5 + 0.05 * i as f64)
                })
                .collect();
            let result = run(&proposals);
            let top = result.get("target").unwrap();
            assert!((top.agreement - 1.0).abs() < f64::EPSILON);
            assert_eq!(result.queue()[0], "target");
        }
    }

    #[test]
    fn test_reinforcing_proposal_never_lowers_position() {
        let base = vec![
            Proposal::new("a", ["alpha", "beta", "gamma"]),
            Proposal::new("b", ["beta", "alpha", "delta"]),
            Proposal::new("c", ["gamma", "beta"]),
        ];
        let before = run(&base).queue();
        let pos_before = before.iter().position(|w| w == "alpha").unwrap();

        let mut reinforced = base.clone();
        reinforced.push(Proposal::new("d", ["alpha"]));
        let after = run(&reinforced).queue();
        let pos_after = after.iter().position(|w| w == "alpha").unwrap();

        assert!(pos_after <= pos_before);
    }

    fn queue_position(proposals: &[Proposal], config: &ConsensusConfig, word: &str) -> Option<usize> {
        build_consensus(proposals, any_word, config)
            .unwrap()
            .queue()
            .iter()
            .position(|w| w == word)
    }

    #[test]
    fn test_rank_zero_listing_does_not_widen_spread() {
        let config = ConsensusConfig {
            max_rank_spread: Some(0),
            ..Default::default()
        };
        let base = vec![
            Proposal::new("a", ["x", "alpha"]),
            Proposal::new("b", ["x", "alpha"]),
            Proposal::new("c", ["d", "e", "f", "g"]),
        ];
        let before = queue_position(&base, &config, "alpha").unwrap();

        let mut reinforced = base.clone();
        reinforced.push(Proposal::new("d", ["alpha"]));
        let after = queue_position(&reinforced, &config, "alpha").unwrap();
        assert!(after <= before, "alpha moved from {} to {}", before, after);
    }

    #[test]
    fn test_reinforcing_top_rank_is_monotone_across_configs() {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::{Rng, SeedableRng};

        let vocab: Vec<String> = (0..8).map(|i| format!("w{}", i)).collect();
        let spreads = [None, Some(0), Some(1), Some(3)];
        let orderings = [
            OrderingPolicy::AgreedFirst,
            OrderingPolicy::ScoreOnly,
            OrderingPolicy::AgreedOnly,
        ];

        for seed in 0..150u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let k = rng.gen_range(1..=5);
            let base: Vec<Proposal> = (0..k)
                .map(|i| {
                    let mut words = vocab.clone();
                    words.shuffle(&mut rng);
                    words.truncate(rng.gen_range(1..=5));
                    Proposal::new(format!("p{}", i), words)
                        .with_confidence(rng.gen_range(0.1..=1.0))
                })
                .collect();

            for max_rank_spread in spreads {
                for ordering in orderings {
                    let config = ConsensusConfig {
                        max_rank_spread,
                        ordering,
                        ..Default::default()
                    };
                    let queue = build_consensus(&base, any_word, &config).unwrap().queue();
                    for (before, word) in queue.iter().enumerate() {
                        let mut reinforced = base.clone();
                        reinforced.push(
                            Proposal::new("extra", [word.as_str(), "fresh1", "fresh2"])
                                .with_confidence(rng.gen_range(0.1..=1.0)),
                        );
                        let after = queue_position(&reinforced, &config, word)
                            .unwrap_or(usize::MAX);
                        assert!(
                            after <= before,
                            "seed {} {:?} {}: {} moved from {} to {}",
                            seed,
                            max_rank_spread,
                            ordering,
                            word,
                            before,
                            after
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&OrderingPolicy::AgreedOnly).unwrap();
        assert_eq!(json, "\"agreed_only\"");
        assert_eq!(OrderingPolicy::default(), OrderingPolicy::AgreedFirst);
    }
}
