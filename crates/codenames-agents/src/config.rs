//! Runner configuration: TOML file, then environment, then CLI flags.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use codenames_engine::{GameConfig, Team};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_MAX_TURNS: &str = "CODENAMES_MAX_TURNS";
pub const ENV_SEED: &str = "CODENAMES_SEED";
pub const ENV_MAJORITY_THRESHOLD: &str = "CODENAMES_MAJORITY_THRESHOLD";
pub const ENV_AGENT_TIMEOUT_MS: &str = "CODENAMES_AGENT_TIMEOUT_MS";
pub const ENV_LOG_DIR: &str = "CODENAMES_LOG_DIR";
pub const ENV_RED_OPERATIVES: &str = "CODENAMES_RED_OPERATIVES";
pub const ENV_BLUE_OPERATIVES: &str = "CODENAMES_BLUE_OPERATIVES";

/// Errors building an [`AgentsConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a simulated game or batch needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentsConfig {
    pub game: GameConfig,
    /// Operatives debating on each team; the two may differ.
    pub red_operatives: usize,
    pub blue_operatives: usize,
    /// Chance a red operative recognises each intended target.
    pub red_skill: f64,
    pub blue_skill: f64,
    /// Largest number a simulated spymaster will attach to a clue.
    pub max_clue_number: u32,
    /// Artificial delay before each proposal, in milliseconds.
    pub latency_ms: u64,
    /// Where JSONL transcripts and Markdown reports go. `None` disables both.
    pub log_dir: Option<PathBuf>,
    /// Newline-delimited word list; built-in pool when absent.
    pub word_list: Option<PathBuf>,
    pub batch_games: u32,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            red_operatives: 3,
            blue_operatives: 3,
            red_skill: 0.8,
            blue_skill: 0.8,
            max_clue_number: 2,
            latency_ms: 0,
            log_dir: Some(PathBuf::from("logs")),
            word_list: None,
            batch_games: 10,
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { key, value })
}

impl AgentsConfig {
    pub fn operatives(&self, team: Team) -> usize {
        match team {
            Team::Red => self.red_operatives,
            Team::Blue => self.blue_operatives,
        }
    }

    pub fn skill(&self, team: Team) -> f64 {
        match team {
            Team::Red => self.red_skill,
            Team::Blue => self.blue_skill,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File (or defaults), then process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CODENAMES_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_TURNS) {
            self.game.max_turns = parse_env(ENV_MAX_TURNS, value)?;
        }
        if let Some(value) = lookup(ENV_SEED) {
            self.game.random_seed = Some(parse_env(ENV_SEED, value)?);
        }
        if let Some(value) = lookup(ENV_MAJORITY_THRESHOLD) {
            self.game.majority_threshold = parse_env(ENV_MAJORITY_THRESHOLD, value)?;
        }
        if let Some(value) = lookup(ENV_AGENT_TIMEOUT_MS) {
            self.game.per_agent_timeout_ms = parse_env(ENV_AGENT_TIMEOUT_MS, value)?;
        }
        if let Some(value) = lookup(ENV_RED_OPERATIVES) {
            self.red_operatives = parse_env(ENV_RED_OPERATIVES, value)?;
        }
        if let Some(value) = lookup(ENV_BLUE_OPERATIVES) {
            self.blue_operatives = parse_env(ENV_BLUE_OPERATIVES, value)?;
        }
        if let Some(value) = lookup(ENV_LOG_DIR) {
            let value = value.trim();
            self.log_dir = if value.is_empty() {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.game
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        for (name, count) in [
            ("red_operatives", self.red_operatives),
            ("blue_operatives", self.blue_operatives),
        ] {
            if count == 0 {
                return Err(ConfigError::Invalid(format!("{} must be at least 1", name)));
            }
        }
        for (name, skill) in [("red_skill", self.red_skill), ("blue_skill", self.blue_skill)] {
            if !(0.0..=1.0).contains(&skill) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in [0, 1], got {}",
                    name, skill
                )));
            }
        }
        if self.max_clue_number == 0 {
            return Err(ConfigError::Invalid(
                "max_clue_number must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_validate() {
        let config = AgentsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.red_operatives, 3);
        assert_eq!(config.blue_operatives, 3);
        assert_eq!(config.game.max_turns, 20);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
red_operatives = 5
blue_operatives = 2
red_skill = 0.4

[game]
max_turns = 12
ordering = "score_only"
random_seed = 99
"#
        )
        .unwrap();

        let config = AgentsConfig::from_file(file.path()).unwrap();
        assert_eq!(config.red_operatives, 5);
        assert_eq!(config.blue_operatives, 2);
        assert_eq!(config.red_skill, 0.4);
        assert_eq!(config.blue_skill, 0.8);
        assert_eq!(config.game.max_turns, 12);
        assert_eq!(config.game.random_seed, Some(99));
        assert_eq!(
            config.game.ordering,
            codenames_engine::OrderingPolicy::ScoreOnly
        );
        assert_eq!(config.game.majority_threshold, 0.5);
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "red_operatives = \"many\"").unwrap();
        let err = AgentsConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AgentsConfig::default();
        config
            .apply_env(env(&[
                (ENV_MAX_TURNS, "8"),
                (ENV_SEED, "42"),
                (ENV_MAJORITY_THRESHOLD, "0.6"),
                (ENV_AGENT_TIMEOUT_MS, "250"),
                (ENV_LOG_DIR, "/tmp/codenames"),
                (ENV_RED_OPERATIVES, "2"),
                (ENV_BLUE_OPERATIVES, "4"),
            ]))
            .unwrap();
        assert_eq!(config.red_operatives, 2);
        assert_eq!(config.blue_operatives, 4);
        assert_eq!(config.game.max_turns, 8);
        assert_eq!(config.game.random_seed, Some(42));
        assert_eq!(config.game.majority_threshold, 0.6);
        assert_eq!(config.game.per_agent_timeout_ms, 250);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/codenames")));
    }

    #[test]
    fn test_empty_log_dir_disables_logging() {
        let mut config = AgentsConfig::default();
        config.apply_env(env(&[(ENV_LOG_DIR, "")])).unwrap();
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn test_bad_env_value_names_the_key() {
        let mut config = AgentsConfig::default();
        let err = config
            .apply_env(env(&[(ENV_MAX_TURNS, "twenty")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { key: ENV_MAX_TURNS, .. }));
        assert!(err.to_string().contains("CODENAMES_MAX_TURNS"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = AgentsConfig {
            blue_operatives: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("blue_operatives"));
        let config = AgentsConfig {
            blue_skill: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let mut config = AgentsConfig::default();
        config.game.majority_threshold = 1.0;
        assert!(config.validate().is_err());
    }
}
