//! Simulated Codenames players and the harness that runs them.
//!
//! - [`agents`]: seeded spymaster and operative implementations
//! - [`config`]: TOML file plus `CODENAMES_*` environment overrides
//! - [`report`]: JSONL event stream and Markdown game summary
//! - [`runner`] / [`batch`]: one game, or many in parallel

pub mod agents;
pub mod batch;
pub mod config;
pub mod report;
pub mod runner;
pub mod words;

pub use batch::{run_batch, BatchResult, BatchSummary};
pub use config::{AgentsConfig, ConfigError};
pub use runner::{run_game, RunError};
