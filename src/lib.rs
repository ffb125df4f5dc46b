pub mod types;
pub mod score;
pub mod error;
pub mod config;
pub mod decider;
pub mod bracket;
pub mod builder;
pub mod reconcile;
pub mod schedule;
pub mod ranking;
pub mod generator;

pub use bracket::{Bracket, DeciderId, NodeId};
pub use config::SchedulerConfig;
pub use error::{Result, TournamentError};
pub use generator::{EliminationGenerator, PairingGenerator};
pub use score::{Score, ScoreError};
pub use types::{
    BracketOptions, GeneratorState, Pairing, PairingEntry, Ranking, Round, Team, TeamId,
};

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

// ── Logging ────────────────────────────────────────────────────────────

/// Installs the global subscriber. `RUST_LOG` wins over the configured
/// filter. With a log directory, output goes to a daily rolling file and
/// the returned guard must be held until exit so buffered lines are flushed.
pub fn init_tracing(config: &SchedulerConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(logs_dir) = &config.log_dir else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    fs::create_dir_all(logs_dir)?;
    let file_appender = tracing_appender::rolling::daily(logs_dir, "bracket.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}
