//! Error type shared by the session API.

use thiserror::Error;

/// Errors surfaced to the caller of the session API.
///
/// Invalid agent actions are not errors: they are reported through the step result.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Simulation with identifier: {0} not found!")]
    SessionNotFound(String),

    #[error("Invalid value for config option {key}: {value}")]
    InvalidConfig { key: String, value: String },

    #[error("Can't parse jobs: {0}")]
    InvalidJobs(#[from] serde_json::Error),

    #[error("Can't load config from {path}: {message}")]
    ConfigFile { path: String, message: String },

    #[error("Simulation {0} not reset! Please call reset() first")]
    NotReset(String),

    #[error("Episode of simulation {0} is over, reset it to start a new one")]
    EpisodeOver(String),

    #[error("Simulation clock stalled at {clock} before reaching {target}")]
    ClockStalled { target: f64, clock: f64 },
}

pub type Result<T> = std::result::Result<T, Error>;
