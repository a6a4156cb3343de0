//! Error type surfaced by the runtime API.
//!
//! Wraps rules failures and the I/O and encoding failures of configuration
//! loading and snapshot storage.
use thiserror::Error;

use idle_core::RulesError;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("snapshot `{0}` does not exist")]
    SnapshotNotFound(String),

    #[error("tick length must be a positive number of seconds, got {0}")]
    InvalidTick(f64),
}
