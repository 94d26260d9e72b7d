//! Runtime error types.
//!
//! A corrupt ledger is not an error value: it is logged and healed by
//! the store. Only I/O failures and engine rejections reach callers.

use std::io;
use std::path::PathBuf;

use punch_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed. Never retried locally.
    #[error("ledger storage unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ledger encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("punchcard lock poisoned")]
    LockPoisoned,
}

impl RuntimeError {
    /// True for rejections the user should see as "amount must be positive".
    pub fn is_invalid_amount(&self) -> bool {
        matches!(self, RuntimeError::Engine(EngineError::InvalidAmount { .. }))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
