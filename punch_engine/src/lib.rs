#![forbid(unsafe_code)]

//! Punchcard engine — pure reward accounting.
//!
//! Holds the ledger data model, the punch → free-order rollover rules,
//! record invariants, link detection and canonical ledger hashing.
//! Nothing in this crate performs I/O.

pub mod arithmetic;
pub mod detection;
pub mod domain;
pub mod error;
pub mod hashing;
pub mod invariants;
pub mod rewards;

pub use detection::LinkDetector;
pub use domain::{AdjustOutcome, FieldUpdates, Ledger, PunchOutcome, UserRecord};
pub use error::EngineError;
pub use rewards::{RewardEngine, DEFAULT_PUNCHES_PER_REWARD};
