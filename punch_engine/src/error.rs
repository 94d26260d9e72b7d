//! Engine error taxonomy.

use thiserror::Error;

/// Every way a reward computation can be rejected.
///
/// A rejected computation never produces a partial record; callers keep
/// the record they passed in.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Non-positive amount passed to a mutating operation.
    #[error("amount must be positive, got {amount}")]
    InvalidAmount { amount: i64 },

    #[error("counter overflow: {a} + {b} overflows u64")]
    Overflow { a: u64, b: u64 },

    #[error("invariant violation: [{rule}] {detail}")]
    InvariantViolation { rule: &'static str, detail: String },

    #[error("punches per reward must be at least 1")]
    InvalidThreshold,
}
