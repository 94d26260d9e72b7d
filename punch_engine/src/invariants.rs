//! PunchEngine — Invariant Checks
//!
//! Non-negativity is carried by the u64 counter types. The only
//! remaining rule is the punch range, which every rollover must
//! re-establish before its result leaves the engine.

use crate::domain::UserRecord;
use crate::error::EngineError;

/// Validate a record produced by a rollover.
pub fn try_validate_record(
    record: &UserRecord,
    punches_per_reward: u64,
) -> Result<(), EngineError> {
    check_punch_range(record, punches_per_reward)
}

/// INV-1: punches stay strictly below the reward threshold.
fn check_punch_range(record: &UserRecord, punches_per_reward: u64) -> Result<(), EngineError> {
    if record.punches >= punches_per_reward {
        return Err(EngineError::InvariantViolation {
            rule: "punch_range",
            detail: format!(
                "punches={} must be below punches_per_reward={}",
                record.punches, punches_per_reward
            ),
        });
    }
    Ok(())
}
