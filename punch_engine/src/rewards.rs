//! PunchEngine — Reward Rules
//!
//! ALL counter mutation logic lives here.
//! Pure functions over `UserRecord`; the input record is never mutated.
//! Amounts are validated before any arithmetic runs.

use crate::arithmetic::{checked_add, validate_amount, validate_delta};
use crate::domain::{AdjustOutcome, PunchOutcome, UserRecord};
use crate::error::EngineError;
use crate::invariants::try_validate_record;

/// Punches needed for one free order unless configured otherwise.
pub const DEFAULT_PUNCHES_PER_REWARD: u64 = 5;

/// Reward accounting parameterised by the punch threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardEngine {
    punches_per_reward: u64,
}

impl Default for RewardEngine {
    fn default() -> Self {
        Self {
            punches_per_reward: DEFAULT_PUNCHES_PER_REWARD,
        }
    }
}

impl RewardEngine {
    pub fn new(punches_per_reward: u64) -> Result<Self, EngineError> {
        if punches_per_reward == 0 {
            return Err(EngineError::InvalidThreshold);
        }
        Ok(Self { punches_per_reward })
    }

    pub fn punches_per_reward(&self) -> u64 {
        self.punches_per_reward
    }

    /// Punches still needed before the next free order.
    pub fn punches_remaining(&self, record: &UserRecord) -> u64 {
        self.punches_per_reward.saturating_sub(record.punches)
    }

    /// Administrative grant of `amount` punches.
    ///
    /// Crossing several thresholds in one call grants one free order per
    /// threshold: `rewards = (punches + amount) / T`.
    pub fn add_punches(
        &self,
        record: &UserRecord,
        amount: i64,
    ) -> Result<PunchOutcome, EngineError> {
        let amount = validate_amount(amount)?;
        self.roll_over(record, amount)
    }

    /// One punch from a detected tracked link.
    pub fn add_single_punch(&self, record: &UserRecord) -> Result<PunchOutcome, EngineError> {
        self.roll_over(record, 1)
    }

    /// Fold an out-of-range punch count (left by a lowered threshold)
    /// into free orders. In-range records come back unchanged.
    pub fn normalize(&self, record: &UserRecord) -> Result<PunchOutcome, EngineError> {
        self.roll_over(record, 0)
    }

    /// Remove punches, flooring at zero. Free orders are never borrowed.
    ///
    /// The record is normalized first, so the result is always in range.
    pub fn remove_punches(
        &self,
        record: &UserRecord,
        amount: i64,
    ) -> Result<UserRecord, EngineError> {
        let amount = validate_amount(amount)?;
        let base = self.normalize(record)?.record;
        let next = UserRecord {
            punches: base.punches.saturating_sub(amount),
            ..base
        };
        try_validate_record(&next, self.punches_per_reward)?;
        Ok(next)
    }

    /// Add (`delta > 0`) or remove (`delta < 0`) free orders.
    pub fn adjust_free_orders(
        &self,
        record: &UserRecord,
        delta: i64,
    ) -> Result<AdjustOutcome, EngineError> {
        let (value, requested, applied) = adjust_counter(record.free_orders, delta)?;
        Ok(AdjustOutcome {
            record: UserRecord {
                free_orders: value,
                ..*record
            },
            requested,
            applied,
            previous: record.free_orders,
        })
    }

    /// Add (`delta > 0`) or remove (`delta < 0`) referrals.
    pub fn adjust_referrals(
        &self,
        record: &UserRecord,
        delta: i64,
    ) -> Result<AdjustOutcome, EngineError> {
        let (value, requested, applied) = adjust_counter(record.referrals, delta)?;
        Ok(AdjustOutcome {
            record: UserRecord {
                referrals: value,
                ..*record
            },
            requested,
            applied,
            previous: record.referrals,
        })
    }

    fn roll_over(&self, record: &UserRecord, amount: u64) -> Result<PunchOutcome, EngineError> {
        let total = checked_add(record.punches, amount)?;
        let rewards_earned = total / self.punches_per_reward;
        let next = UserRecord {
            punches: total % self.punches_per_reward,
            free_orders: checked_add(record.free_orders, rewards_earned)?,
            referrals: record.referrals,
        };
        try_validate_record(&next, self.punches_per_reward)?;
        Ok(PunchOutcome {
            record: next,
            rewards_earned,
        })
    }
}

/// Returns `(new_value, requested, applied)`. Removal clamps at zero.
fn adjust_counter(current: u64, delta: i64) -> Result<(u64, u64, u64), EngineError> {
    let requested = validate_delta(delta)?;
    if delta > 0 {
        Ok((checked_add(current, requested)?, requested, requested))
    } else {
        let applied = requested.min(current);
        Ok((current - applied, requested, applied))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RewardEngine {
        RewardEngine::new(5).unwrap()
    }

    fn punches(n: u64) -> UserRecord {
        UserRecord {
            punches: n,
            ..UserRecord::default()
        }
    }

    #[test]
    fn zero_threshold_rejected() {
        assert_eq!(RewardEngine::new(0), Err(EngineError::InvalidThreshold));
    }

    #[test]
    fn fourth_to_fifth_punch_rolls_over() {
        let out = engine().add_punches(&punches(4), 1).unwrap();
        assert_eq!(out.record.punches, 0);
        assert_eq!(out.record.free_orders, 1);
        assert_eq!(out.rewards_earned, 1);
        assert!(out.rewarded());
    }

    #[test]
    fn bulk_add_grants_multiple_rewards() {
        let out = engine().add_punches(&punches(0), 12).unwrap();
        assert_eq!(out.record.punches, 2);
        assert_eq!(out.rewards_earned, 2);
        assert_eq!(out.record.free_orders, 2);
    }

    #[test]
    fn add_below_threshold_is_plain() {
        let out = engine().add_punches(&punches(1), 2).unwrap();
        assert_eq!(out.record.punches, 3);
        assert!(!out.rewarded());
    }

    #[test]
    fn single_punch_matches_add_one() {
        let e = engine();
        for p in 0..5 {
            let record = UserRecord {
                punches: p,
                free_orders: 3,
                referrals: 1,
            };
            assert_eq!(e.add_single_punch(&record), e.add_punches(&record, 1));
        }
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let e = engine();
        let record = punches(3);
        assert_eq!(
            e.add_punches(&record, 0),
            Err(EngineError::InvalidAmount { amount: 0 })
        );
        assert_eq!(
            e.add_punches(&record, -3),
            Err(EngineError::InvalidAmount { amount: -3 })
        );
        assert!(e.remove_punches(&record, 0).is_err());
        assert!(e.adjust_free_orders(&record, 0).is_err());
        assert!(e.adjust_referrals(&record, 0).is_err());
    }

    #[test]
    fn remove_punches_floors_at_zero() {
        let record = UserRecord {
            punches: 2,
            free_orders: 4,
            referrals: 0,
        };
        let next = engine().remove_punches(&record, 5).unwrap();
        assert_eq!(next.punches, 0);
        assert_eq!(next.free_orders, 4);
    }

    #[test]
    fn remove_from_out_of_range_record_normalizes_first() {
        let record = UserRecord {
            punches: 7,
            free_orders: 1,
            referrals: 0,
        };
        let next = engine().remove_punches(&record, 1).unwrap();
        assert_eq!(next.punches, 1);
        assert_eq!(next.free_orders, 2);
        assert!(next.punches < 5);
    }

    #[test]
    fn normalize_leaves_in_range_records_alone() {
        let e = engine();
        let record = UserRecord {
            punches: 4,
            free_orders: 2,
            referrals: 1,
        };
        let out = e.normalize(&record).unwrap();
        assert_eq!(out.record, record);
        assert!(!out.rewarded());

        let out = e.normalize(&punches(12)).unwrap();
        assert_eq!(out.record.punches, 2);
        assert_eq!(out.rewards_earned, 2);
    }

    #[test]
    fn free_order_removal_clamps() {
        let record = UserRecord {
            free_orders: 3,
            ..UserRecord::default()
        };
        let out = engine().adjust_free_orders(&record, -5).unwrap();
        assert_eq!(out.record.free_orders, 0);
        assert_eq!(out.applied, 3);
        assert_eq!(out.requested, 5);
        assert_eq!(out.previous, 3);
        assert!(out.clamped());
    }

    #[test]
    fn free_order_addition_is_unconditional() {
        let out = engine().adjust_free_orders(&UserRecord::default(), 4).unwrap();
        assert_eq!(out.record.free_orders, 4);
        assert!(!out.clamped());
    }

    #[test]
    fn referrals_follow_the_same_clamp() {
        let e = engine();
        let record = UserRecord {
            referrals: 2,
            ..UserRecord::default()
        };
        let added = e.adjust_referrals(&record, 3).unwrap();
        assert_eq!(added.record.referrals, 5);
        let removed = e.adjust_referrals(&added.record, -9).unwrap();
        assert_eq!(removed.record.referrals, 0);
        assert_eq!(removed.applied, 5);
    }

    #[test]
    fn overflow_is_rejected() {
        let record = UserRecord {
            free_orders: u64::MAX,
            ..UserRecord::default()
        };
        assert!(matches!(
            engine().adjust_free_orders(&record, 1),
            Err(EngineError::Overflow { .. })
        ));
    }

    #[test]
    fn punches_remaining_counts_down() {
        let e = engine();
        assert_eq!(e.punches_remaining(&punches(0)), 5);
        assert_eq!(e.punches_remaining(&punches(4)), 1);
    }
}
