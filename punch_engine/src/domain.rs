//! PunchEngine — Core Domain Types
//!
//! Pure data. No transition logic lives here.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Core Domain Types ──────────────────────────────────────────────

/// Reward state for a single user.
///
/// A user missing from the ledger behaves exactly like
/// `UserRecord::default()`. Missing fields in stored JSON read as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub punches: u64,     // 0 <= punches < punches_per_reward after any update
    pub free_orders: u64,
    pub referrals: u64,
}

/// The full persisted collection, keyed by platform user id.
pub type Ledger = BTreeMap<String, UserRecord>;

/// Partial overwrite of a record. `None` fields keep their prior value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldUpdates {
    pub punches: Option<u64>,
    pub free_orders: Option<u64>,
    pub referrals: Option<u64>,
}

impl FieldUpdates {
    /// Overwrite every field with the values of `record`.
    pub fn all(record: &UserRecord) -> Self {
        Self {
            punches: Some(record.punches),
            free_orders: Some(record.free_orders),
            referrals: Some(record.referrals),
        }
    }

    pub fn punches(value: u64) -> Self {
        Self {
            punches: Some(value),
            ..Self::default()
        }
    }

    pub fn free_orders(value: u64) -> Self {
        Self {
            free_orders: Some(value),
            ..Self::default()
        }
    }

    pub fn referrals(value: u64) -> Self {
        Self {
            referrals: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.punches.is_none() && self.free_orders.is_none() && self.referrals.is_none()
    }

    /// Apply the specified fields to `record` in place.
    pub fn apply_to(&self, record: &mut UserRecord) {
        if let Some(v) = self.punches {
            record.punches = v;
        }
        if let Some(v) = self.free_orders {
            record.free_orders = v;
        }
        if let Some(v) = self.referrals {
            record.referrals = v;
        }
    }
}

// ── Engine Outcomes ────────────────────────────────────────────────

/// Result of a punch addition, including any rollover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PunchOutcome {
    pub record: UserRecord,
    pub rewards_earned: u64,
}

impl PunchOutcome {
    /// True when this addition crossed at least one reward threshold.
    pub fn rewarded(&self) -> bool {
        self.rewards_earned > 0
    }
}

/// Result of a clamped counter adjustment (free orders, referrals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdjustOutcome {
    pub record: UserRecord,
    /// Magnitude the caller asked for.
    pub requested: u64,
    /// Magnitude actually applied after clamping at zero.
    pub applied: u64,
    /// Counter value before the adjustment.
    pub previous: u64,
}

impl AdjustOutcome {
    /// True when a removal asked for more than the user held.
    pub fn clamped(&self) -> bool {
        self.applied < self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_updates_leave_unspecified_fields() {
        let mut record = UserRecord {
            punches: 3,
            free_orders: 2,
            referrals: 7,
        };
        FieldUpdates::free_orders(9).apply_to(&mut record);
        assert_eq!(
            record,
            UserRecord {
                punches: 3,
                free_orders: 9,
                referrals: 7,
            }
        );
        assert!(FieldUpdates::default().is_empty());
        assert!(!FieldUpdates::all(&record).is_empty());
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: UserRecord = serde_json::from_str(r#"{"punches": 4}"#).unwrap();
        assert_eq!(record.punches, 4);
        assert_eq!(record.free_orders, 0);
        assert_eq!(record.referrals, 0);
    }

    #[test]
    fn record_rejects_negative_counters() {
        assert!(serde_json::from_str::<UserRecord>(r#"{"punches": -1}"#).is_err());
    }
}
