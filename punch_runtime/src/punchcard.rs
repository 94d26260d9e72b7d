//! Punchcard service — engine + store with load-compute-persist semantics.
//!
//! Every operation runs in this order:
//!   1. validate the requested amount   — nothing is touched on failure
//!   2. load + get-or-create the record — may persist a zero record
//!   3. normalize an out-of-range count — persisted before continuing
//!   4. compute the new record          — pure engine call
//!   5. apply_update                    — only the fields that changed
//!
//! Concurrency: store-touching operations are crate-private and reached
//! from outside only through `SharedPunchcard`, whose Mutex is the single
//! serialization point in front of the store.

use std::sync::Mutex;

use punch_engine::arithmetic::validate_amount;
use punch_engine::{
    AdjustOutcome, FieldUpdates, LinkDetector, PunchOutcome, RewardEngine, UserRecord,
};
use tracing::{info, warn};

use crate::config::RuntimeConfig;
use crate::error::{ConfigError, RuntimeError};
use crate::ledger_store::LedgerStore;

/// A tracked-link message that earned a punch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePunch {
    /// Tracked domain that matched.
    pub domain: String,
    pub outcome: PunchOutcome,
}

/// Reward accounting over a ledger store.
///
/// Build one, then hand it to `SharedPunchcard`:
///
/// ```compile_fail
/// use punch_engine::{LinkDetector, RewardEngine};
/// use punch_runtime::{MemoryLedgerStore, Punchcard};
///
/// let punchcard = Punchcard::new(
///     MemoryLedgerStore::new(),
///     RewardEngine::default(),
///     LinkDetector::new(["ubereats.com"]),
/// );
/// // Mutations are only reachable through SharedPunchcard.
/// punchcard.add_punches("1", 1).unwrap();
/// ```
pub struct Punchcard<S> {
    store: S,
    engine: RewardEngine,
    detector: LinkDetector,
}

impl<S: LedgerStore> Punchcard<S> {
    pub fn new(store: S, engine: RewardEngine, detector: LinkDetector) -> Self {
        Self {
            store,
            engine,
            detector,
        }
    }

    pub fn from_config(store: S, config: &RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(store, config.reward_engine()?, config.link_detector()))
    }

    pub fn engine(&self) -> &RewardEngine {
        &self.engine
    }

    pub fn detector(&self) -> &LinkDetector {
        &self.detector
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &S {
        &self.store
    }

    /// Punch the author once if the message carries a tracked link.
    ///
    /// Returns `None` for bot authors and messages without a match.
    pub(crate) fn record_message(
        &self,
        author_id: &str,
        author_is_bot: bool,
        content: &str,
    ) -> Result<Option<MessagePunch>, RuntimeError> {
        let Some(domain) = self.detector.detect_message(author_is_bot, content) else {
            return Ok(None);
        };
        let domain = domain.to_string();

        let record = self.current(author_id)?;
        let outcome = self.engine.add_single_punch(&record)?;
        let outcome = self.save_punches(author_id, outcome)?;
        info!(
            user_id = author_id,
            domain = %domain,
            punches = outcome.record.punches,
            "tracked link punched"
        );
        Ok(Some(MessagePunch { domain, outcome }))
    }

    pub(crate) fn add_punches(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<PunchOutcome, RuntimeError> {
        validate_amount(amount)?;
        let record = self.current(user_id)?;
        let outcome = self.engine.add_punches(&record, amount)?;
        self.save_punches(user_id, outcome)
    }

    pub(crate) fn remove_punches(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<UserRecord, RuntimeError> {
        validate_amount(amount)?;
        let record = self.current(user_id)?;
        let next = self.engine.remove_punches(&record, amount)?;
        let updates = FieldUpdates {
            punches: Some(next.punches),
            free_orders: Some(next.free_orders),
            referrals: None,
        };
        Ok(self.store.apply_update(user_id, &updates)?)
    }

    pub(crate) fn add_free_orders(
        &self,
        user_id: &str,
        count: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        validate_amount(count)?;
        let record = self.current(user_id)?;
        let outcome = self.engine.adjust_free_orders(&record, count)?;
        self.save_free_orders(user_id, outcome)
    }

    /// Remove up to `count` free orders; `clamped()` on the result tells
    /// the caller the user held fewer.
    pub(crate) fn remove_free_orders(
        &self,
        user_id: &str,
        count: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        validate_amount(count)?;
        let record = self.current(user_id)?;
        let outcome = self.engine.adjust_free_orders(&record, -count)?;
        self.save_free_orders(user_id, outcome)
    }

    pub(crate) fn add_referrals(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        validate_amount(amount)?;
        let record = self.current(user_id)?;
        let outcome = self.engine.adjust_referrals(&record, amount)?;
        self.save_referrals(user_id, outcome)
    }

    pub(crate) fn remove_referrals(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        validate_amount(amount)?;
        let record = self.current(user_id)?;
        let outcome = self.engine.adjust_referrals(&record, -amount)?;
        self.save_referrals(user_id, outcome)
    }

    /// Current record for `user_id`; creates a zero record on first sight.
    pub(crate) fn stats(&self, user_id: &str) -> Result<UserRecord, RuntimeError> {
        self.current(user_id)
    }

    /// Current record without creating or normalizing one.
    pub(crate) fn peek(&self, user_id: &str) -> Result<UserRecord, RuntimeError> {
        Ok(self.store.peek(user_id)?)
    }

    /// Load the record, creating it if absent. A punch count at or above
    /// the threshold is folded into free orders and persisted first.
    fn current(&self, user_id: &str) -> Result<UserRecord, RuntimeError> {
        let mut ledger = self.store.load()?;
        let record = self.store.get_or_create(&mut ledger, user_id)?;
        let normalized = self.engine.normalize(&record)?;
        if !normalized.rewarded() {
            return Ok(record);
        }
        warn!(
            user_id,
            punches = record.punches,
            punches_per_reward = self.engine.punches_per_reward(),
            "stored punches out of range, folding into free orders"
        );
        Ok(self.save_punches(user_id, normalized)?.record)
    }

    fn save_punches(
        &self,
        user_id: &str,
        outcome: PunchOutcome,
    ) -> Result<PunchOutcome, RuntimeError> {
        let updates = FieldUpdates {
            punches: Some(outcome.record.punches),
            free_orders: Some(outcome.record.free_orders),
            referrals: None,
        };
        let record = self.store.apply_update(user_id, &updates)?;
        if outcome.rewarded() {
            info!(
                user_id,
                rewards_earned = outcome.rewards_earned,
                free_orders = record.free_orders,
                "free order earned"
            );
        }
        Ok(PunchOutcome { record, ..outcome })
    }

    fn save_free_orders(
        &self,
        user_id: &str,
        outcome: AdjustOutcome,
    ) -> Result<AdjustOutcome, RuntimeError> {
        let updates = FieldUpdates::free_orders(outcome.record.free_orders);
        let record = self.store.apply_update(user_id, &updates)?;
        Ok(AdjustOutcome { record, ..outcome })
    }

    fn save_referrals(
        &self,
        user_id: &str,
        outcome: AdjustOutcome,
    ) -> Result<AdjustOutcome, RuntimeError> {
        let updates = FieldUpdates::referrals(outcome.record.referrals);
        let record = self.store.apply_update(user_id, &updates)?;
        Ok(AdjustOutcome { record, ..outcome })
    }
}

/// Thread-safe punchcard handle. The single serialization point in
/// front of the ledger store.
pub struct SharedPunchcard<S> {
    engine: RewardEngine,
    inner: Mutex<Punchcard<S>>,
}

impl<S: LedgerStore> SharedPunchcard<S> {
    pub fn new(punchcard: Punchcard<S>) -> Self {
        Self {
            engine: punchcard.engine,
            inner: Mutex::new(punchcard),
        }
    }

    /// Engine parameters, readable without taking the lock.
    pub fn engine(&self) -> &RewardEngine {
        &self.engine
    }

    /// Run `f` with exclusive access to the punchcard.
    fn with<T>(
        &self,
        f: impl FnOnce(&Punchcard<S>) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let punchcard = self.inner.lock().map_err(|_| RuntimeError::LockPoisoned)?;
        f(&punchcard)
    }

    pub fn record_message(
        &self,
        author_id: &str,
        author_is_bot: bool,
        content: &str,
    ) -> Result<Option<MessagePunch>, RuntimeError> {
        self.with(|p| p.record_message(author_id, author_is_bot, content))
    }

    pub fn add_punches(&self, user_id: &str, amount: i64) -> Result<PunchOutcome, RuntimeError> {
        self.with(|p| p.add_punches(user_id, amount))
    }

    pub fn remove_punches(&self, user_id: &str, amount: i64) -> Result<UserRecord, RuntimeError> {
        self.with(|p| p.remove_punches(user_id, amount))
    }

    pub fn add_free_orders(
        &self,
        user_id: &str,
        count: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        self.with(|p| p.add_free_orders(user_id, count))
    }

    pub fn remove_free_orders(
        &self,
        user_id: &str,
        count: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        self.with(|p| p.remove_free_orders(user_id, count))
    }

    pub fn add_referrals(&self, user_id: &str, amount: i64) -> Result<AdjustOutcome, RuntimeError> {
        self.with(|p| p.add_referrals(user_id, amount))
    }

    pub fn remove_referrals(
        &self,
        user_id: &str,
        amount: i64,
    ) -> Result<AdjustOutcome, RuntimeError> {
        self.with(|p| p.remove_referrals(user_id, amount))
    }

    pub fn stats(&self, user_id: &str) -> Result<UserRecord, RuntimeError> {
        self.with(|p| p.stats(user_id))
    }

    pub fn peek(&self, user_id: &str) -> Result<UserRecord, RuntimeError> {
        self.with(|p| p.peek(user_id))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger_store::MemoryLedgerStore;

    fn punchcard() -> Punchcard<MemoryLedgerStore> {
        Punchcard::new(
            MemoryLedgerStore::new(),
            RewardEngine::new(5).unwrap(),
            LinkDetector::new(["ubereats.com", "doordash.com"]),
        )
    }

    #[test]
    fn message_with_link_punches_once() {
        let p = punchcard();
        let punch = p
            .record_message("1", false, "UberEats.com/abc and doordash.com/xyz")
            .unwrap()
            .unwrap();
        assert_eq!(punch.domain, "ubereats.com");
        assert_eq!(punch.outcome.record.punches, 1);
        assert_eq!(p.peek("1").unwrap().punches, 1);
    }

    #[test]
    fn bot_and_plain_messages_are_ignored() {
        let p = punchcard();
        assert!(p.record_message("1", true, "ubereats.com/abc").unwrap().is_none());
        assert!(p.record_message("1", false, "hello").unwrap().is_none());
        // No record is created for ignored messages.
        assert_eq!(p.store().content(), None);
    }

    #[test]
    fn fifth_message_earns_free_order() {
        let p = punchcard();
        for _ in 0..4 {
            let punch = p.record_message("1", false, "doordash.com").unwrap().unwrap();
            assert!(!punch.outcome.rewarded());
        }
        let punch = p.record_message("1", false, "doordash.com").unwrap().unwrap();
        assert!(punch.outcome.rewarded());
        assert_eq!(punch.outcome.record.punches, 0);
        assert_eq!(punch.outcome.record.free_orders, 1);
    }

    #[test]
    fn invalid_amount_touches_nothing() {
        let p = punchcard();
        let err = p.add_punches("1", 0).unwrap_err();
        assert!(err.is_invalid_amount());
        assert!(p.remove_free_orders("1", -2).unwrap_err().is_invalid_amount());
        assert_eq!(p.store().content(), None);
    }

    #[test]
    fn referral_round_trip_keeps_punches() {
        let p = punchcard();
        p.add_punches("1", 3).unwrap();
        let added = p.add_referrals("1", 4).unwrap();
        assert_eq!(added.record.referrals, 4);
        assert_eq!(added.record.punches, 3);
        let removed = p.remove_referrals("1", 10).unwrap();
        assert!(removed.clamped());
        assert_eq!(removed.applied, 4);
        assert_eq!(removed.record.referrals, 0);
        assert_eq!(removed.record.punches, 3);
    }

    #[test]
    fn stats_creates_record() {
        let p = punchcard();
        assert_eq!(p.stats("77").unwrap(), UserRecord::default());
        assert!(p.store().load().unwrap().contains_key("77"));
    }

    #[test]
    fn shared_handle_delegates() {
        let shared = SharedPunchcard::new(punchcard());
        assert_eq!(shared.engine().punches_per_reward(), 5);
        let out = shared.add_punches("1", 12).unwrap();
        assert_eq!(out.rewards_earned, 2);
        let removed = shared.remove_free_orders("1", 1).unwrap();
        assert_eq!(removed.record.free_orders, 1);
        assert_eq!(shared.peek("1").unwrap().punches, 2);
    }

    #[test]
    fn out_of_range_punches_never_persist() {
        let p = Punchcard::new(
            MemoryLedgerStore::with_content(r#"{"1": {"punches": 7}}"#),
            RewardEngine::new(5).unwrap(),
            LinkDetector::new(["ubereats.com"]),
        );
        let record = p.remove_punches("1", 1).unwrap();
        assert_eq!(record.punches, 1);
        assert_eq!(record.free_orders, 1);
        assert_eq!(p.peek("1").unwrap(), record);
        assert_eq!(p.engine().punches_remaining(&record), 4);
    }

    #[test]
    fn adjustments_also_normalize_stored_punches() {
        let p = Punchcard::new(
            MemoryLedgerStore::with_content(r#"{"1": {"punches": 11, "referrals": 2}}"#),
            RewardEngine::new(5).unwrap(),
            LinkDetector::new(["ubereats.com"]),
        );
        let out = p.remove_referrals("1", 1).unwrap();
        assert_eq!(
            out.record,
            UserRecord {
                punches: 1,
                free_orders: 2,
                referrals: 1,
            }
        );
    }
}
