//! PunchEngine — Canonical Hashing
//!
//! Deterministic canonical serialization + SHA-256 of a ledger.
//! The digest covers exactly the persisted content: user ids and
//! counters, nothing else.
//!
//! Rules:
//!   - Users sorted by id (UTF-8 byte order)
//!   - Record fields in fixed order: punches, free_orders, referrals
//!   - UTF-8 JSON, no whitespace

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::Ledger;

/// Canonical serialization of a ledger to UTF-8 JSON bytes.
pub fn canonical_serialize(ledger: &Ledger) -> Vec<u8> {
    build_canonical_value(ledger).to_string().into_bytes()
}

/// SHA-256 of the canonical serialization. Lowercase hex string.
pub fn ledger_digest(ledger: &Ledger) -> String {
    let digest = Sha256::digest(canonical_serialize(ledger));
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// One object keyed by user id, records in fixed field order.
fn build_canonical_value(ledger: &Ledger) -> Value {
    let mut users = Map::new();
    // BTreeMap is already sorted by key
    for (user_id, record) in ledger {
        let mut fields = Map::new();
        fields.insert("punches".to_string(), Value::from(record.punches));
        fields.insert("free_orders".to_string(), Value::from(record.free_orders));
        fields.insert("referrals".to_string(), Value::from(record.referrals));
        users.insert(user_id.clone(), Value::Object(fields));
    }
    Value::Object(users)
}
