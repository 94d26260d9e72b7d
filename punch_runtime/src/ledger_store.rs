//! Ledger store — full-load / full-save persistence of the user ledger.
//!
//! Storage format: one pretty-printed JSON object,
//!   {"<user id>": {"punches": n, "free_orders": n, "referrals": n}, ...}
//!
//! Rules:
//!   - Every read re-loads the whole ledger; nothing is cached
//!   - Every write replaces the whole ledger (temp file + rename)
//!   - Missing, empty or unparseable content loads as an empty ledger
//!   - I/O failures propagate; an update is never reported as saved
//!     unless it reached storage
//!
//! Each `apply_update` is O(total users). Callers must serialize access
//! (see `SharedPunchcard`); two interleaved updates lose one of them.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use punch_engine::hashing::ledger_digest;
use punch_engine::{FieldUpdates, Ledger, UserRecord};
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Durable mapping from user id to reward state.
pub trait LedgerStore {
    /// Read the full ledger. Absent or corrupt storage yields an empty one.
    fn load(&self) -> Result<Ledger, StoreError>;

    /// Replace stored content with `ledger`.
    fn persist(&self, ledger: &Ledger) -> Result<(), StoreError>;

    /// Return the record for `user_id`, inserting and persisting a
    /// zero record when absent. Mutates `ledger` and storage.
    fn get_or_create(&self, ledger: &mut Ledger, user_id: &str) -> Result<UserRecord, StoreError> {
        if let Some(record) = ledger.get(user_id) {
            return Ok(*record);
        }
        ledger.insert(user_id.to_string(), UserRecord::default());
        self.persist(ledger)?;
        info!(user_id, "created punchcard record");
        Ok(UserRecord::default())
    }

    /// Read-only lookup. Unknown users read as zero and are not stored.
    fn peek(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        Ok(self.load()?.get(user_id).copied().unwrap_or_default())
    }

    /// Load, overwrite the specified fields of `user_id`, persist.
    fn apply_update(
        &self,
        user_id: &str,
        updates: &FieldUpdates,
    ) -> Result<UserRecord, StoreError> {
        let mut ledger = self.load()?;
        let record = ledger.entry(user_id.to_string()).or_default();
        updates.apply_to(record);
        let updated = *record;
        self.persist(&ledger)?;
        Ok(updated)
    }
}

/// Decode stored content. Never fails: empty or corrupt input is
/// logged and discarded.
pub fn decode_ledger(content: &str, source: &str) -> Ledger {
    if content.trim().is_empty() {
        return Ledger::new();
    }
    match serde_json::from_str(content) {
        Ok(ledger) => ledger,
        Err(e) => {
            warn!(source, error = %e, "ledger is corrupted, starting fresh");
            Ledger::new()
        }
    }
}

/// Encode a ledger for storage (two-space indentation).
pub fn encode_ledger(ledger: &Ledger) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(ledger)?)
}

// ─────────────────────────────────────────────────────────────
// File-backed store
// ─────────────────────────────────────────────────────────────

/// Ledger kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling `<name>.tmp` used for atomic replacement.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn unavailable(&self, source: io::Error) -> StoreError {
        StoreError::Unavailable {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self) -> Result<Ledger, StoreError> {
        let source = self.path.display().to_string();
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(decode_ledger(&content, &source)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Ledger::new()),
            // Not UTF-8: same treatment as any other undecodable content
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                warn!(source = %source, error = %e, "ledger is corrupted, starting fresh");
                Ok(Ledger::new())
            }
            Err(e) => Err(self.unavailable(e)),
        }
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = encode_ledger(ledger)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.unavailable(e))?;
            }
        }

        let tmp = self.tmp_path();
        {
            let mut file = File::create(&tmp).map_err(|e| self.unavailable(e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| self.unavailable(e))?;
            file.sync_all().map_err(|e| self.unavailable(e))?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| self.unavailable(e))?;

        debug!(
            path = %self.path.display(),
            users = ledger.len(),
            digest = %ledger_digest(ledger),
            "ledger persisted"
        );
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────
// In-memory store
// ─────────────────────────────────────────────────────────────

/// Ledger held as encoded text in memory.
///
/// Goes through the same encode/decode path as the file store, so
/// corruption handling can be exercised without touching disk.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    content: Mutex<Option<String>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw stored content, valid or not.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(content.into())),
        }
    }

    /// Raw stored content; `None` until the first persist.
    pub fn content(&self) -> Option<String> {
        self.content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self) -> Result<Ledger, StoreError> {
        let content = self.content.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(match content.as_deref() {
            Some(text) => decode_ledger(text, "memory"),
            None => Ledger::new(),
        })
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), StoreError> {
        let json = encode_ledger(ledger)?;
        *self.content.lock().unwrap_or_else(PoisonError::into_inner) = Some(json);
        Ok(())
    }
}
