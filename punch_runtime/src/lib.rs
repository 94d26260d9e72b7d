#![forbid(unsafe_code)]

//! Punchcard runtime.
//!
//! Wraps the pure reward engine with ledger persistence, a serialized
//! service front, configuration and event dispatch.
//!
//! No reward arithmetic lives here — all of it is delegated to
//! `punch_engine`.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod ledger_store;
pub mod punchcard;

pub use config::RuntimeConfig;
pub use dispatch::{Dispatcher, Event, Reply};
pub use error::{ConfigError, RuntimeError, StoreError};
pub use ledger_store::{FileLedgerStore, LedgerStore, MemoryLedgerStore};
pub use punchcard::{MessagePunch, Punchcard, SharedPunchcard};
